//! # lineage-commons
//!
//! Shared types for the inherited access-control workspace.
//!
//! Every other crate (lineage-store, lineage-core, lineage-configs, lineage-cli)
//! speaks in terms of these types:
//! - [`EntityKind`]: the closed set of hierarchy levels (container, wrapper, leaf)
//! - [`LutColumn`]: the lookup-table column that holds ids of a given kind
//! - [`EntityId`], [`EntityRef`], [`Entity`], [`AccountId`]: identifiers
//! - [`LutRow`]: one `(container, wrapper, leaf)` triple of the lookup table
//! - [`AccessVerdict`]: tri-state access outcome with reasoning and cache metadata
//! - [`CudOperations`]: per-kind create/update/delete capability mask
//!
//! ## Hierarchy
//!
//! ```text
//! container (node)  ← sole authority, decided by the external access policy
//!     ↑ container-reference field
//! wrapper (media)   ← belongs to exactly one container
//!     ↑ leaf-bearing fields (zero or more)
//! leaf (file)       ← referenced by zero or more wrappers
//! ```

pub mod cud;
pub mod errors;
pub mod models;
pub mod verdict;

pub use cud::{CudEvent, CudOperation, CudOperations};
pub use errors::KindParseError;
pub use models::{AccountId, Entity, EntityId, EntityKind, EntityRef, LutColumn, LutRow};
pub use verdict::{AccessVerdict, CacheDependencies, Cacheable, Outcome};
