//! # lineage-core
//!
//! Inherited access control over a container → wrapper → leaf hierarchy.
//!
//! - [`generator::LutGenerator`]: derives lookup-table rows from the entity graph
//! - [`synchronizer::LutSynchronizer`]: keeps the table current on create/update/delete
//! - [`tagger::QueryTagger`]: rewrites wrapper and leaf listing queries with
//!   LUT-backed existence constraints
//! - [`access::EntityAccessEvaluator`]: single-entity checks by walking the table
//!   upward to candidate parents
//! - [`Lineage`]: wires all of the above over one [`lineage_store::Database`]

pub mod access;
pub mod error;
pub mod generator;
pub mod lineage;
pub mod synchronizer;
pub mod tagger;

pub use access::{AccessPolicy, AccessResolver, EntityAccess, EntityAccessEvaluator, InheritedAccessRule, NeutralPolicy};
pub use error::{LineageError, Result};
pub use generator::LutGenerator;
pub use lineage::{Lineage, RegenerationReport};
pub use synchronizer::LutSynchronizer;
pub use tagger::{ListingQuery, NoopAlterer, QueryAlterer, QueryTagger, TaggingContext, TaggingDispatcher, TaggingListener};
