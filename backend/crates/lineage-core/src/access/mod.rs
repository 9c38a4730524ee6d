//! Single-entity access evaluation.
//!
//! ```text
//! AccessResolver::access(entity)
//!     ├── AccessPolicy::check(entity)            (external, per entity)
//!     └── EntityAccessEvaluator::check(entity)   (inherited, via the LUT)
//!             └── AccessResolver::access(parent) for each candidate parent
//! ```

pub mod evaluator;
pub mod policy;
pub mod resolver;
pub mod rule;

pub use evaluator::{EntityAccess, EntityAccessEvaluator};
pub use policy::{AccessPolicy, NeutralPolicy};
pub use resolver::AccessResolver;
pub use rule::InheritedAccessRule;
