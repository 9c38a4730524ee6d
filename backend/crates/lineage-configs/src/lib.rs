//! lineage-configs
//!
//! Configuration types and loader for the inherited access-control workspace.

pub mod config;

pub use config::*;
pub use config::defaults;
