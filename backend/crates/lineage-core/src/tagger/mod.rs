//! Query tagging: LUT-backed access constraints for wrapper and leaf listings.

pub mod hooks;
pub mod query;
pub mod query_tagger;
pub mod sql;

pub use hooks::{NoopAlterer, QueryAlterer, TaggingDispatcher, TaggingListener};
pub use query::{ListingQuery, TaggingContext};
pub use query_tagger::QueryTagger;
