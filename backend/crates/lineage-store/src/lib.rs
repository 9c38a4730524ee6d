//! # lineage-store
//!
//! SQLite backing store for entities and the denormalized lookup table (LUT).
//!
//! ## Architecture
//!
//! ```text
//! lineage-core (generator, synchronizer, tagger, access)
//!     ↓
//! lineage-store (Database, LutStore, SqliteEntityLoader)
//!     ↓
//! SQLite (rusqlite)
//! ```
//!
//! All writes go through [`Database::transaction`], which commits on `Ok` and rolls
//! back on `Err`. Components that must compose several writes atomically take a
//! `&rusqlite::Connection` (a `Transaction` derefs to one) instead of locking again.

pub mod database;
pub mod entity_loader;
pub mod error;
pub mod lut_store;
pub mod schema;

// Make test_utils available for testing in dependent crates
pub mod test_utils;

pub use database::Database;
pub use entity_loader::{EntityLoader, SqliteEntityLoader};
pub use error::{Result, StoreError};
pub use lut_store::LutStore;

pub use rusqlite::Connection;
