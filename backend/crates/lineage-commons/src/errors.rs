//! Error types shared across crates.

use thiserror::Error;

/// Raised when a kind name does not name one of the three hierarchy levels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized type '{0}'.")]
pub struct KindParseError(pub String);
