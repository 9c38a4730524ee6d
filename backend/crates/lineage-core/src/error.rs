//! Error types for lineage-core

use lineage_commons::KindParseError;
use lineage_store::StoreError;
use sqlparser::parser::ParserError;
use thiserror::Error;

/// Result type alias for lineage-core operations
pub type Result<T> = std::result::Result<T, LineageError>;

/// Errors raised by generation, synchronization, tagging and access evaluation.
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("SQL parse error: {0}")]
    Parse(#[from] ParserError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error(transparent)]
    KindParse(#[from] KindParseError),
}

impl From<rusqlite::Error> for LineageError {
    fn from(err: rusqlite::Error) -> Self {
        LineageError::Store(StoreError::Sqlite(err))
    }
}

impl LineageError {
    /// Whether the caller passed something this crate refuses to handle.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            LineageError::InvalidArgument(_) | LineageError::UnsupportedQuery(_) | LineageError::KindParse(_)
        )
    }
}
