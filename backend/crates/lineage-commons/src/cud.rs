//! Create/update/delete capability masks
//!
//! Each entity kind declares which lifecycle notifications should touch the lookup
//! table. Leaves and containers only ever need their rows removed; wrappers own the
//! references and therefore need all three.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Lifecycle operations a kind reacts to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CudOperations: u8 {
        const CREATE = 0b0001;
        const UPDATE = 0b0010;
        const DELETE = 0b0100;
    }
}

impl Default for CudOperations {
    /// Delete-only.
    fn default() -> Self {
        CudOperations::DELETE
    }
}

/// Named operation, as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CudOperation {
    Create,
    Update,
    Delete,
}

impl CudOperation {
    pub fn flag(&self) -> CudOperations {
        match self {
            CudOperation::Create => CudOperations::CREATE,
            CudOperation::Update => CudOperations::UPDATE,
            CudOperation::Delete => CudOperations::DELETE,
        }
    }
}

impl FromIterator<CudOperation> for CudOperations {
    fn from_iter<I: IntoIterator<Item = CudOperation>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CudOperations::empty(), |acc, op| acc | op.flag())
    }
}

/// Lifecycle notification delivered by the entity storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CudEvent {
    Created,
    Updated,
    Deleted,
}

impl CudEvent {
    pub fn operation(&self) -> CudOperation {
        match self {
            CudEvent::Created => CudOperation::Create,
            CudEvent::Updated => CudOperation::Update,
            CudEvent::Deleted => CudOperation::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names() {
        let ops: CudOperations = [CudOperation::Create, CudOperation::Delete]
            .into_iter()
            .collect();
        assert!(ops.contains(CudOperations::CREATE));
        assert!(!ops.contains(CudOperations::UPDATE));
        assert!(ops.contains(CudEvent::Deleted.operation().flag()));
    }

    #[test]
    fn test_default_is_delete_only() {
        assert_eq!(CudOperations::default(), CudOperations::DELETE);
    }
}
