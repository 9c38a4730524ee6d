//! Lookup-table row model

use super::ids::EntityId;
use super::kind::LutColumn;
use serde::{Deserialize, Serialize};

/// One `(container, wrapper, leaf)` triple.
///
/// `leaf_id == None` is the sentinel: the wrapper resolves no leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LutRow {
    pub container_id: EntityId,
    pub wrapper_id: EntityId,
    pub leaf_id: Option<EntityId>,
}

impl LutRow {
    pub fn new(container_id: i64, wrapper_id: i64, leaf_id: Option<i64>) -> Self {
        Self {
            container_id: EntityId::new(container_id),
            wrapper_id: EntityId::new(wrapper_id),
            leaf_id: leaf_id.map(EntityId::new),
        }
    }

    /// Row for a wrapper that is not leaf-backed.
    pub fn sentinel(container_id: i64, wrapper_id: i64) -> Self {
        Self::new(container_id, wrapper_id, None)
    }

    pub fn is_sentinel(&self) -> bool {
        self.leaf_id.is_none()
    }

    /// Value held in the given column.
    pub fn get(&self, column: LutColumn) -> Option<EntityId> {
        match column {
            LutColumn::ContainerId => Some(self.container_id),
            LutColumn::WrapperId => Some(self.wrapper_id),
            LutColumn::LeafId => self.leaf_id,
        }
    }
}
