//! Hierarchy levels and their lookup-table columns

use crate::errors::KindParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three entity kinds of the content hierarchy.
///
/// - **Container** (`node`): top-level entity, the only kind whose access is decided
///   directly by the external policy
/// - **Wrapper** (`media`): belongs to exactly one container, may reference leaves
/// - **Leaf** (`file`): binary artifact referenced by zero or more wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Container,
    Wrapper,
    Leaf,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Container, EntityKind::Wrapper, EntityKind::Leaf];

    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Container => "container",
            EntityKind::Wrapper => "wrapper",
            EntityKind::Leaf => "leaf",
        }
    }

    /// The lookup-table column holding ids of this kind.
    pub fn lut_column(&self) -> LutColumn {
        match self {
            EntityKind::Container => LutColumn::ContainerId,
            EntityKind::Wrapper => LutColumn::WrapperId,
            EntityKind::Leaf => LutColumn::LeafId,
        }
    }

    /// The kind one level up, or `None` for the container.
    pub fn parent(&self) -> Option<EntityKind> {
        match self {
            EntityKind::Container => None,
            EntityKind::Wrapper => Some(EntityKind::Container),
            EntityKind::Leaf => Some(EntityKind::Wrapper),
        }
    }

    /// Iterate the strict ancestors of this kind, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = EntityKind> {
        std::iter::successors(self.parent(), |kind| kind.parent())
    }

    /// Whether listing queries of this kind can be tagged.
    ///
    /// Containers sit at the top of the hierarchy and have nothing to inherit.
    pub fn is_taggable(&self) -> bool {
        !matches!(self, EntityKind::Container)
    }

    /// List-level cache tag, invalidated whenever any entity of this kind changes.
    pub fn list_cache_tag(&self) -> String {
        format!("{}_list", self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = KindParseError;

    /// Accepts the kind names and the storage-level aliases (`node`, `media`, `file`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "container" | "node" => Ok(EntityKind::Container),
            "wrapper" | "media" => Ok(EntityKind::Wrapper),
            "leaf" | "file" => Ok(EntityKind::Leaf),
            _ => Err(KindParseError(s.to_string())),
        }
    }
}

/// Columns of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LutColumn {
    ContainerId,
    WrapperId,
    LeafId,
}

impl LutColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            LutColumn::ContainerId => "container_id",
            LutColumn::WrapperId => "wrapper_id",
            LutColumn::LeafId => "leaf_id",
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            LutColumn::ContainerId => EntityKind::Container,
            LutColumn::WrapperId => EntityKind::Wrapper,
            LutColumn::LeafId => EntityKind::Leaf,
        }
    }
}

impl fmt::Display for LutColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
