//! Type-safe identifiers for entities and accounts.

use super::kind::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a container, wrapper, or leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(kind, id)` pair naming one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn container(id: i64) -> Self {
        Self::new(EntityKind::Container, id)
    }

    pub fn wrapper(id: i64) -> Self {
        Self::new(EntityKind::Wrapper, id)
    }

    pub fn leaf(id: i64) -> Self {
        Self::new(EntityKind::Leaf, id)
    }

    /// Entity-level cache tag, e.g. `wrapper:12`.
    pub fn cache_tag(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A loaded entity, as returned by the entity loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub reference: EntityRef,
    /// Human-readable label, when the storage schema declares a label column.
    pub label: Option<String>,
}

impl Entity {
    pub fn new(reference: EntityRef) -> Self {
        Self {
            reference,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.reference.kind
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.reference.id
    }
}

/// Identifier of the account performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-account cache tag, e.g. `user:alice`.
    pub fn cache_tag(&self) -> String {
        format!("user:{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
