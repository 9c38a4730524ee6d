//! Tri-state access verdicts
//!
//! A verdict is one of allowed / forbidden / neutral, carrying an optional reason and
//! the cache dependencies that must invalidate it. Neutral is never collapsed into
//! either of the other two: it means "no opinion" and lets the caller combine it with
//! other verdicts.
//!
//! ## Combination
//!
//! | `or_if`     | allowed   | forbidden | neutral   |
//! |-------------|-----------|-----------|-----------|
//! | allowed     | allowed   | forbidden | allowed   |
//! | forbidden   | forbidden | forbidden | forbidden |
//! | neutral     | allowed   | forbidden | neutral   |

use crate::models::{AccountId, Entity, EntityRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allowed,
    Forbidden,
    Neutral,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Forbidden => "forbidden",
            Outcome::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cache invalidation metadata: entity tags (`wrapper:3`), account tags (`user:alice`)
/// and list tags (`container_list`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDependencies {
    tags: BTreeSet<String>,
}

impl CacheDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn merge(&mut self, other: &CacheDependencies) {
        self.tags.extend(other.tags.iter().cloned());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Anything whose changes should invalidate a cached verdict.
pub trait Cacheable {
    fn cache_dependencies(&self) -> CacheDependencies;
}

impl Cacheable for EntityRef {
    fn cache_dependencies(&self) -> CacheDependencies {
        let mut deps = CacheDependencies::new();
        deps.add_tag(self.cache_tag());
        deps
    }
}

impl Cacheable for Entity {
    fn cache_dependencies(&self) -> CacheDependencies {
        self.reference.cache_dependencies()
    }
}

impl Cacheable for AccountId {
    fn cache_dependencies(&self) -> CacheDependencies {
        let mut deps = CacheDependencies::new();
        deps.add_tag(self.cache_tag());
        deps
    }
}

impl Cacheable for AccessVerdict {
    fn cache_dependencies(&self) -> CacheDependencies {
        self.cache.clone()
    }
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessVerdict {
    pub outcome: Outcome,
    pub reason: Option<String>,
    pub cache: CacheDependencies,
}

impl AccessVerdict {
    fn with_outcome(outcome: Outcome, reason: Option<String>) -> Self {
        Self {
            outcome,
            reason,
            cache: CacheDependencies::new(),
        }
    }

    pub fn allowed() -> Self {
        Self::with_outcome(Outcome::Allowed, None)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Forbidden, Some(reason.into()))
    }

    pub fn neutral() -> Self {
        Self::with_outcome(Outcome::Neutral, None)
    }

    #[inline]
    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allowed
    }

    #[inline]
    pub fn is_forbidden(&self) -> bool {
        self.outcome == Outcome::Forbidden
    }

    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.outcome == Outcome::Neutral
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn add_cache_tag(mut self, tag: impl Into<String>) -> Self {
        self.cache.add_tag(tag);
        self
    }

    pub fn add_dependency(mut self, dependency: &impl Cacheable) -> Self {
        self.cache.merge(&dependency.cache_dependencies());
        self
    }

    /// Combine with `other`: forbidden wins, then allowed, otherwise neutral.
    pub fn or_if(self, other: AccessVerdict) -> AccessVerdict {
        let (outcome, reason) = match (self.outcome, other.outcome) {
            (Outcome::Forbidden, _) => (Outcome::Forbidden, self.reason),
            (_, Outcome::Forbidden) => (Outcome::Forbidden, other.reason),
            (Outcome::Allowed, _) => (Outcome::Allowed, self.reason),
            (_, Outcome::Allowed) => (Outcome::Allowed, other.reason),
            (Outcome::Neutral, Outcome::Neutral) => {
                (Outcome::Neutral, self.reason.or(other.reason))
            }
        };
        Self::merged(outcome, reason, self.cache, &other.cache)
    }

    fn merged(
        outcome: Outcome,
        reason: Option<String>,
        mut cache: CacheDependencies,
        other: &CacheDependencies,
    ) -> AccessVerdict {
        cache.merge(other);
        AccessVerdict {
            outcome,
            reason,
            cache,
        }
    }
}

impl fmt::Display for AccessVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.outcome, reason),
            None => write!(f, "{}", self.outcome),
        }
    }
}
