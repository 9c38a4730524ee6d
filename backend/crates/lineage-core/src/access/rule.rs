//! Inheritance rules: which operations a child kind takes from its parent.

use lineage_commons::EntityKind;
use lineage_configs::AccessRuleSettings;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedAccessRule {
    kind: EntityKind,
    parent: EntityKind,
    operations: Vec<String>,
    operation_map: BTreeMap<String, String>,
}

impl InheritedAccessRule {
    /// Rule for `kind` from configuration; `None` for kinds without a parent.
    pub fn from_settings(kind: EntityKind, settings: &AccessRuleSettings) -> Option<Self> {
        let parent = kind.parent()?;
        Some(Self {
            kind,
            parent,
            operations: settings.operations.clone(),
            operation_map: settings.operation_map.clone(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn parent(&self) -> EntityKind {
        self.parent
    }

    pub fn applies_to(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == operation)
    }

    /// Operation to ask the parent for, e.g. `download` becomes `view`.
    pub fn parent_operation<'a>(&'a self, operation: &'a str) -> &'a str {
        self.operation_map
            .get(operation)
            .map(String::as_str)
            .unwrap_or(operation)
    }
}
