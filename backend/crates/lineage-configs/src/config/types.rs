use super::defaults::*;
use lineage_commons::{CudOperation, CudOperations, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub lut: LutSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    /// Wrapper bundles and their source fields; leaf-bearing fields are discovered here.
    #[serde(default = "default_bundles")]
    pub bundles: Vec<BundleSettings>,
    #[serde(default)]
    pub access: AccessSettings,
    #[serde(default)]
    pub cud: CudSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            lut: LutSettings::default(),
            schema: SchemaSettings::default(),
            bundles: default_bundles(),
            access: AccessSettings::default(),
            cud: CudSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Backing store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file; `:memory:` opens a private in-memory database.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Lookup table naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LutSettings {
    #[serde(default = "default_lut_table")]
    pub table_name: String,
    /// Alias of the LUT in the "not indexed at all" probe.
    #[serde(default = "default_null_alias")]
    pub null_alias: String,
    /// Alias of the LUT in the "reachable from an accessible ancestor" probe.
    #[serde(default = "default_existence_alias")]
    pub existence_alias: String,
}

impl Default for LutSettings {
    fn default() -> Self {
        Self {
            table_name: default_lut_table(),
            null_alias: default_null_alias(),
            existence_alias: default_existence_alias(),
        }
    }
}

/// Storage layout of one entity kind.
///
/// A field `F` of the kind lives in `{field_table_prefix}F` with columns
/// `entity_id` and `F_target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSchema {
    pub base_table: String,
    pub id_column: String,
    pub field_table_prefix: String,
    #[serde(default)]
    pub label_column: Option<String>,
}

impl KindSchema {
    pub fn new(base_table: &str, id_column: &str, field_table_prefix: &str) -> Self {
        Self {
            base_table: base_table.to_string(),
            id_column: id_column.to_string(),
            field_table_prefix: field_table_prefix.to_string(),
            label_column: None,
        }
    }

    pub fn with_label_column(mut self, column: &str) -> Self {
        self.label_column = Some(column.to_string());
        self
    }

    /// Satellite table holding values of `field`.
    pub fn field_table(&self, field: &str) -> String {
        format!("{}{}", self.field_table_prefix, field)
    }

    /// Column of a reference field's table holding the referenced id.
    pub fn field_target_column(field: &str) -> String {
        format!("{}_target_id", field)
    }

    /// Whether `table` is this kind's base table or one of its field tables.
    pub fn owns_table(&self, table: &str) -> bool {
        table == self.base_table || self.is_field_table(table)
    }

    pub fn is_field_table(&self, table: &str) -> bool {
        table.len() > self.field_table_prefix.len() && table.starts_with(&self.field_table_prefix)
    }
}

/// Entity storage schema for the three kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSettings {
    #[serde(default = "default_container_schema")]
    pub container: KindSchema,
    #[serde(default = "default_wrapper_schema")]
    pub wrapper: KindSchema,
    #[serde(default = "default_leaf_schema")]
    pub leaf: KindSchema,
    /// Wrapper field referencing the owning container.
    #[serde(default = "default_container_reference_field")]
    pub container_reference_field: String,
    /// Target handler marking a bundle source field as leaf-bearing.
    #[serde(default = "default_leaf_handler")]
    pub leaf_handler: String,
}

impl SchemaSettings {
    pub fn kind(&self, kind: EntityKind) -> &KindSchema {
        match kind {
            EntityKind::Container => &self.container,
            EntityKind::Wrapper => &self.wrapper,
            EntityKind::Leaf => &self.leaf,
        }
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            container: default_container_schema(),
            wrapper: default_wrapper_schema(),
            leaf: default_leaf_schema(),
            container_reference_field: default_container_reference_field(),
            leaf_handler: default_leaf_handler(),
        }
    }
}

/// A wrapper bundle and the field its content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSettings {
    pub name: String,
    pub source_field: String,
    /// Selection handler of the source field's target, `None` for non-reference fields.
    #[serde(default)]
    pub target_handler: Option<String>,
}

impl BundleSettings {
    pub fn new(name: &str, source_field: &str, target_handler: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            source_field: source_field.to_string(),
            target_handler: target_handler.map(str::to_string),
        }
    }
}

/// Inheritance rule for one child kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRuleSettings {
    /// Operations this kind inherits from its parent; others are "irrelevant".
    #[serde(default = "default_inherited_operations")]
    pub operations: Vec<String>,
    /// Operation renames applied when asking the parent, e.g. `download = "view"`.
    #[serde(default)]
    pub operation_map: BTreeMap<String, String>,
}

impl Default for AccessRuleSettings {
    fn default() -> Self {
        Self {
            operations: default_inherited_operations(),
            operation_map: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessSettings {
    #[serde(default = "default_wrapper_access_rule")]
    pub wrapper: AccessRuleSettings,
    #[serde(default)]
    pub leaf: AccessRuleSettings,
}

impl AccessSettings {
    /// Rule for a child kind; containers inherit nothing.
    pub fn rule(&self, kind: EntityKind) -> Option<&AccessRuleSettings> {
        match kind {
            EntityKind::Container => None,
            EntityKind::Wrapper => Some(&self.wrapper),
            EntityKind::Leaf => Some(&self.leaf),
        }
    }
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            wrapper: default_wrapper_access_rule(),
            leaf: AccessRuleSettings::default(),
        }
    }
}

/// Lifecycle operations each kind reacts to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CudSettings {
    #[serde(default = "default_delete_only")]
    pub container: Vec<CudOperation>,
    #[serde(default = "default_all_operations")]
    pub wrapper: Vec<CudOperation>,
    #[serde(default = "default_delete_only")]
    pub leaf: Vec<CudOperation>,
}

impl CudSettings {
    pub fn operations(&self, kind: EntityKind) -> CudOperations {
        let names = match kind {
            EntityKind::Container => &self.container,
            EntityKind::Wrapper => &self.wrapper,
            EntityKind::Leaf => &self.leaf,
        };
        names.iter().copied().collect()
    }
}

impl Default for CudSettings {
    fn default() -> Self {
        Self {
            container: default_delete_only(),
            wrapper: default_all_operations(),
            leaf: default_delete_only(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// Optional log file; console-only when unset.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Per-target overrides, e.g. `lineage_core = "debug"`.
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_console: true,
            file_path: None,
            targets: HashMap::new(),
        }
    }
}
