use super::types::{KindSchema, LineageConfig};
use lineage_commons::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static RE_SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_FORMATS: [&str; 2] = ["compact", "json"];

pub const ENV_DATABASE_PATH: &str = "LINEAGE_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "LINEAGE_LOG_LEVEL";

impl LineageConfig {
    /// Load configuration from a TOML file
    ///
    /// Environment overrides are applied before validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without applying environment overrides.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// Apply `LINEAGE_*` environment variables on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            if !path.trim().is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.logging.level = level.to_lowercase();
            }
        }
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path cannot be empty"));
        }

        validate_identifier("lut.table_name", &self.lut.table_name)?;
        validate_identifier("lut.null_alias", &self.lut.null_alias)?;
        validate_identifier("lut.existence_alias", &self.lut.existence_alias)?;
        if self.lut.null_alias == self.lut.existence_alias {
            return Err(anyhow::anyhow!(
                "lut.null_alias and lut.existence_alias must differ (both '{}')",
                self.lut.null_alias
            ));
        }

        for kind in EntityKind::ALL {
            validate_kind_schema(kind, self.schema.kind(kind))?;
        }
        validate_identifier(
            "schema.container_reference_field",
            &self.schema.container_reference_field,
        )?;

        for bundle in &self.bundles {
            if bundle.name.trim().is_empty() {
                return Err(anyhow::anyhow!("bundle name cannot be empty"));
            }
            validate_identifier(
                &format!("bundles.{}.source_field", bundle.name),
                &bundle.source_field,
            )?;
        }

        for kind in [EntityKind::Wrapper, EntityKind::Leaf] {
            let Some(rule) = self.access.rule(kind) else {
                continue;
            };
            for op in rule.operation_map.keys() {
                if !rule.operations.contains(op) {
                    return Err(anyhow::anyhow!(
                        "access.{}.operation_map maps '{}' which is not listed in operations",
                        kind,
                        op
                    ));
                }
            }
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            ));
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_FORMATS.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    VALID_LEVELS.join(", ")
                ));
            }
        }

        Ok(())
    }
}

fn validate_kind_schema(kind: EntityKind, schema: &KindSchema) -> anyhow::Result<()> {
    validate_identifier(&format!("schema.{}.base_table", kind), &schema.base_table)?;
    validate_identifier(&format!("schema.{}.id_column", kind), &schema.id_column)?;
    validate_identifier(
        &format!("schema.{}.field_table_prefix", kind),
        &schema.field_table_prefix,
    )?;
    if let Some(label) = &schema.label_column {
        validate_identifier(&format!("schema.{}.label_column", kind), label)?;
    }
    if schema.is_field_table(&schema.base_table) {
        return Err(anyhow::anyhow!(
            "schema.{}.base_table '{}' collides with its own field_table_prefix '{}'",
            kind,
            schema.base_table,
            schema.field_table_prefix
        ));
    }
    Ok(())
}

/// Table, column and alias names are spliced into SQL, so only plain identifiers pass.
pub fn validate_identifier(setting: &str, value: &str) -> anyhow::Result<()> {
    if RE_SQL_IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} must be a plain SQL identifier, got '{}'",
            setting,
            value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = LineageConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_table_name() {
        let mut config = LineageConfig::default();
        config.lut.table_name = "lut; DROP TABLE node".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aliases_must_differ() {
        let mut config = LineageConfig::default();
        config.lut.existence_alias = config.lut.null_alias.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = LineageConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_operation_map_must_target_listed_operation() {
        let mut config = LineageConfig::default();
        config
            .access
            .leaf
            .operation_map
            .insert("update".to_string(), "view".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[lut]
table_name = "access_lut"

[schema]
container_reference_field = "field_member_of"

[[bundles]]
name = "audio"
source_field = "field_media_audio_file"
target_handler = "default:file"

[cud]
leaf = ["delete", "update"]
"#
        )
        .unwrap();

        let config = LineageConfig::from_file(file.path()).unwrap();
        assert_eq!(config.lut.table_name, "access_lut");
        assert_eq!(config.lut.null_alias, "lut_null");
        assert_eq!(config.schema.container_reference_field, "field_member_of");
        assert_eq!(config.schema.wrapper.base_table, "media");
        assert_eq!(config.bundles.len(), 1);
        assert_eq!(
            config.access.wrapper.operation_map.get("download").map(String::as_str),
            Some("view")
        );
        assert!(config
            .cud
            .operations(EntityKind::Leaf)
            .contains(lineage_commons::CudOperations::UPDATE));
        assert_eq!(
            config.cud.operations(EntityKind::Container),
            lineage_commons::CudOperations::DELETE
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = LineageConfig::from_file("/nonexistent/lineage.toml");
        assert!(result.is_err());
    }
}
