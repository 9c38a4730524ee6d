//! Table provisioning
//!
//! Creates the lookup table and, for tooling and tests, the entity tables described by
//! the configuration. Every statement is `IF NOT EXISTS`, so provisioning twice is safe.

use crate::error::{Result, StoreError};
use lineage_commons::{EntityKind, LutColumn};
use lineage_configs::{KindSchema, LineageConfig};
use rusqlite::Connection;

/// Create the lookup table and one index per column.
///
/// The table has no uniqueness constraint: duplicates are prevented by the
/// delete-then-generate discipline of its writers.
pub fn provision_lut(conn: &Connection, table: &str) -> Result<()> {
    check_identifier(table)?;
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n\
         \x20   {container} INTEGER NOT NULL,\n\
         \x20   {wrapper} INTEGER NOT NULL,\n\
         \x20   {leaf} INTEGER\n\
         );\n",
        table = table,
        container = LutColumn::ContainerId,
        wrapper = LutColumn::WrapperId,
        leaf = LutColumn::LeafId,
    );
    for column in [LutColumn::ContainerId, LutColumn::WrapperId, LutColumn::LeafId] {
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_{column} ON {table} ({column});\n",
            table = table,
            column = column
        ));
    }
    conn.execute_batch(&ddl)?;
    log::debug!("Provisioned lookup table '{}'", table);
    Ok(())
}

/// Reference fields stored for wrappers: the container reference plus every bundle
/// source field that targets another entity.
pub fn wrapper_reference_fields(config: &LineageConfig) -> Vec<String> {
    let mut fields = vec![config.schema.container_reference_field.clone()];
    for bundle in &config.bundles {
        if bundle.target_handler.is_some() && !fields.contains(&bundle.source_field) {
            fields.push(bundle.source_field.clone());
        }
    }
    fields
}

/// Create base tables for the three kinds and the wrapper reference field tables.
pub fn provision_entities(conn: &Connection, config: &LineageConfig) -> Result<()> {
    let mut ddl = String::new();
    for kind in EntityKind::ALL {
        ddl.push_str(&base_table_ddl(config.schema.kind(kind)));
    }

    let wrapper = &config.schema.wrapper;
    for field in wrapper_reference_fields(config) {
        let table = wrapper.field_table(&field);
        ddl.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n\
             \x20   entity_id INTEGER NOT NULL,\n\
             \x20   delta INTEGER NOT NULL DEFAULT 0,\n\
             \x20   {target} INTEGER\n\
             );\n\
             CREATE INDEX IF NOT EXISTS {table}_entity_id ON {table} (entity_id);\n",
            table = table,
            target = KindSchema::field_target_column(&field),
        ));
    }

    conn.execute_batch(&ddl)?;
    log::debug!("Provisioned entity tables");
    Ok(())
}

/// Provision everything: entity tables, then the lookup table.
pub fn provision(conn: &Connection, config: &LineageConfig) -> Result<()> {
    provision_entities(conn, config)?;
    provision_lut(conn, &config.lut.table_name)
}

fn base_table_ddl(schema: &KindSchema) -> String {
    let label = schema
        .label_column
        .as_ref()
        .map(|column| format!(",\n    {} TEXT", column))
        .unwrap_or_default();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {id} INTEGER PRIMARY KEY AUTOINCREMENT{label}\n);\n",
        table = schema.base_table,
        id = schema.id_column,
        label = label
    )
}

pub(crate) fn check_identifier(value: &str) -> Result<()> {
    lineage_configs::loader::validate_identifier("identifier", value)
        .map_err(|e| StoreError::InvalidIdentifier(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        names
    }

    #[test]
    fn test_provision_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let config = LineageConfig::default();
        provision(&conn, &config).unwrap();
        provision(&conn, &config).unwrap();

        let names = table_names(&conn);
        assert!(names.contains(&"hierarchical_access_lut".to_string()));
        assert!(names.contains(&"node".to_string()));
        assert!(names.contains(&"media".to_string()));
        assert!(names.contains(&"file_managed".to_string()));
        assert!(names.contains(&"media__field_media_of".to_string()));
        assert!(names.contains(&"media__field_media_file".to_string()));
        assert!(!names.contains(&"media__field_media_oembed_video".to_string()));
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        let result = provision_lut(&conn, "lut (x); DROP TABLE node; --");
        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
    }
}
