use lineage_configs::LineageConfig;
use lineage_store::{schema, Database, StoreError};

/// Create the lookup table, and the entity tables too when `with_entities` is set.
///
/// Existing tables are left untouched.
pub fn init_schema(db: &Database, config: &LineageConfig, with_entities: bool) -> anyhow::Result<()> {
    db.with_connection(|conn| -> Result<(), StoreError> {
        if with_entities {
            schema::provision(conn, config)
        } else {
            schema::provision_lut(conn, &config.lut.table_name)
        }
    })?;
    log::info!(
        "Provisioned {}{} in {}",
        config.lut.table_name,
        if with_entities { " and entity tables" } else { "" },
        db.location()
    );
    Ok(())
}
