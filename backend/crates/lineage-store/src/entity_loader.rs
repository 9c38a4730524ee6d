//! Entity loading for access evaluation.

use crate::database::Database;
use crate::error::Result;
use lineage_commons::{Entity, EntityRef};
use lineage_configs::SchemaSettings;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

/// Loads entities by reference.
///
/// `Ok(None)` means the entity does not exist (for example a dangling id left in the
/// lookup table after an out-of-band deletion).
pub trait EntityLoader: Send + Sync {
    fn load(&self, reference: EntityRef) -> Result<Option<Entity>>;
}

/// Loads entities from their base tables.
pub struct SqliteEntityLoader {
    db: Arc<Database>,
    schema: SchemaSettings,
}

impl SqliteEntityLoader {
    pub fn new(db: Arc<Database>, schema: SchemaSettings) -> Self {
        Self { db, schema }
    }
}

impl EntityLoader for SqliteEntityLoader {
    fn load(&self, reference: EntityRef) -> Result<Option<Entity>> {
        let schema = self.schema.kind(reference.kind);
        let label = schema.label_column.as_deref().unwrap_or("NULL");
        let sql = format!(
            "SELECT {id}, {label} FROM {table} WHERE {id} = ?1",
            id = schema.id_column,
            label = label,
            table = schema.base_table
        );

        self.db.with_connection(|conn| {
            let found = conn
                .query_row(&sql, params![reference.id.as_i64()], |row| {
                    row.get::<_, Option<String>>(1)
                })
                .optional()?;
            Ok(found.map(|label| Entity {
                reference,
                label,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDb;
    use lineage_commons::EntityKind;

    #[test]
    fn test_load_existing_and_missing() {
        let test_db = TestDb::new().unwrap();
        let node = test_db.create_container("Collection").unwrap();
        let loader = test_db.loader();

        let loaded = loader.load(EntityRef::new(EntityKind::Container, node)).unwrap();
        assert_eq!(loaded.and_then(|e| e.label), Some("Collection".to_string()));

        let missing = loader.load(EntityRef::container(9999)).unwrap();
        assert!(missing.is_none());
    }
}
