//! Test utilities for lineage-store.
//!
//! Provides a provisioned database plus helpers that play the part of the entity
//! storage layer (creating containers, wrappers and leaves, rewriting references).

use crate::database::Database;
use crate::entity_loader::SqliteEntityLoader;
use crate::error::Result;
use crate::lut_store::LutStore;
use crate::schema::{self, wrapper_reference_fields};
use lineage_commons::{EntityId, EntityKind, EntityRef, LutRow};
use lineage_configs::{KindSchema, LineageConfig};
use rusqlite::params;
use std::sync::Arc;
use tempfile::TempDir;

/// Provisioned test database.
pub struct TestDb {
    pub db: Arc<Database>,
    pub config: LineageConfig,
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: Option<TempDir>,
}

impl TestDb {
    /// In-memory database with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(LineageConfig::default())
    }

    pub fn with_config(config: LineageConfig) -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.with_connection(|conn| schema::provision(conn, &config))?;
        Ok(Self {
            db: Arc::new(db),
            config,
            temp_dir: None,
        })
    }

    /// File-backed database in a temporary directory.
    pub fn on_disk() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config = LineageConfig::default();
        let db = Database::open(temp_dir.path().join("lineage.db"))?;
        db.with_connection(|conn| schema::provision(conn, &config))?;
        Ok(Self {
            db: Arc::new(db),
            config,
            temp_dir: Some(temp_dir),
        })
    }

    pub fn loader(&self) -> SqliteEntityLoader {
        SqliteEntityLoader::new(self.db.clone(), self.config.schema.clone())
    }

    pub fn lut(&self) -> LutStore {
        LutStore::new(self.config.lut.table_name.clone())
            .expect("test config uses a valid LUT table name")
    }

    /// Current LUT contents, ordered.
    pub fn lut_rows(&self) -> Result<Vec<LutRow>> {
        let lut = self.lut();
        self.db.with_connection(|conn| lut.rows(conn))
    }

    fn schema(&self, kind: EntityKind) -> &KindSchema {
        self.config.schema.kind(kind)
    }

    fn insert_entity(&self, kind: EntityKind, label: &str) -> Result<EntityId> {
        let schema = self.schema(kind);
        self.db.with_connection(|conn| {
            match &schema.label_column {
                Some(column) => conn.execute(
                    &format!("INSERT INTO {} ({}) VALUES (?1)", schema.base_table, column),
                    params![label],
                )?,
                None => conn.execute(
                    &format!("INSERT INTO {} DEFAULT VALUES", schema.base_table),
                    [],
                )?,
            };
            Ok(EntityId::new(conn.last_insert_rowid()))
        })
    }

    pub fn create_container(&self, title: &str) -> Result<EntityId> {
        self.insert_entity(EntityKind::Container, title)
    }

    pub fn create_leaf(&self, filename: &str) -> Result<EntityId> {
        self.insert_entity(EntityKind::Leaf, filename)
    }

    /// Create a wrapper under `container` referencing `leaves` as `(field, leaf)` pairs.
    pub fn create_wrapper(
        &self,
        name: &str,
        container: Option<EntityId>,
        leaves: &[(&str, EntityId)],
    ) -> Result<EntityId> {
        let wrapper = self.insert_entity(EntityKind::Wrapper, name)?;
        if let Some(container) = container {
            let field = self.config.schema.container_reference_field.clone();
            self.set_reference(wrapper, &field, &[container])?;
        }
        for (field, leaf) in leaves {
            self.append_reference(wrapper, field, *leaf)?;
        }
        Ok(wrapper)
    }

    /// Replace all values of a wrapper reference field.
    pub fn set_reference(&self, wrapper: EntityId, field: &str, targets: &[EntityId]) -> Result<()> {
        let table = self.schema(EntityKind::Wrapper).field_table(field);
        let target_column = KindSchema::field_target_column(field);
        self.db.transaction(|tx| {
            tx.execute(
                &format!("DELETE FROM {} WHERE entity_id = ?1", table),
                params![wrapper.as_i64()],
            )?;
            for (delta, target) in targets.iter().enumerate() {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (entity_id, delta, {}) VALUES (?1, ?2, ?3)",
                        table, target_column
                    ),
                    params![wrapper.as_i64(), delta as i64, target.as_i64()],
                )?;
            }
            Ok(())
        })
    }

    /// Add one value to a wrapper reference field.
    pub fn append_reference(&self, wrapper: EntityId, field: &str, target: EntityId) -> Result<()> {
        let table = self.schema(EntityKind::Wrapper).field_table(field);
        let target_column = KindSchema::field_target_column(field);
        self.db.with_connection(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (entity_id, delta, {target}) \
                     SELECT ?1, COUNT(*), ?2 FROM {table} WHERE entity_id = ?1",
                    table = table,
                    target = target_column
                ),
                params![wrapper.as_i64(), target.as_i64()],
            )?;
            Ok(())
        })
    }

    /// Delete an entity from its base table (and, for wrappers, its field values).
    ///
    /// The lookup table is left alone; keeping it in sync is the synchronizer's job.
    pub fn delete_entity(&self, reference: EntityRef) -> Result<()> {
        let schema = self.schema(reference.kind).clone();
        let field_tables: Vec<String> = if reference.kind == EntityKind::Wrapper {
            wrapper_reference_fields(&self.config)
                .iter()
                .map(|field| schema.field_table(field))
                .collect()
        } else {
            Vec::new()
        };
        self.db.transaction(|tx| {
            tx.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", schema.base_table, schema.id_column),
                params![reference.id.as_i64()],
            )?;
            for table in &field_tables {
                tx.execute(
                    &format!("DELETE FROM {} WHERE entity_id = ?1", table),
                    params![reference.id.as_i64()],
                )?;
            }
            Ok(())
        })
    }
}
