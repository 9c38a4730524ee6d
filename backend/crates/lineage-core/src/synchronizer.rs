//! Incremental LUT maintenance driven by entity lifecycle notifications.

use crate::error::Result;
use crate::generator::LutGenerator;
use lineage_commons::{CudEvent, CudOperations, EntityKind, EntityRef, LutColumn};
use lineage_configs::CudSettings;
use lineage_store::Database;
use rusqlite::Connection;
use std::sync::Arc;

/// Keeps the lookup table consistent as entities are created, updated and deleted.
///
/// Every operation runs in its own transaction. Errors roll the transaction back and
/// are returned to the notifier.
pub struct LutSynchronizer {
    db: Arc<Database>,
    generator: Arc<LutGenerator>,
    container_ops: CudOperations,
    wrapper_ops: CudOperations,
    leaf_ops: CudOperations,
}

impl LutSynchronizer {
    pub fn new(db: Arc<Database>, generator: Arc<LutGenerator>, settings: &CudSettings) -> Self {
        Self {
            db,
            generator,
            container_ops: settings.operations(EntityKind::Container),
            wrapper_ops: settings.operations(EntityKind::Wrapper),
            leaf_ops: settings.operations(EntityKind::Leaf),
        }
    }

    /// Capability mask configured for `kind`.
    pub fn operations(&self, kind: EntityKind) -> CudOperations {
        match kind {
            EntityKind::Container => self.container_ops,
            EntityKind::Wrapper => self.wrapper_ops,
            EntityKind::Leaf => self.leaf_ops,
        }
    }

    fn enabled(&self, entity: &EntityRef, operation: CudOperations) -> bool {
        let enabled = self.operations(entity.kind).contains(operation);
        if !enabled {
            log::trace!("Ignoring {:?} for {}: not enabled for this kind", operation, entity);
        }
        enabled
    }

    /// Forward a lifecycle notification to the matching operation.
    pub fn handle(&self, event: CudEvent, entity: &EntityRef) -> Result<()> {
        match event {
            CudEvent::Created => self.create(entity),
            CudEvent::Updated => self.update(entity),
            CudEvent::Deleted => self.delete(entity),
        }
    }

    pub fn create(&self, entity: &EntityRef) -> Result<()> {
        if !self.enabled(entity, CudOperations::CREATE) {
            return Ok(());
        }
        self.db.transaction(|tx| self.create_with(tx, entity))
    }

    /// Replace the entity's rows: delete then recreate, atomically.
    pub fn update(&self, entity: &EntityRef) -> Result<()> {
        if !self.enabled(entity, CudOperations::UPDATE) {
            return Ok(());
        }
        self.db.transaction(|tx| match entity.kind {
            EntityKind::Wrapper => {
                self.delete_with(tx, entity)?;
                self.create_with(tx, entity)
            },
            EntityKind::Container | EntityKind::Leaf => self.refresh_wrappers_of(tx, entity),
        })
    }

    pub fn delete(&self, entity: &EntityRef) -> Result<()> {
        if !self.enabled(entity, CudOperations::DELETE) {
            return Ok(());
        }
        self.db.transaction(|tx| self.delete_with(tx, entity).map(|_| ()))
    }

    fn create_with(&self, conn: &Connection, entity: &EntityRef) -> Result<()> {
        match entity.kind {
            EntityKind::Wrapper => {
                self.generator.generate_with(conn, Some(entity.id))?;
            },
            EntityKind::Container | EntityKind::Leaf => {
                // Rows are keyed by wrapper; they appear once a wrapper references this entity.
                log::debug!("Nothing to generate on creation of {}", entity);
            },
        }
        Ok(())
    }

    fn delete_with(&self, conn: &Connection, entity: &EntityRef) -> Result<usize> {
        let removed = self
            .generator
            .lut()
            .delete_by(conn, entity.kind.lut_column(), entity.id)?;
        log::debug!("Removed {} LUT row(s) for {}", removed, entity);
        Ok(removed)
    }

    /// Regenerate every wrapper currently indexed alongside a container or leaf.
    fn refresh_wrappers_of(&self, conn: &Connection, entity: &EntityRef) -> Result<()> {
        let lut = self.generator.lut();
        let wrappers = lut.related_ids(conn, LutColumn::WrapperId, entity.kind.lut_column(), entity.id)?;
        for wrapper in &wrappers {
            lut.delete_by(conn, LutColumn::WrapperId, *wrapper)?;
            self.generator.generate_with(conn, Some(*wrapper))?;
        }
        log::debug!("Refreshed {} wrapper(s) related to {}", wrappers.len(), entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_commons::{CudOperation, LutRow};
    use lineage_store::test_utils::TestDb;

    fn synchronizer(test_db: &TestDb) -> LutSynchronizer {
        let generator = Arc::new(LutGenerator::new(test_db.db.clone(), &test_db.config).unwrap());
        LutSynchronizer::new(test_db.db.clone(), generator, &test_db.config.cud)
    }

    #[test]
    fn test_default_masks() {
        let test_db = TestDb::new().unwrap();
        let sync = synchronizer(&test_db);
        assert_eq!(sync.operations(EntityKind::Leaf), CudOperations::DELETE);
        assert_eq!(sync.operations(EntityKind::Container), CudOperations::DELETE);
        assert_eq!(sync.operations(EntityKind::Wrapper), CudOperations::all());
    }

    #[test]
    fn test_create_indexes_wrapper() {
        let test_db = TestDb::new().unwrap();
        let node = test_db.create_container("Book").unwrap();
        let file = test_db.create_leaf("a.tiff").unwrap();
        let media = test_db
            .create_wrapper("Page", Some(node), &[("field_media_file", file)])
            .unwrap();

        synchronizer(&test_db)
            .handle(CudEvent::Created, &EntityRef::new(EntityKind::Wrapper, media))
            .unwrap();

        assert_eq!(
            test_db.lut_rows().unwrap(),
            vec![LutRow::new(node.as_i64(), media.as_i64(), Some(file.as_i64()))]
        );
    }

    #[test]
    fn test_update_on_delete_only_kind_is_noop() {
        let test_db = TestDb::new().unwrap();
        let node = test_db.create_container("Book").unwrap();
        let file = test_db.create_leaf("a.tiff").unwrap();
        let media = test_db
            .create_wrapper("Page", Some(node), &[("field_media_file", file)])
            .unwrap();
        let sync = synchronizer(&test_db);
        sync.create(&EntityRef::new(EntityKind::Wrapper, media)).unwrap();

        sync.update(&EntityRef::new(EntityKind::Leaf, file)).unwrap();
        assert_eq!(test_db.lut_rows().unwrap().len(), 1);
    }

    #[test]
    fn test_leaf_update_refreshes_wrappers_when_enabled() {
        let mut config = lineage_configs::LineageConfig::default();
        config.cud.leaf = vec![CudOperation::Update, CudOperation::Delete];
        let test_db = TestDb::with_config(config).unwrap();
        let node = test_db.create_container("Book").unwrap();
        let file = test_db.create_leaf("a.tiff").unwrap();
        let media = test_db
            .create_wrapper("Page", Some(node), &[("field_media_file", file)])
            .unwrap();
        let sync = synchronizer(&test_db);
        sync.create(&EntityRef::new(EntityKind::Wrapper, media)).unwrap();

        sync.update(&EntityRef::new(EntityKind::Leaf, file)).unwrap();
        assert_eq!(
            test_db.lut_rows().unwrap(),
            vec![LutRow::new(node.as_i64(), media.as_i64(), Some(file.as_i64()))]
        );
    }

    #[test]
    fn test_create_ignored_for_leaf() {
        let test_db = TestDb::new().unwrap();
        let file = test_db.create_leaf("a.tiff").unwrap();
        synchronizer(&test_db)
            .create(&EntityRef::new(EntityKind::Leaf, file))
            .unwrap();
        assert!(test_db.lut_rows().unwrap().is_empty());
    }
}
