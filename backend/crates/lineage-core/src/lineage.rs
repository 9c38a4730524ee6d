//! Service facade wiring the components over one database.

use crate::access::{AccessPolicy, AccessResolver, EntityAccess, EntityAccessEvaluator};
use crate::error::Result;
use crate::generator::LutGenerator;
use crate::synchronizer::LutSynchronizer;
use crate::tagger::{QueryAlterer, QueryTagger, TaggingDispatcher};
use lineage_commons::{AccessVerdict, AccountId, Entity, EntityId, EntityKind, EntityRef, LutColumn};
use lineage_configs::LineageConfig;
use lineage_store::{schema, Database, EntityLoader, SqliteEntityLoader, StoreError};
use std::sync::Arc;

/// Outcome of regenerating an explicit list of wrappers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerationReport {
    pub regenerated: usize,
    pub failed: Vec<EntityId>,
}

impl RegenerationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Lineage {
    config: LineageConfig,
    db: Arc<Database>,
    loader: Arc<dyn EntityLoader>,
    generator: Arc<LutGenerator>,
    synchronizer: LutSynchronizer,
    tagger: QueryTagger,
    resolver: AccessResolver,
}

impl Lineage {
    /// Wire everything over `db`. The lookup table is provisioned if missing.
    pub fn new(
        config: LineageConfig,
        db: Arc<Database>,
        policy: Arc<dyn AccessPolicy>,
        alterer: Arc<dyn QueryAlterer>,
    ) -> Result<Self> {
        db.with_connection(|conn| schema::provision_lut(conn, &config.lut.table_name))?;

        let loader: Arc<dyn EntityLoader> =
            Arc::new(SqliteEntityLoader::new(db.clone(), config.schema.clone()));
        let generator = Arc::new(LutGenerator::new(db.clone(), &config)?);
        let synchronizer = LutSynchronizer::new(db.clone(), generator.clone(), &config.cud);
        let tagger = QueryTagger::new(&config, alterer, Arc::new(TaggingDispatcher::new()));
        let evaluator = EntityAccessEvaluator::from_config(db.clone(), loader.clone(), &config)?;
        let resolver = AccessResolver::new(policy, evaluator);

        Ok(Self {
            config,
            db,
            loader,
            generator,
            synchronizer,
            tagger,
            resolver,
        })
    }

    /// Open the configured database file and wire everything over it.
    pub fn open(
        config: LineageConfig,
        policy: Arc<dyn AccessPolicy>,
        alterer: Arc<dyn QueryAlterer>,
    ) -> Result<Self> {
        let db = Arc::new(Database::open(&config.database.path)?);
        log::info!("Using database at {}", db.location());
        Self::new(config, db, policy, alterer)
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn generator(&self) -> &LutGenerator {
        &self.generator
    }

    pub fn synchronizer(&self) -> &LutSynchronizer {
        &self.synchronizer
    }

    pub fn tagger(&self) -> &QueryTagger {
        &self.tagger
    }

    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    /// Full access check for an already loaded entity.
    pub fn check_access(&self, entity: &Entity, operation: &str, account: &AccountId) -> Result<AccessVerdict> {
        self.resolver.access(entity, operation, account)
    }

    /// Load `reference` and check it.
    pub fn check_reference(
        &self,
        reference: EntityRef,
        operation: &str,
        account: &AccountId,
    ) -> Result<AccessVerdict> {
        let entity = self
            .loader
            .load(reference)?
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))?;
        self.check_access(&entity, operation, account)
    }

    pub fn regenerate(&self) -> Result<usize> {
        self.generator.regenerate()
    }

    /// Replace the rows of each listed wrapper. Wrappers that fail to load or to
    /// regenerate are reported, not raised.
    pub fn regenerate_wrappers(&self, ids: &[EntityId]) -> RegenerationReport {
        let mut report = RegenerationReport::default();
        for id in ids {
            let reference = EntityRef::new(EntityKind::Wrapper, *id);
            match self.regenerate_wrapper(reference) {
                Ok(true) => report.regenerated += 1,
                Ok(false) => {
                    log::warn!("Failed to load {}; skipping", reference);
                    report.failed.push(*id);
                },
                Err(err) => {
                    log::warn!("Failed to regenerate {}: {}", reference, err);
                    report.failed.push(*id);
                },
            }
        }
        log::info!(
            "Regenerated {} wrapper(s); {} failed",
            report.regenerated,
            report.failed.len()
        );
        report
    }

    fn regenerate_wrapper(&self, reference: EntityRef) -> Result<bool> {
        if self.loader.load(reference)?.is_none() {
            return Ok(false);
        }
        self.db.transaction(|tx| -> Result<()> {
            self.generator
                .lut()
                .delete_by(tx, LutColumn::WrapperId, reference.id)?;
            self.generator.generate_with(tx, Some(reference.id))?;
            Ok(())
        })?;
        log::debug!("Regenerated LUT rows for {}", reference);
        Ok(true)
    }
}
