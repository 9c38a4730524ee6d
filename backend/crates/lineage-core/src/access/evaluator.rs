//! Inherited access: walk the lookup table up to candidate parents and ask them.

use super::rule::InheritedAccessRule;
use crate::error::Result;
use lineage_commons::{AccessVerdict, AccountId, Entity, EntityId, EntityKind, EntityRef};
use lineage_configs::LineageConfig;
use lineage_store::{Database, EntityLoader, LutStore};
use std::sync::Arc;

const IRRELEVANT_OPERATION: &str = "Irrelevant operation.";
const NO_CANDIDATES: &str = "No candidate target entities found.";

/// An entity's complete access check, used to evaluate candidate parents.
pub trait EntityAccess {
    fn access(&self, entity: &Entity, operation: &str, account: &AccountId) -> Result<AccessVerdict>;
}

pub struct EntityAccessEvaluator {
    db: Arc<Database>,
    lut: LutStore,
    loader: Arc<dyn EntityLoader>,
    rules: Vec<InheritedAccessRule>,
}

impl EntityAccessEvaluator {
    pub fn new(
        db: Arc<Database>,
        lut: LutStore,
        loader: Arc<dyn EntityLoader>,
        rules: Vec<InheritedAccessRule>,
    ) -> Self {
        Self {
            db,
            lut,
            loader,
            rules,
        }
    }

    /// Evaluator with the configured wrapper and leaf rules.
    pub fn from_config(db: Arc<Database>, loader: Arc<dyn EntityLoader>, config: &LineageConfig) -> Result<Self> {
        let rules = EntityKind::ALL
            .iter()
            .filter_map(|kind| {
                config
                    .access
                    .rule(*kind)
                    .and_then(|settings| InheritedAccessRule::from_settings(*kind, settings))
            })
            .collect();
        let lut = LutStore::new(config.lut.table_name.clone())?;
        Ok(Self::new(db, lut, loader, rules))
    }

    pub fn rule(&self, kind: EntityKind) -> Option<&InheritedAccessRule> {
        self.rules.iter().find(|rule| rule.kind() == kind)
    }

    /// Distinct ids of the immediate parents recorded for `entity`.
    pub fn candidates(&self, entity: &EntityRef, parent: EntityKind) -> Result<Vec<EntityId>> {
        let ids = self.db.with_connection(|conn| {
            self.lut
                .related_ids(conn, parent.lut_column(), entity.kind.lut_column(), entity.id)
        })?;
        Ok(ids)
    }

    /// Inherited verdict for `operation` on `entity`.
    ///
    /// - neutral when the operation is not inherited by this kind
    /// - neutral when the LUT records no parent
    /// - allowed as soon as one parent's own check allows
    /// - forbidden otherwise, with every rejection reason
    pub fn check(
        &self,
        entity: &Entity,
        operation: &str,
        account: &AccountId,
        parents: &dyn EntityAccess,
    ) -> Result<AccessVerdict> {
        let Some(rule) = self
            .rule(entity.kind())
            .filter(|rule| rule.applies_to(operation))
        else {
            return Ok(AccessVerdict::neutral().set_reason(IRRELEVANT_OPERATION));
        };

        let parent_kind = rule.parent();
        let result = AccessVerdict::neutral()
            .add_dependency(entity)
            .add_dependency(account);

        let candidates = self.candidates(&entity.reference, parent_kind)?;
        if candidates.is_empty() {
            log::trace!("No {} candidates for {}", parent_kind, entity.reference);
            return Ok(result
                .set_reason(NO_CANDIDATES)
                .add_cache_tag(parent_kind.list_cache_tag()));
        }

        let parent_operation = rule.parent_operation(operation);
        let mut reasons = Vec::with_capacity(candidates.len());
        for id in candidates {
            let reference = EntityRef::new(parent_kind, id);
            let parent = match self.loader.load(reference) {
                Ok(Some(parent)) => parent,
                Ok(None) => {
                    reasons.push(format!("Rejecting {} {} because it failed to load.", parent_kind, id));
                    continue;
                },
                Err(err) => {
                    log::warn!("Failed to load {}: {}", reference, err);
                    reasons.push(format!("Rejecting {} {} because it failed to load.", parent_kind, id));
                    continue;
                },
            };

            let verdict = parents.access(&parent, parent_operation, account)?;
            if verdict.is_allowed() {
                log::trace!("{} allows {} on {}", reference, parent_operation, entity.reference);
                return Ok(result.or_if(verdict).add_dependency(&parent));
            }

            reasons.push(match verdict.reason() {
                Some(reason) => format!(
                    "Rejecting {} {} because provided reasoning: {}",
                    parent_kind, id, reason
                ),
                None => format!("Rejecting {} {}.", parent_kind, id),
            });
        }

        let denied = AccessVerdict::forbidden(format!(
            "Failed to find an entity allowing access: {}",
            reasons.join(" ")
        ));
        Ok(result
            .or_if(denied)
            .add_cache_tag(parent_kind.list_cache_tag()))
    }
}
