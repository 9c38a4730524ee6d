use super::evaluator::{EntityAccess, EntityAccessEvaluator};
use super::policy::AccessPolicy;
use crate::error::Result;
use lineage_commons::{AccessVerdict, AccountId, Entity};
use std::sync::Arc;

/// Full access check for one entity: its own policy verdict OR-combined with the
/// verdict inherited from its parents.
///
/// Forbidden from either side wins, then allowed, otherwise neutral. Containers have
/// no parents and only consult the policy.
pub struct AccessResolver {
    policy: Arc<dyn AccessPolicy>,
    evaluator: EntityAccessEvaluator,
}

impl AccessResolver {
    pub fn new(policy: Arc<dyn AccessPolicy>, evaluator: EntityAccessEvaluator) -> Self {
        Self { policy, evaluator }
    }

    pub fn evaluator(&self) -> &EntityAccessEvaluator {
        &self.evaluator
    }

    /// Inherited verdict only, without the entity's own policy.
    pub fn inherited(&self, entity: &Entity, operation: &str, account: &AccountId) -> Result<AccessVerdict> {
        self.evaluator.check(entity, operation, account, self)
    }
}

impl EntityAccess for AccessResolver {
    fn access(&self, entity: &Entity, operation: &str, account: &AccountId) -> Result<AccessVerdict> {
        let own = self.policy.check(entity, operation, account);
        if entity.kind().parent().is_none() {
            return Ok(own);
        }
        let inherited = self.inherited(entity, operation, account)?;
        Ok(own.or_if(inherited))
    }
}
