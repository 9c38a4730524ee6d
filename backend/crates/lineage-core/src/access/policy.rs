use lineage_commons::{AccessVerdict, AccountId, Entity};

/// The external, per-entity authorization collaborator.
///
/// Consulted for every entity whose access is checked, including containers, which
/// have no other source of truth.
pub trait AccessPolicy: Send + Sync {
    fn check(&self, entity: &Entity, operation: &str, account: &AccountId) -> AccessVerdict;
}

impl<F> AccessPolicy for F
where
    F: Fn(&Entity, &str, &AccountId) -> AccessVerdict + Send + Sync,
{
    fn check(&self, entity: &Entity, operation: &str, account: &AccountId) -> AccessVerdict {
        self(entity, operation, account)
    }
}

/// Policy without an opinion on anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralPolicy;

impl AccessPolicy for NeutralPolicy {
    fn check(&self, _entity: &Entity, _operation: &str, _account: &AccountId) -> AccessVerdict {
        AccessVerdict::neutral()
    }
}
