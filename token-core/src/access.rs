//! Single-owner access control

use crate::{
    storage::StateStore,
    transaction::Transaction,
    types::{AccountId, FeatureFlags},
    Error, Result,
};

/// Fail with `Unauthorized` unless `caller` is the owner
pub fn require_owner<S: StateStore + ?Sized>(
    tx: &Transaction<'_, S>,
    caller: &AccountId,
) -> Result<()> {
    if *caller != tx.info().owner {
        tracing::warn!(%caller, "Privileged call from non-owner");
        return Err(Error::Unauthorized);
    }
    Ok(())
}

/// Fail with `NotSupported` unless `check` holds for the deployed flags
pub fn require_feature<S: StateStore + ?Sized>(
    tx: &Transaction<'_, S>,
    check: fn(&FeatureFlags) -> bool,
) -> Result<()> {
    if !check(&tx.info().features) {
        return Err(Error::NotSupported);
    }
    Ok(())
}
