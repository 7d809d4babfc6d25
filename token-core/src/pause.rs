//! Pause gate
//!
//! Two states, `Active` and `Paused`, stored as the `paused` flag in
//! [`crate::types::Globals`]. Only the owner moves between them, and only on
//! a pausable deployment.

use crate::{
    access::{require_feature, require_owner},
    storage::StateStore,
    transaction::Transaction,
    types::{AccountId, ContractEvent, FeatureFlags},
    Error, Result,
};

/// Fail with `Paused` while the gate is closed
pub fn ensure_not_paused<S: StateStore + ?Sized>(tx: &Transaction<'_, S>) -> Result<()> {
    if tx.globals().paused {
        return Err(Error::Paused);
    }
    Ok(())
}

/// Active -> Paused
pub fn pause<S: StateStore + ?Sized>(tx: &mut Transaction<'_, S>, caller: AccountId) -> Result<()> {
    require_feature(tx, FeatureFlags::is_pausable)?;
    require_owner(tx, &caller)?;
    ensure_not_paused(tx)?;

    tx.globals_mut().paused = true;
    tx.emit(ContractEvent::Paused { by: caller });
    tracing::info!(%caller, "Contract paused");
    Ok(())
}

/// Paused -> Active
pub fn unpause<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    caller: AccountId,
) -> Result<()> {
    require_feature(tx, FeatureFlags::is_pausable)?;
    require_owner(tx, &caller)?;
    if !tx.globals().paused {
        return Err(Error::NotPaused);
    }

    tx.globals_mut().paused = false;
    tx.emit(ContractEvent::Unpaused { by: caller });
    tracing::info!(%caller, "Contract unpaused");
    Ok(())
}

/// Flip the gate, whichever state it is in
pub fn switch<S: StateStore + ?Sized>(tx: &mut Transaction<'_, S>, caller: AccountId) -> Result<()> {
    if tx.globals().paused {
        unpause(tx, caller)
    } else {
        pause(tx, caller)
    }
}
