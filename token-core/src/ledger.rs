//! PSP22 balance and allowance bookkeeping
//!
//! These are the unguarded internals: feature flags, pause state and
//! ownership are checked by the caller in [`crate::contract`]. Every function
//! here keeps `Σ balances == total_supply` and never wraps.

use crate::{
    storage::StateStore,
    transaction::Transaction,
    types::{AccountId, Balance, ContractEvent},
    Error, Result,
};

/// Move `value` from `from` to `to`
pub fn transfer_from_to<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    from: AccountId,
    to: AccountId,
    value: Balance,
) -> Result<()> {
    if to.is_zero() {
        return Err(Error::ZeroAddress);
    }

    let from_balance = tx.balance(&from)?;
    let remaining = from_balance
        .checked_sub(value)
        .ok_or(Error::InsufficientBalance)?;
    tx.set_balance(from, remaining);

    // Read after the debit so a self-transfer nets to zero
    let to_balance = tx.balance(&to)?;
    let credited = to_balance.checked_add(value).ok_or(Error::Overflow)?;
    tx.set_balance(to, credited);

    tx.emit(ContractEvent::Transfer {
        from: Some(from),
        to: Some(to),
        value,
    });

    tracing::debug!(%from, %to, value, "Transfer");
    Ok(())
}

/// Create `amount` new tokens in `account`
pub fn mint_to<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    account: AccountId,
    amount: Balance,
) -> Result<()> {
    if account.is_zero() {
        return Err(Error::ZeroAddress);
    }

    let total_supply = tx
        .globals()
        .total_supply
        .checked_add(amount)
        .ok_or(Error::Overflow)?;
    // Cannot overflow when the supply did not, but stay checked
    let balance = tx
        .balance(&account)?
        .checked_add(amount)
        .ok_or(Error::Overflow)?;

    tx.set_balance(account, balance);
    tx.globals_mut().total_supply = total_supply;
    tx.emit(ContractEvent::Transfer {
        from: None,
        to: Some(account),
        value: amount,
    });

    tracing::debug!(%account, amount, total_supply, "Minted");
    Ok(())
}

/// Destroy `amount` tokens held by `account`
pub fn burn_from<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    account: AccountId,
    amount: Balance,
) -> Result<()> {
    let balance = tx
        .balance(&account)?
        .checked_sub(amount)
        .ok_or(Error::InsufficientBalance)?;
    let total_supply = tx
        .globals()
        .total_supply
        .checked_sub(amount)
        .ok_or(Error::Underflow)?;

    tx.set_balance(account, balance);
    tx.globals_mut().total_supply = total_supply;
    tx.emit(ContractEvent::Transfer {
        from: Some(account),
        to: None,
        value: amount,
    });

    tracing::debug!(%account, amount, total_supply, "Burned");
    Ok(())
}

/// Set the allowance of `spender` over `owner` to exactly `value`
pub fn approve<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    owner: AccountId,
    spender: AccountId,
    value: Balance,
) -> Result<()> {
    if spender.is_zero() {
        return Err(Error::ZeroAddress);
    }

    tx.set_allowance(owner, spender, value);
    tx.emit(ContractEvent::Approval {
        owner,
        spender,
        value,
    });
    Ok(())
}

/// Consume `value` of the allowance of `spender` over `owner`
pub fn spend_allowance<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    owner: AccountId,
    spender: AccountId,
    value: Balance,
) -> Result<()> {
    let remaining = tx
        .allowance(&owner, &spender)?
        .checked_sub(value)
        .ok_or(Error::InsufficientAllowance)?;
    approve(tx, owner, spender, remaining)
}
