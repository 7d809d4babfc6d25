//! Timed token sale
//!
//! Converts native value attached to a `buy` call into newly minted tokens at
//! a fixed price, inside a `[start_at, end_at)` window and under a supply cap.
//! Sale minting does not depend on the general `mintable` flag.
//!
//! Payment is retained by the contract and accounted in
//! `Globals::sale_proceeds` until the owner withdraws it. Any remainder of
//! `value / price` is kept as well; there is no refund.

use crate::{
    access::{require_feature, require_owner},
    ledger,
    pause::ensure_not_paused,
    storage::StateStore,
    transaction::Transaction,
    types::{Balance, CallContext, ContractEvent, FeatureFlags, SaleConfig},
    Error, Result,
};

/// Store or overwrite the sale configuration
pub fn set_sale_options<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    ctx: &CallContext,
    config: SaleConfig,
) -> Result<()> {
    require_feature(tx, FeatureFlags::is_sale)?;
    require_owner(tx, &ctx.caller)?;

    if config.start_at >= config.end_at {
        tracing::warn!(
            start_at = config.start_at,
            end_at = config.end_at,
            "Sale window is empty; buy will never succeed"
        );
    }

    tx.globals_mut().sale = Some(config);
    tx.emit(ContractEvent::SaleOptionsSet {
        price: config.price,
        max_supply: config.max_supply,
        start_at: config.start_at,
        end_at: config.end_at,
    });

    tracing::info!(
        price = config.price,
        max_supply = config.max_supply,
        start_at = config.start_at,
        end_at = config.end_at,
        "Sale options set"
    );
    Ok(())
}

/// Tokens that `value` buys at `price`
pub fn quote(price: Balance, value: Balance) -> Result<Balance> {
    if price == 0 {
        return Err(Error::InvalidPrice);
    }
    Ok(value / price)
}

/// Mint tokens to the caller against the attached payment
///
/// Returns the amount minted.
pub fn buy<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    ctx: &CallContext,
) -> Result<Balance> {
    require_feature(tx, FeatureFlags::is_sale)?;
    ensure_not_paused(tx)?;

    let sale = tx.globals().sale.ok_or(Error::SaleNotActive)?;
    if !sale.is_open_at(ctx.block_timestamp) {
        return Err(Error::SaleNotActive);
    }

    let amount = quote(sale.price, ctx.transferred_value)?;
    if amount == 0 {
        return Err(Error::InsufficientPayment);
    }

    // A sum past u128::MAX is past any cap
    let headroom = sale.max_supply.saturating_sub(tx.globals().total_supply);
    if amount > headroom {
        return Err(Error::SaleCapExceeded);
    }

    let proceeds = tx
        .globals()
        .sale_proceeds
        .checked_add(ctx.transferred_value)
        .ok_or(Error::Overflow)?;

    ledger::mint_to(tx, ctx.caller, amount)?;
    tx.globals_mut().sale_proceeds = proceeds;
    tx.emit(ContractEvent::TokenBought {
        buyer: ctx.caller,
        amount,
        paid: ctx.transferred_value,
    });

    tracing::info!(
        buyer = %ctx.caller,
        amount,
        paid = ctx.transferred_value,
        "Tokens bought"
    );
    Ok(amount)
}

/// Release retained proceeds to the owner
///
/// Returns the amount the host should transfer out.
pub fn withdraw_proceeds<S: StateStore + ?Sized>(
    tx: &mut Transaction<'_, S>,
    ctx: &CallContext,
) -> Result<Balance> {
    require_feature(tx, FeatureFlags::is_sale)?;
    require_owner(tx, &ctx.caller)?;

    let amount = tx.globals().sale_proceeds;
    tx.globals_mut().sale_proceeds = 0;
    tx.emit(ContractEvent::ProceedsWithdrawn {
        to: ctx.caller,
        amount,
    });

    tracing::info!(to = %ctx.caller, amount, "Sale proceeds withdrawn");
    Ok(amount)
}
