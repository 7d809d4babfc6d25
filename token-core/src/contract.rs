//! Token contract message surface
//!
//! [`Token`] ties the ledger, pause gate, access control and sale together
//! into the PSP22 call surface. Every mutating message runs inside a
//! [`Transaction`]: it either commits all of its writes and events in one
//! store write, or fails and leaves the store untouched.
//!
//! # Example
//!
//! ```
//! use token_core::{AccountId, CallContext, FeatureFlags, MemoryStore, Token, TokenInit};
//!
//! # fn main() -> token_core::Result<()> {
//! let alice = AccountId::from_uri("//Alice");
//! let bob = AccountId::from_uri("//Bob");
//!
//! let init = TokenInit::new(1_000, FeatureFlags::new(true, true, true))
//!     .with_name("PepeToken")
//!     .with_symbol("PEPE");
//! let mut token = Token::deploy(MemoryStore::new(), &CallContext::new(alice, 0), init)?;
//!
//! token.transfer(&CallContext::new(alice, 1), bob, 250, Vec::new())?;
//! assert_eq!(token.balance_of(&bob)?, 250);
//! # Ok(())
//! # }
//! ```

use crate::{
    access::{require_feature, require_owner},
    ledger,
    metrics::Metrics,
    pause::{self, ensure_not_paused},
    sale,
    storage::StateStore,
    transaction::Transaction,
    types::{
        AccountId, Balance, CallContext, ContractEvent, ContractInfo, FeatureFlags, SaleConfig,
        Timestamp, TokenMetadata,
    },
    Error, Result,
};
use std::time::Instant;

/// Construction parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInit {
    /// Supply minted to the deployer
    pub initial_supply: Balance,
    /// Name, symbol, decimals
    pub metadata: TokenMetadata,
    /// Enabled capabilities
    pub features: FeatureFlags,
}

impl TokenInit {
    /// Parameters with empty metadata and zero decimals
    pub fn new(initial_supply: Balance, features: FeatureFlags) -> Self {
        Self {
            initial_supply,
            metadata: TokenMetadata::default(),
            features,
        }
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<Vec<u8>>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    /// Set the symbol
    pub fn with_symbol(mut self, symbol: impl Into<Vec<u8>>) -> Self {
        self.metadata.symbol = Some(symbol.into());
        self
    }

    /// Set the decimals
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.metadata.decimals = decimals;
        self
    }
}

/// Mutating message, for hosts that route operations as values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// PSP22 transfer
    Transfer {
        /// Recipient
        to: AccountId,
        /// Amount
        value: Balance,
        /// Opaque payload
        data: Vec<u8>,
    },
    /// PSP22 transfer_from (caller is the spender)
    TransferFrom {
        /// Token holder
        from: AccountId,
        /// Recipient
        to: AccountId,
        /// Amount
        value: Balance,
        /// Opaque payload
        data: Vec<u8>,
    },
    /// PSP22 approve
    Approve {
        /// Spender
        spender: AccountId,
        /// New allowance
        value: Balance,
    },
    /// PSP22 increase_allowance
    IncreaseAllowance {
        /// Spender
        spender: AccountId,
        /// Increment
        delta: Balance,
    },
    /// PSP22 decrease_allowance
    DecreaseAllowance {
        /// Spender
        spender: AccountId,
        /// Decrement
        delta: Balance,
    },
    /// Owner mint
    MintTo {
        /// Recipient
        account: AccountId,
        /// Amount
        amount: Balance,
    },
    /// Self burn
    Burn {
        /// Amount
        amount: Balance,
    },
    /// Close the pause gate
    Pause,
    /// Open the pause gate
    Unpause,
    /// Flip the pause gate
    ChangeState,
    /// Configure the sale
    SetSaleOptions(SaleConfig),
    /// Buy with the attached value
    Buy,
    /// Release sale proceeds to the owner
    WithdrawProceeds,
}

/// Result of a mutating message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutput {
    /// No return value
    Unit,
    /// An amount (tokens bought, proceeds withdrawn)
    Amount(Balance),
}

/// A deployed token over a store
pub struct Token<S: StateStore> {
    store: S,
    info: ContractInfo,
    metrics: Option<Metrics>,
}

impl<S: StateStore> std::fmt::Debug for Token<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("info", &self.info)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl<S: StateStore> Token<S> {
    /// Deploy into an empty store, minting the initial supply to the caller
    pub fn deploy(mut store: S, ctx: &CallContext, init: TokenInit) -> Result<Self> {
        let info = ContractInfo {
            metadata: init.metadata,
            features: init.features,
            owner: ctx.caller,
        };

        let mut tx = Transaction::genesis(&store, info.clone())?;
        ledger::mint_to(&mut tx, ctx.caller, init.initial_supply)?;
        let changes = tx.into_change_set();
        store.commit(changes)?;

        tracing::info!(
            owner = %ctx.caller,
            initial_supply = init.initial_supply,
            features = ?info.features,
            "Token deployed"
        );

        Ok(Self {
            store,
            info,
            metrics: None,
        })
    }

    /// Open an existing deployment
    pub fn load(store: S) -> Result<Self> {
        let info = store.contract_info()?.ok_or(Error::NotDeployed)?;
        Ok(Self {
            store,
            info,
            metrics: None,
        })
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        match self.store.globals() {
            Ok(globals) => metrics.update_total_supply(globals.total_supply),
            Err(e) => tracing::warn!(error = %e, "Supply gauge left unset"),
        }
        self.metrics = Some(metrics);
        self
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one message with all-or-nothing semantics
    fn call<R>(
        &mut self,
        message: &'static str,
        ctx: &CallContext,
        f: impl FnOnce(&mut Transaction<'_, S>) -> Result<R>,
    ) -> Result<R> {
        let started = Instant::now();

        let result = Transaction::begin(&self.store).and_then(|mut tx| {
            let output = f(&mut tx)?;
            Ok((output, tx.into_change_set()))
        });

        let result = match result {
            Ok((output, changes)) => {
                let events = changes.events.clone();
                let total_supply = changes.globals.as_ref().map(|g| g.total_supply);
                self.store.commit(changes).map(|()| {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_commit(&events);
                        if let Some(total_supply) = total_supply {
                            metrics.update_total_supply(total_supply);
                        }
                    }
                    output
                })
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection();
            }
            if e.is_domain() {
                tracing::warn!(message, caller = %ctx.caller, error = %e, "Call rejected");
            } else {
                tracing::error!(message, caller = %ctx.caller, error = %e, "Call failed");
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_call_duration(started.elapsed().as_secs_f64());
        }

        result
    }

    /// Route a mutating message
    pub fn execute(&mut self, ctx: &CallContext, call: Call) -> Result<CallOutput> {
        match call {
            Call::Transfer { to, value, data } => {
                self.transfer(ctx, to, value, data).map(|()| CallOutput::Unit)
            }
            Call::TransferFrom {
                from,
                to,
                value,
                data,
            } => self
                .transfer_from(ctx, from, to, value, data)
                .map(|()| CallOutput::Unit),
            Call::Approve { spender, value } => {
                self.approve(ctx, spender, value).map(|()| CallOutput::Unit)
            }
            Call::IncreaseAllowance { spender, delta } => self
                .increase_allowance(ctx, spender, delta)
                .map(|()| CallOutput::Unit),
            Call::DecreaseAllowance { spender, delta } => self
                .decrease_allowance(ctx, spender, delta)
                .map(|()| CallOutput::Unit),
            Call::MintTo { account, amount } => {
                self.mint_to(ctx, account, amount).map(|()| CallOutput::Unit)
            }
            Call::Burn { amount } => self.burn(ctx, amount).map(|()| CallOutput::Unit),
            Call::Pause => self.pause(ctx).map(|()| CallOutput::Unit),
            Call::Unpause => self.unpause(ctx).map(|()| CallOutput::Unit),
            Call::ChangeState => self.change_state(ctx).map(|()| CallOutput::Unit),
            Call::SetSaleOptions(config) => self
                .set_sale_options(
                    ctx,
                    config.price,
                    config.max_supply,
                    config.start_at,
                    config.end_at,
                )
                .map(|()| CallOutput::Unit),
            Call::Buy => self.buy(ctx).map(CallOutput::Amount),
            Call::WithdrawProceeds => self.withdraw_proceeds(ctx).map(CallOutput::Amount),
        }
    }

    // PSP22

    /// Move `value` from the caller to `to`
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        to: AccountId,
        value: Balance,
        _data: Vec<u8>,
    ) -> Result<()> {
        let caller = ctx.caller;
        self.call("transfer", ctx, |tx| {
            ensure_not_paused(tx)?;
            ledger::transfer_from_to(tx, caller, to, value)
        })
    }

    /// Move `value` from `from` to `to`, spending the caller's allowance
    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: AccountId,
        to: AccountId,
        value: Balance,
        _data: Vec<u8>,
    ) -> Result<()> {
        let spender = ctx.caller;
        self.call("transfer_from", ctx, |tx| {
            ensure_not_paused(tx)?;
            ledger::spend_allowance(tx, from, spender, value)?;
            ledger::transfer_from_to(tx, from, to, value)
        })
    }

    /// Set the caller's allowance for `spender` to exactly `value`
    pub fn approve(&mut self, ctx: &CallContext, spender: AccountId, value: Balance) -> Result<()> {
        let owner = ctx.caller;
        self.call("approve", ctx, |tx| {
            ledger::approve(tx, owner, spender, value)
        })
    }

    /// Raise the caller's allowance for `spender`
    pub fn increase_allowance(
        &mut self,
        ctx: &CallContext,
        spender: AccountId,
        delta: Balance,
    ) -> Result<()> {
        let owner = ctx.caller;
        self.call("increase_allowance", ctx, |tx| {
            let value = tx
                .allowance(&owner, &spender)?
                .checked_add(delta)
                .ok_or(Error::Overflow)?;
            ledger::approve(tx, owner, spender, value)
        })
    }

    /// Lower the caller's allowance for `spender`
    pub fn decrease_allowance(
        &mut self,
        ctx: &CallContext,
        spender: AccountId,
        delta: Balance,
    ) -> Result<()> {
        let owner = ctx.caller;
        self.call("decrease_allowance", ctx, |tx| {
            let value = tx
                .allowance(&owner, &spender)?
                .checked_sub(delta)
                .ok_or(Error::InsufficientAllowance)?;
            ledger::approve(tx, owner, spender, value)
        })
    }

    /// Total supply
    pub fn total_supply(&self) -> Result<Balance> {
        Ok(self.store.globals()?.total_supply)
    }

    /// Balance of `account`, 0 if unknown
    pub fn balance_of(&self, account: &AccountId) -> Result<Balance> {
        self.store.balance(account)
    }

    /// Allowance of `spender` over `owner`
    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance> {
        self.store.allowance(owner, spender)
    }

    // Metadata

    /// Token name
    pub fn token_name(&self) -> Option<Vec<u8>> {
        self.info.metadata.name.clone()
    }

    /// Token symbol
    pub fn token_symbol(&self) -> Option<Vec<u8>> {
        self.info.metadata.symbol.clone()
    }

    /// Token decimals
    pub fn token_decimals(&self) -> u8 {
        self.info.metadata.decimals
    }

    // Mint / burn

    /// Owner mint
    pub fn mint_to(&mut self, ctx: &CallContext, account: AccountId, amount: Balance) -> Result<()> {
        let caller = ctx.caller;
        self.call("mint_to", ctx, |tx| {
            require_feature(tx, FeatureFlags::is_mintable)?;
            require_owner(tx, &caller)?;
            ensure_not_paused(tx)?;
            ledger::mint_to(tx, account, amount)
        })
    }

    /// Burn from the caller's own balance
    pub fn burn(&mut self, ctx: &CallContext, amount: Balance) -> Result<()> {
        let caller = ctx.caller;
        self.call("burn", ctx, |tx| {
            require_feature(tx, FeatureFlags::is_burnable)?;
            ensure_not_paused(tx)?;
            ledger::burn_from(tx, caller, amount)
        })
    }

    // Pause

    /// Close the pause gate
    pub fn pause(&mut self, ctx: &CallContext) -> Result<()> {
        let caller = ctx.caller;
        self.call("pause", ctx, |tx| pause::pause(tx, caller))
    }

    /// Open the pause gate
    pub fn unpause(&mut self, ctx: &CallContext) -> Result<()> {
        let caller = ctx.caller;
        self.call("unpause", ctx, |tx| pause::unpause(tx, caller))
    }

    /// Flip the pause gate
    pub fn change_state(&mut self, ctx: &CallContext) -> Result<()> {
        let caller = ctx.caller;
        self.call("change_state", ctx, |tx| pause::switch(tx, caller))
    }

    /// Pause gate state
    pub fn is_paused(&self) -> Result<bool> {
        Ok(self.store.globals()?.paused)
    }

    // Sale

    /// Store or overwrite the sale configuration
    pub fn set_sale_options(
        &mut self,
        ctx: &CallContext,
        price: Balance,
        max_supply: Balance,
        start_at: Timestamp,
        end_at: Timestamp,
    ) -> Result<()> {
        let config = SaleConfig {
            price,
            max_supply,
            start_at,
            end_at,
        };
        self.call("set_sale_options", ctx, |tx| {
            sale::set_sale_options(tx, ctx, config)
        })
    }

    /// Buy tokens with the attached value; returns the amount minted
    pub fn buy(&mut self, ctx: &CallContext) -> Result<Balance> {
        self.call("buy", ctx, |tx| sale::buy(tx, ctx))
    }

    /// Release retained proceeds to the owner; returns the amount
    pub fn withdraw_proceeds(&mut self, ctx: &CallContext) -> Result<Balance> {
        self.call("withdraw_proceeds", ctx, |tx| sale::withdraw_proceeds(tx, ctx))
    }

    /// Sale price, if configured
    pub fn get_sale_rate(&self) -> Result<Option<Balance>> {
        Ok(self.store.globals()?.sale.map(|s| s.price))
    }

    /// Sale cap, if configured
    pub fn get_max_supply(&self) -> Result<Option<Balance>> {
        Ok(self.store.globals()?.sale.map(|s| s.max_supply))
    }

    /// Sale window start, if configured
    pub fn get_start_at(&self) -> Result<Option<Timestamp>> {
        Ok(self.store.globals()?.sale.map(|s| s.start_at))
    }

    /// Sale window end, if configured
    pub fn get_end_at(&self) -> Result<Option<Timestamp>> {
        Ok(self.store.globals()?.sale.map(|s| s.end_at))
    }

    /// Whether `buy` would pass the window check at `now`
    pub fn is_sale_active(&self, now: Timestamp) -> Result<bool> {
        Ok(self.info.features.is_sale()
            && self
                .store
                .globals()?
                .sale
                .map_or(false, |s| s.is_open_at(now)))
    }

    /// Native value retained from sales
    pub fn sale_proceeds(&self) -> Result<Balance> {
        Ok(self.store.globals()?.sale_proceeds)
    }

    // Features and ownership

    /// Pausable flag
    pub fn get_is_pausable(&self) -> bool {
        self.info.features.is_pausable()
    }

    /// Mintable flag
    pub fn get_is_mintable(&self) -> bool {
        self.info.features.is_mintable()
    }

    /// Burnable flag
    pub fn get_is_burnable(&self) -> bool {
        self.info.features.is_burnable()
    }

    /// Sale flag
    pub fn get_is_sale(&self) -> bool {
        self.info.features.is_sale()
    }

    /// Contract owner
    pub fn owner(&self) -> AccountId {
        self.info.owner
    }

    // Audit

    /// Full event log
    pub fn events(&self) -> Result<Vec<ContractEvent>> {
        self.store.events()
    }

    /// Check supply conservation invariant
    ///
    /// Recomputes the sum of every stored balance and compares it with the
    /// recorded total supply.
    pub fn check_supply_conservation(&self) -> Result<bool> {
        let mut sum: Balance = 0;
        for (_, balance) in self.store.balances()? {
            sum = match sum.checked_add(balance) {
                Some(sum) => sum,
                None => return Ok(false),
            };
        }
        Ok(sum == self.total_supply()?)
    }
}
