//! Per-call write overlay
//!
//! A [`Transaction`] reads through to the store and buffers every write.
//! Committing turns the buffer into one [`ChangeSet`]; dropping it discards
//! everything, which is how a failed call reverts.

use crate::{
    storage::{ChangeSet, StateStore},
    types::{AccountId, Balance, ContractEvent, ContractInfo, Globals},
    Error, Result,
};
use std::collections::BTreeMap;

/// Buffered view of contract state for a single call
pub struct Transaction<'a, S: StateStore + ?Sized> {
    store: &'a S,
    info: ContractInfo,
    info_dirty: bool,
    globals: Globals,
    globals_dirty: bool,
    balances: BTreeMap<AccountId, Balance>,
    allowances: BTreeMap<(AccountId, AccountId), Balance>,
    events: Vec<ContractEvent>,
}

impl<'a, S: StateStore + ?Sized> Transaction<'a, S> {
    /// Open a transaction over a deployed contract
    pub fn begin(store: &'a S) -> Result<Self> {
        let info = store.contract_info()?.ok_or(Error::NotDeployed)?;
        let globals = store.globals()?;
        Ok(Self::with_state(store, info, globals, false))
    }

    /// Open the deployment transaction; the record is written on commit
    pub fn genesis(store: &'a S, info: ContractInfo) -> Result<Self> {
        if store.contract_info()?.is_some() {
            return Err(Error::AlreadyDeployed);
        }
        let mut tx = Self::with_state(store, info, Globals::default(), true);
        tx.globals_dirty = true;
        Ok(tx)
    }

    fn with_state(store: &'a S, info: ContractInfo, globals: Globals, info_dirty: bool) -> Self {
        Self {
            store,
            info,
            info_dirty,
            globals,
            globals_dirty: false,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Deployment record
    pub fn info(&self) -> &ContractInfo {
        &self.info
    }

    /// Current globals (including buffered changes)
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Mutable globals; marks them for write
    pub fn globals_mut(&mut self) -> &mut Globals {
        self.globals_dirty = true;
        &mut self.globals
    }

    /// Balance including buffered changes
    pub fn balance(&self, account: &AccountId) -> Result<Balance> {
        match self.balances.get(account) {
            Some(balance) => Ok(*balance),
            None => self.store.balance(account),
        }
    }

    /// Buffer a balance write
    pub fn set_balance(&mut self, account: AccountId, balance: Balance) {
        self.balances.insert(account, balance);
    }

    /// Allowance including buffered changes
    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance> {
        match self.allowances.get(&(*owner, *spender)) {
            Some(amount) => Ok(*amount),
            None => self.store.allowance(owner, spender),
        }
    }

    /// Buffer an allowance write
    pub fn set_allowance(&mut self, owner: AccountId, spender: AccountId, amount: Balance) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Queue an event for the log
    pub fn emit(&mut self, event: ContractEvent) {
        self.events.push(event);
    }

    /// Events emitted so far
    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Finish the call, producing the writes to commit
    pub fn into_change_set(self) -> ChangeSet {
        ChangeSet {
            info: self.info_dirty.then_some(self.info),
            globals: self.globals_dirty.then_some(self.globals),
            balances: self.balances,
            allowances: self.allowances,
            events: self.events,
        }
    }
}
