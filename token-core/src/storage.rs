//! Storage layer
//!
//! The contract sees persistence through [`StateStore`]. Two backends:
//!
//! - [`MemoryStore`] - process-local maps, cheap to clone and share in tests
//! - [`RocksStore`] - RocksDB with one column family per record kind
//!
//! # Column Families
//!
//! - `meta` - Deployment record and contract-wide globals
//! - `balances` - Account balances (key: account id)
//! - `allowances` - Allowances (key: owner || spender)
//! - `events` - Append-only event log (key: big-endian sequence number)
//!
//! Writes only happen through [`StateStore::commit`], which applies a whole
//! [`ChangeSet`] or nothing.

use crate::{
    config::StorageConfig,
    error::{Error, Result},
    types::{AccountId, Balance, ContractEvent, ContractInfo, Globals},
};
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Column family names
const CF_META: &str = "meta";
const CF_BALANCES: &str = "balances";
const CF_ALLOWANCES: &str = "allowances";
const CF_EVENTS: &str = "events";

/// Keys inside `meta`
const KEY_INFO: &[u8] = b"info";
const KEY_GLOBALS: &[u8] = b"globals";

/// Writes produced by one successful call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Deployment record (only written at deploy)
    pub info: Option<ContractInfo>,
    /// Updated globals
    pub globals: Option<Globals>,
    /// Updated balances
    pub balances: BTreeMap<AccountId, Balance>,
    /// Updated allowances
    pub allowances: BTreeMap<(AccountId, AccountId), Balance>,
    /// Events in emission order
    pub events: Vec<ContractEvent>,
}

impl ChangeSet {
    /// True when committing would write nothing
    pub fn is_empty(&self) -> bool {
        self.info.is_none()
            && self.globals.is_none()
            && self.balances.is_empty()
            && self.allowances.is_empty()
            && self.events.is_empty()
    }
}

/// Key-value persistence used by the contract
pub trait StateStore {
    /// Deployment record, `None` before deploy
    fn contract_info(&self) -> Result<Option<ContractInfo>>;

    /// Contract-wide mutable values
    fn globals(&self) -> Result<Globals>;

    /// Balance of `account` (0 if never credited)
    fn balance(&self, account: &AccountId) -> Result<Balance>;

    /// Allowance of `spender` over `owner` (0 if never approved)
    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance>;

    /// Every stored balance
    fn balances(&self) -> Result<Vec<(AccountId, Balance)>>;

    /// Full event log in order
    fn events(&self) -> Result<Vec<ContractEvent>>;

    /// Apply all changes atomically
    fn commit(&mut self, changes: ChangeSet) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    info: Option<ContractInfo>,
    globals: Globals,
    balances: HashMap<AccountId, Balance>,
    allowances: HashMap<(AccountId, AccountId), Balance>,
    events: Vec<ContractEvent>,
}

/// In-memory store
///
/// Clones share the same state, so a test can keep one clone for inspection
/// while the actor owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn contract_info(&self) -> Result<Option<ContractInfo>> {
        Ok(self.inner.read().info.clone())
    }

    fn globals(&self) -> Result<Globals> {
        Ok(self.inner.read().globals.clone())
    }

    fn balance(&self, account: &AccountId) -> Result<Balance> {
        Ok(self.inner.read().balances.get(account).copied().unwrap_or(0))
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance> {
        Ok(self
            .inner
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0))
    }

    fn balances(&self) -> Result<Vec<(AccountId, Balance)>> {
        let state = self.inner.read();
        let mut all: Vec<_> = state.balances.iter().map(|(a, b)| (*a, *b)).collect();
        all.sort();
        Ok(all)
    }

    fn events(&self) -> Result<Vec<ContractEvent>> {
        Ok(self.inner.read().events.clone())
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        let mut state = self.inner.write();

        if let Some(info) = changes.info {
            state.info = Some(info);
        }
        if let Some(globals) = changes.globals {
            state.globals = globals;
        }
        state.balances.extend(changes.balances);
        state.allowances.extend(changes.allowances);
        state.events.extend(changes.events);

        Ok(())
    }
}

/// RocksDB-backed store
pub struct RocksStore {
    db: DB,
    next_event_seq: u64,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .field("next_event_seq", &self.next_event_seq)
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
            ColumnFamilyDescriptor::new(CF_BALANCES, Self::cf_options_lookup()),
            ColumnFamilyDescriptor::new(CF_ALLOWANCES, Self::cf_options_lookup()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let mut store = Self {
            db,
            next_event_seq: 0,
        };
        store.next_event_seq = store.last_event_seq()?.map_or(0, |seq| seq + 1);

        tracing::info!(
            path = ?path,
            next_event_seq = store.next_event_seq,
            "Opened RocksDB token store"
        );

        Ok(store)
    }

    // Column family options

    fn cf_options_lookup() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups by account benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn last_event_seq(&self) -> Result<Option<u64>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(Some(Self::decode_seq(&key)?))
            }
            None => Ok(None),
        }
    }

    fn decode_seq(key: &[u8]) -> Result<u64> {
        let bytes: [u8; 8] = key
            .try_into()
            .map_err(|_| Error::Storage(format!("Malformed event key of {} bytes", key.len())))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn decode_account(key: &[u8]) -> Result<AccountId> {
        let bytes: [u8; 32] = key
            .try_into()
            .map_err(|_| Error::Storage(format!("Malformed account key of {} bytes", key.len())))?;
        Ok(AccountId::new(bytes))
    }

    fn allowance_key(owner: &AccountId, spender: &AccountId) -> [u8; 64] {
        let mut key = [0u8; 64];
        key[..32].copy_from_slice(owner.as_bytes());
        key[32..].copy_from_slice(spender.as_bytes());
        key
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf_handle(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl StateStore for RocksStore {
    fn contract_info(&self) -> Result<Option<ContractInfo>> {
        self.get_value(CF_META, KEY_INFO)
    }

    fn globals(&self) -> Result<Globals> {
        Ok(self.get_value(CF_META, KEY_GLOBALS)?.unwrap_or_default())
    }

    fn balance(&self, account: &AccountId) -> Result<Balance> {
        Ok(self.get_value(CF_BALANCES, account.as_bytes())?.unwrap_or(0))
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance> {
        let key = Self::allowance_key(owner, spender);
        Ok(self.get_value(CF_ALLOWANCES, &key)?.unwrap_or(0))
    }

    fn balances(&self) -> Result<Vec<(AccountId, Balance)>> {
        let cf = self.cf_handle(CF_BALANCES)?;
        let mut all = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            all.push((Self::decode_account(&key)?, bincode::deserialize(&value)?));
        }
        Ok(all)
    }

    fn events(&self) -> Result<Vec<ContractEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let mut events = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            events.push(bincode::deserialize(&value)?);
        }
        Ok(events)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let cf_meta = self.cf_handle(CF_META)?;
        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let cf_allowances = self.cf_handle(CF_ALLOWANCES)?;
        let cf_events = self.cf_handle(CF_EVENTS)?;

        let mut batch = WriteBatch::default();

        if let Some(info) = &changes.info {
            batch.put_cf(cf_meta, KEY_INFO, bincode::serialize(info)?);
        }
        if let Some(globals) = &changes.globals {
            batch.put_cf(cf_meta, KEY_GLOBALS, bincode::serialize(globals)?);
        }
        for (account, balance) in &changes.balances {
            batch.put_cf(cf_balances, account.as_bytes(), bincode::serialize(balance)?);
        }
        for ((owner, spender), amount) in &changes.allowances {
            batch.put_cf(
                cf_allowances,
                Self::allowance_key(owner, spender),
                bincode::serialize(amount)?,
            );
        }
        let mut seq = self.next_event_seq;
        for event in &changes.events {
            batch.put_cf(cf_events, seq.to_be_bytes(), bincode::serialize(event)?);
            seq += 1;
        }

        self.db.write(batch)?;
        self.next_event_seq = seq;

        tracing::debug!(
            balances = changes.balances.len(),
            allowances = changes.allowances.len(),
            events = changes.events.len(),
            "Change set committed"
        );

        Ok(())
    }
}
