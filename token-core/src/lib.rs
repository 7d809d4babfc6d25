//! PSP22 Token Core
//!
//! Fungible-token ledger with optional mint, burn, pause and timed-sale
//! capabilities.
//!
//! # Architecture
//!
//! - **Ledger**: balances, allowances and total supply with checked arithmetic
//! - **Feature flags**: capabilities fixed at deployment
//! - **Pause gate / access control**: owner-only switches and privileges
//! - **Sale**: time-windowed, capped issuance against attached payment
//! - **Transactions**: every call commits all of its writes or none
//! - **Single Writer**: one actor task serializes concurrent callers

#![forbid(unsafe_code)]
//!
//! # Invariants
//!
//! - Supply conservation: Σ(balances) == total_supply after every call
//! - No wrapping: overflow and underflow surface as errors
//! - Atomicity: a failed call leaves state and event log untouched
//! - Immutability: metadata, feature flags and owner never change after deploy

#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod transaction;
pub mod ledger;
pub mod access;
pub mod pause;
pub mod sale;
pub mod contract;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    AccountId, Balance, CallContext, ContractEvent, FeatureFlags, SaleConfig, Timestamp,
    TokenMetadata,
};
pub use storage::{MemoryStore, RocksStore, StateStore};
pub use contract::{Call, CallOutput, Token, TokenInit};
pub use actor::{spawn_token_actor, TokenHandle};
pub use config::Config;
pub use metrics::Metrics;
