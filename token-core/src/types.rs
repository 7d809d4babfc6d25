//! Core types for the token contract
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (u128 balances, checked operations only)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Token amount in the smallest unit
pub type Balance = u128;

/// Host timestamp (milliseconds since Unix epoch)
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds, as a host would report it
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis().max(0) as Timestamp
}

/// Account identifier (32-byte public key hash)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// The zero account, never a valid recipient
    pub const ZERO: AccountId = AccountId([0u8; 32]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic account from a development URI such as `//Alice`
    pub fn from_uri(uri: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(uri.as_bytes()).into();
        Self(digest)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the zero account
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| crate::Error::Config(format!("Invalid account id: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| crate::Error::Config("Account id must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

/// Optional capabilities, fixed at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pausable: bool,
    mintable: bool,
    burnable: bool,
    sale: bool,
}

impl FeatureFlags {
    /// Capability set without the sale feature
    pub fn new(pausable: bool, mintable: bool, burnable: bool) -> Self {
        Self {
            pausable,
            mintable,
            burnable,
            sale: false,
        }
    }

    /// Every capability enabled
    pub fn all() -> Self {
        Self::new(true, true, true).with_sale(true)
    }

    /// Enable or disable the timed sale
    pub fn with_sale(mut self, sale: bool) -> Self {
        self.sale = sale;
        self
    }

    /// Owner can pause and unpause
    pub fn is_pausable(&self) -> bool {
        self.pausable
    }

    /// Owner can mint
    pub fn is_mintable(&self) -> bool {
        self.mintable
    }

    /// Holders can burn their own tokens
    pub fn is_burnable(&self) -> bool {
        self.burnable
    }

    /// Timed sale can be configured and bought from
    pub fn is_sale(&self) -> bool {
        self.sale
    }
}

/// PSP22 metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token name (raw bytes, usually UTF-8)
    pub name: Option<Vec<u8>>,
    /// Token symbol
    pub symbol: Option<Vec<u8>>,
    /// Number of decimals
    pub decimals: u8,
}

/// Immutable deployment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Name, symbol, decimals
    pub metadata: TokenMetadata,
    /// Enabled capabilities
    pub features: FeatureFlags,
    /// Privileged principal (the deployer)
    pub owner: AccountId,
}

/// Timed sale parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Native-currency units per smallest token unit
    pub price: Balance,
    /// Total supply ceiling for sale minting
    pub max_supply: Balance,
    /// Window start (inclusive)
    pub start_at: Timestamp,
    /// Window end (exclusive)
    pub end_at: Timestamp,
}

impl SaleConfig {
    /// True when `now` lies in `[start_at, end_at)`
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        self.start_at <= now && now < self.end_at
    }
}

/// Mutable contract-wide values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Globals {
    /// Sum of all balances
    pub total_supply: Balance,
    /// Pause flag
    pub paused: bool,
    /// Sale configuration, if set
    pub sale: Option<SaleConfig>,
    /// Native currency received by `buy` and not yet withdrawn
    pub sale_proceeds: Balance,
}

/// Per-call host context
///
/// Captured once when the call starts, so every check inside a call sees the
/// same caller, clock and payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated caller
    pub caller: AccountId,
    /// Block timestamp
    pub block_timestamp: Timestamp,
    /// Native value attached to the call
    pub transferred_value: Balance,
}

impl CallContext {
    /// Context with no attached value
    pub fn new(caller: AccountId, block_timestamp: Timestamp) -> Self {
        Self {
            caller,
            block_timestamp,
            transferred_value: 0,
        }
    }

    /// Context stamped with the current wall clock
    pub fn now(caller: AccountId) -> Self {
        Self::new(caller, now_millis())
    }

    /// Attach a payment
    pub fn with_value(mut self, value: Balance) -> Self {
        self.transferred_value = value;
        self
    }
}

/// Event appended to the contract log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// Balance movement; `from == None` is a mint, `to == None` a burn
    Transfer {
        /// Debited account
        from: Option<AccountId>,
        /// Credited account
        to: Option<AccountId>,
        /// Amount moved
        value: Balance,
    },
    /// Allowance set
    Approval {
        /// Token holder
        owner: AccountId,
        /// Authorized spender
        spender: AccountId,
        /// New allowance
        value: Balance,
    },
    /// Contract paused
    Paused {
        /// Owner who paused
        by: AccountId,
    },
    /// Contract unpaused
    Unpaused {
        /// Owner who unpaused
        by: AccountId,
    },
    /// Sale configured
    SaleOptionsSet {
        /// Price per smallest unit
        price: Balance,
        /// Sale cap
        max_supply: Balance,
        /// Window start
        start_at: Timestamp,
        /// Window end
        end_at: Timestamp,
    },
    /// Tokens bought through the sale
    TokenBought {
        /// Receiver of the minted tokens
        buyer: AccountId,
        /// Tokens minted
        amount: Balance,
        /// Native value paid
        paid: Balance,
    },
    /// Sale proceeds released to the owner
    ProceedsWithdrawn {
        /// Recipient
        to: AccountId,
        /// Amount released
        amount: Balance,
    },
}
