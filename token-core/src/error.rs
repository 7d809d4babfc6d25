//! Error types for the token contract

use thiserror::Error;

/// Result type for token operations
pub type Result<T> = std::result::Result<T, Error>;

/// Token errors
///
/// The first group are contract rejections: the call was well formed but a
/// guarded precondition failed. The second group are host failures (storage,
/// encoding, the actor plumbing).
#[derive(Error, Debug)]
pub enum Error {
    /// Account balance is smaller than the requested amount
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Spender allowance is smaller than the requested amount
    #[error("Insufficient allowance")]
    InsufficientAllowance,

    /// Arithmetic overflow on a balance, allowance or supply
    #[error("Arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow on a balance, allowance or supply
    #[error("Arithmetic underflow")]
    Underflow,

    /// Caller is not the contract owner
    #[error("Caller is not the owner")]
    Unauthorized,

    /// The feature backing this call was disabled at construction
    #[error("Feature not enabled")]
    NotSupported,

    /// Contract is paused
    #[error("Contract is paused")]
    Paused,

    /// Contract is not paused
    #[error("Contract is not paused")]
    NotPaused,

    /// Sale is unconfigured or outside its window
    #[error("Sale is not active")]
    SaleNotActive,

    /// Purchase would push total supply past the sale cap
    #[error("Sale cap exceeded")]
    SaleCapExceeded,

    /// Sale price is zero, so no amount can be derived from the payment
    #[error("Invalid sale price")]
    InvalidPrice,

    /// Payment does not cover a single token unit
    #[error("Insufficient payment")]
    InsufficientPayment,

    /// Zero account used as recipient or spender
    #[error("Zero address")]
    ZeroAddress,

    /// Store holds no deployment
    #[error("Contract not deployed")]
    NotDeployed,

    /// Store already holds a deployment
    #[error("Contract already deployed")]
    AlreadyDeployed,

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for contract rejections, false for host failures
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Error::Storage(_)
                | Error::Serialization(_)
                | Error::Config(_)
                | Error::Concurrency(_)
                | Error::Io(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
