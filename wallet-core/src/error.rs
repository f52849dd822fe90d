//! Error types for the wallet ledger

use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Account does not exist (upstream data-integrity violation)
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Debit would drive the balance negative
    #[error("Insufficient balance for {user}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Account owner
        user: String,
        /// Current balance (minor units)
        balance: i64,
        /// Requested debit (minor units, positive)
        requested: i64,
    },

    /// Idempotency key already used by a different mutation
    #[error("Duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Amount arithmetic overflow
    #[error("Amount overflow for {0}")]
    AmountOverflow(String),

    /// Payment gateway failure
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that a phase retry can resolve.
    ///
    /// `AccountNotFound` is excluded: it signals an upstream integrity
    /// violation and must surface as a fatal request failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::AccountNotFound(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
