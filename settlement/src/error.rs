//! Error types for room settlement

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Wallet ledger error
    #[error("Wallet error: {0}")]
    Wallet(#[from] wallet_core::Error),

    /// Room does not exist
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Hold/finalize require a fare estimate
    #[error("Estimated fare missing for room: {0}")]
    EstimatedFareMissing(String),

    /// Finalize replayed against an already settled room
    #[error("Room already settled: {0}")]
    AlreadySettled(String),

    /// Some member steps in a phase failed
    #[error("Settlement phase incomplete for room {room}: {failed} of {total} member steps failed")]
    PhaseIncomplete {
        /// Room ID
        room: String,
        /// Failed member steps
        failed: usize,
        /// Total member steps
        total: usize,
    },

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors a phase re-run can resolve
    ///
    /// Room-level precondition failures are final for the request;
    /// everything else (transient wallet/store trouble, a guest short
    /// on funds) clears up on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Wallet(e) => e.is_retryable(),
            Error::RoomNotFound(_)
            | Error::EstimatedFareMissing(_)
            | Error::AlreadySettled(_)
            | Error::Config(_) => false,
            _ => true,
        }
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
