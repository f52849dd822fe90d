//! Main wallet orchestration layer
//!
//! This module ties together storage, actor, and metrics components
//! into a high-level API for balance mutations.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Config, EntryKind, Ledger, Money, Mutation, UserId};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     let entry = ledger
//!         .mutate(Mutation::new(
//!             UserId::new("user-1"),
//!             Money::from_minor(10_000),
//!             EntryKind::TopUp,
//!         ))
//!         .await?;
//!     println!("balance delta {}", entry.amount);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_wallet_actor, WalletHandle},
    metrics::Metrics,
    types::{Account, Currency, EntryStatus, LedgerEntry, Mutation, UserId},
    Config, Error, Money, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;

/// Main wallet ledger interface
pub struct Ledger {
    /// Actor handle for serialized mutations
    handle: WalletHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        // Open storage
        let storage = Arc::new(Storage::open(&config)?);

        let default_currency = Currency::parse(&config.default_currency).ok_or_else(|| {
            Error::Config(format!("Unknown currency: {}", config.default_currency))
        })?;

        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        // Spawn single-writer actor
        let handle = spawn_wallet_actor(
            storage.clone(),
            default_currency,
            config.mailbox_capacity,
            metrics.clone(),
        );

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    /// Provision an account on behalf of the identity collaborator
    ///
    /// Returns false (and leaves the balance alone) if the account
    /// already exists. The settlement core never calls this.
    pub async fn open_account(&self, user_id: UserId, initial_balance: Money) -> Result<bool> {
        let now = Utc::now();
        self.handle
            .open_account(Account {
                user_id,
                balance: initial_balance,
                currency: Currency::default(),
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// Apply an atomic, idempotent balance mutation
    ///
    /// The single retry-safety mechanism is the idempotency key: a
    /// repeated key returns the originally committed entry with no new
    /// balance delta. A debit that would drive the balance negative
    /// fails with [`Error::InsufficientBalance`] unless the mutation
    /// set `allow_negative`.
    pub async fn mutate(&self, mutation: Mutation) -> Result<LedgerEntry> {
        self.handle.mutate(mutation).await
    }

    /// Read current balance
    pub async fn get_balance(&self, user_id: &UserId) -> Result<Money> {
        self.handle.get_balance(user_id.clone()).await
    }

    /// Read entry history, oldest first
    pub async fn entries_for_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>> {
        self.handle.entries_for_user(user_id.clone()).await
    }

    /// Check the balance conservation invariant
    ///
    /// Verify that the stored balance equals the sum of all successful
    /// entry amounts. This is the critical invariant of the ledger.
    pub async fn check_balance_conservation(&self, user_id: &UserId) -> Result<bool> {
        let balance = self.get_balance(user_id).await?;
        let entries = self.entries_for_user(user_id).await?;

        let mut replayed = Money::ZERO;
        for entry in entries {
            if entry.status == EntryStatus::Success {
                replayed = replayed
                    .checked_add(entry.amount)
                    .ok_or_else(|| Error::AmountOverflow(user_id.to_string()))?;
            }
        }

        Ok(replayed == balance)
    }

    /// Get metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage statistics
    pub fn storage_stats(&self) -> Result<crate::storage::StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
