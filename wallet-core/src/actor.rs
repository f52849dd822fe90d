//! Actor-based concurrency for the wallet
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task eliminates balance races
//! - The idempotency check and the balance commit happen inside one
//!   writer turn, so a replay token can never be applied twice
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Request handlers / settlement engine         │
//! │          Many concurrent mutation callers             │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ WalletHandle (Clone)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              mpsc::channel (bounded)                  │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             WalletActor (Single Task)                 │
//! │  replay lookup → balance load → invariant check →     │
//! │  Storage::apply_mutation (atomic WriteBatch)          │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent debits against one account are processed strictly in
//! sequence, which is the serializable-per-account isolation the ledger
//! contract requires.

use crate::metrics::Metrics;
use crate::types::{Account, Currency, EntryStatus, LedgerEntry, Mutation, UserId};
use crate::{Error, Money, Result, Storage};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the wallet actor
pub enum WalletMessage {
    /// Provision an account (identity-collaborator ingestion point)
    OpenAccount {
        /// Account row to create
        account: Account,
        /// True if newly created, false if it already existed
        response: oneshot::Sender<Result<bool>>,
    },

    /// Apply a balance mutation
    Mutate {
        /// The mutation request
        mutation: Mutation,
        /// The committed (or replayed) entry
        response: oneshot::Sender<Result<LedgerEntry>>,
    },

    /// Read current balance
    GetBalance {
        /// Account owner
        user_id: UserId,
        /// Current balance
        response: oneshot::Sender<Result<Money>>,
    },

    /// Read entry history for a user
    EntriesForUser {
        /// Account owner
        user_id: UserId,
        /// Entries, oldest first
        response: oneshot::Sender<Result<Vec<LedgerEntry>>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes wallet messages
pub struct WalletActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<WalletMessage>,

    /// Default currency for entries without an override
    default_currency: Currency,

    /// Metrics collector
    metrics: Metrics,
}

impl WalletActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<WalletMessage>,
        default_currency: Currency,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            default_currency,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                WalletMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }

        tracing::info!("Wallet actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: WalletMessage) {
        match msg {
            WalletMessage::OpenAccount { account, response } => {
                let result = self.storage.create_account(&account);
                let _ = response.send(result);
            }

            WalletMessage::Mutate { mutation, response } => {
                let start = std::time::Instant::now();
                let result = self.apply_mutation(mutation);
                self.metrics
                    .record_mutation_duration(start.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            WalletMessage::GetBalance { user_id, response } => {
                let result = self.storage.get_account(&user_id).map(|a| a.balance);
                let _ = response.send(result);
            }

            WalletMessage::EntriesForUser { user_id, response } => {
                let result = self.storage.entries_for_user(&user_id);
                let _ = response.send(result);
            }

            WalletMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// The ledger mutation primitive
    ///
    /// Runs entirely inside one writer turn:
    /// 1. Replay lookup: an existing entry under the same idempotency
    ///    key is returned unchanged, no balance change.
    /// 2. Balance load; `AccountNotFound` if the user is unknown.
    /// 3. Invariant check: `next < 0` without `allow_negative` fails
    ///    with `InsufficientBalance` and writes nothing.
    /// 4. Atomic commit of entry + balance.
    fn apply_mutation(&self, mutation: Mutation) -> Result<LedgerEntry> {
        // Step 1: idempotent replay
        if let Some(ref key) = mutation.idempotency_key {
            if let Some(existing) = self.storage.find_by_idempotency_key(key)? {
                tracing::debug!(
                    idempotency_key = %key,
                    entry_id = %existing.entry_id,
                    "Idempotent replay, returning original entry"
                );
                self.metrics.record_idempotent_replay();
                return Ok(existing);
            }
        }

        // Step 2: load balance
        let mut account = self.storage.get_account(&mutation.user_id)?;

        // Step 3: invariant check
        let next = account
            .balance
            .checked_add(mutation.amount)
            .ok_or_else(|| Error::AmountOverflow(mutation.user_id.to_string()))?;

        if next.is_negative() && !mutation.allow_negative {
            self.metrics.record_insufficient_balance();
            return Err(Error::InsufficientBalance {
                user: mutation.user_id.to_string(),
                balance: account.balance.minor(),
                requested: mutation.amount.abs().minor(),
            });
        }

        // Step 4: atomic commit
        let now = Utc::now();
        let entry = LedgerEntry {
            entry_id: Uuid::now_v7(),
            user_id: mutation.user_id.clone(),
            room_id: mutation.room_id,
            kind: mutation.kind,
            amount: mutation.amount,
            status: EntryStatus::Success,
            currency: mutation.currency.unwrap_or(self.default_currency),
            idempotency_key: mutation.idempotency_key,
            metadata: mutation.metadata,
            created_at: now,
        };

        account.balance = next;
        account.updated_at = now;

        self.storage.apply_mutation(&entry, &account)?;
        self.metrics.record_mutation(entry.kind);

        tracing::info!(
            user_id = %entry.user_id,
            kind = %entry.kind,
            amount = %entry.amount,
            balance = %account.balance,
            "Balance mutated"
        );

        Ok(entry)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct WalletHandle {
    sender: mpsc::Sender<WalletMessage>,
}

impl WalletHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WalletMessage>) -> Self {
        Self { sender }
    }

    /// Provision an account
    pub async fn open_account(&self, account: Account) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::OpenAccount {
                account,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Apply a mutation
    pub async fn mutate(&self, mutation: Mutation) -> Result<LedgerEntry> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Mutate {
                mutation,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Read current balance
    pub async fn get_balance(&self, user_id: UserId) -> Result<Money> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::GetBalance {
                user_id,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Read entry history
    pub async fn entries_for_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::EntriesForUser {
                user_id,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WalletMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the wallet actor
pub fn spawn_wallet_actor(
    storage: Arc<Storage>,
    default_currency: Currency,
    mailbox_capacity: usize,
    metrics: Metrics,
) -> WalletHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = WalletActor::new(storage, rx, default_currency, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    WalletHandle::new(tx)
}
