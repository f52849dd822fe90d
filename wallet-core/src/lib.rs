//! FarePool Wallet Core
//!
//! Per-user balance ledger with an atomic, idempotent mutation primitive.
//!
//! # Architecture
//!
//! - **Single Writer**: one logical writer task eliminates balance races
//! - **Append-only entries**: the balance is always the sum of its
//!   successful entries
//! - **Idempotency keys**: a repeated key returns the original entry and
//!   performs no balance update
//! - **Auto-funding guard**: tops up a host account through the payment
//!   gateway before a debit that must not fail
//!
//! # Invariants
//!
//! - `balance == Σ(entry.amount)` over successful entries, at all times
//! - No debit drives a balance negative unless explicitly allowed
//! - Exactly one entry ever exists per distinct idempotency key

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod funding;
pub mod gateway;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use funding::{FundingContext, FundingGuard, FundingOutcome};
pub use gateway::{GatewayPayment, MockGateway, PaymentGateway};
pub use ledger::Ledger;
pub use money::Money;
pub use storage::Storage;
pub use types::{
    Account, Currency, EntryKind, EntryStatus, LedgerEntry, Mutation, RoomId, UserId,
};
