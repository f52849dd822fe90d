//! FarePool Settlement
//!
//! Two-phase cost splitting for shared-ride rooms on top of the
//! [`wallet_core`] ledger, plus geographic room matching.
//!
//! # Phases
//!
//! - **Hold**: when a room fills, every member's share of the estimated
//!   fare (ceiling split) is debited as a deposit
//! - **Finalize**: once the actual fare is known, the difference is
//!   reconciled: extras are collected from members who showed up,
//!   overpayments are refunded to everyone
//!
//! Every per-member money movement carries a deterministic idempotency
//! key, so either phase can be re-run after a crash or partial failure
//! and only the missing steps execute.
//!
//! # Rounding
//!
//! Collections round up per head (the pool never under-collects),
//! refunds round down (the pool never over-refunds). Remainders stay in
//! the pool.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod notify;
pub mod pricing;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::{FinalizeReport, HoldReport, MemberStepFailure, SettlementEngine};
pub use error::{Error, Result};
pub use matcher::{haversine_km, match_rooms, MatchQuery};
pub use notify::{spawn_notification_sink, Notification, NotificationInbox, NotificationSender};
pub use pricing::{split_collect, split_refund};
pub use store::{MemoryRoomStore, MemorySettlementStore, RoomStore, SettlementStore};
pub use types::{
    GeoPoint, RecordStatus, Room, RoomPriority, RoomStatus, SettlementRecord, SettlementRole,
    SettlementStatus,
};
