//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer minor units for money)

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// User identifier (owned by the external identity service)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier (rooms are owned by the room service, referenced here)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create new room ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Korean Won
    KRW,
    /// US Dollar
    USD,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::KRW => "KRW",
            Currency::USD => "USD",
            Currency::JPY => "JPY",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "KRW" => Some(Currency::KRW),
            "USD" => Some(Currency::USD),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::KRW
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Ledger entry kind (stable enum, persisted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntryKind {
    /// Direct wallet top-up
    TopUp = 1,
    /// Host's share of a room hold
    HostCharge = 2,
    /// Guest's share of a room hold
    HoldDeposit = 3,
    /// Extra collection when actual fare exceeds the estimate
    ExtraCollect = 4,
    /// Refund when actual fare undercuts the estimate
    Refund = 5,
    /// Refund directed at the host
    HostRefund = 6,
    /// Synthesized top-up issued by the funding guard
    AutoTopUp = 7,
    /// Manual balance adjustment
    Adjustment = 8,
}

impl EntryKind {
    /// Persisted wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::TopUp => "top_up",
            EntryKind::HostCharge => "host_charge",
            EntryKind::HoldDeposit => "hold_deposit",
            EntryKind::ExtraCollect => "extra_collect",
            EntryKind::Refund => "refund",
            EntryKind::HostRefund => "host_refund",
            EntryKind::AutoTopUp => "auto_top_up",
            EntryKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntryStatus {
    /// Applied to the balance
    Success = 1,
    /// Recorded but not applied
    Failed = 2,
}

/// Immutable append-only ledger entry
///
/// Created exactly once per logical mutation; never mutated or deleted.
/// The account balance is always the sum of its successful entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// Account owner
    pub user_id: UserId,

    /// Room this entry belongs to, if settlement-driven
    pub room_id: Option<RoomId>,

    /// Kind of mutation
    pub kind: EntryKind,

    /// Signed amount in minor units (negative = debit)
    pub amount: Money,

    /// Entry status
    pub status: EntryStatus,

    /// Currency
    pub currency: Currency,

    /// Globally unique replay token, when supplied
    pub idempotency_key: Option<String>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Per-user account row
///
/// Accounts are provisioned by the identity collaborator; the ledger
/// only ever mutates `balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account owner
    pub user_id: UserId,

    /// Current balance (sum of successful entry amounts)
    pub balance: Money,

    /// Currency
    pub currency: Currency,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// A single balance-mutation request
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Account to mutate
    pub user_id: UserId,

    /// Signed amount (negative = debit)
    pub amount: Money,

    /// Entry kind
    pub kind: EntryKind,

    /// Replay token; a repeated key returns the original entry unchanged
    pub idempotency_key: Option<String>,

    /// Originating room, if any
    pub room_id: Option<RoomId>,

    /// Currency override (defaults to the account currency)
    pub currency: Option<Currency>,

    /// Additional metadata
    pub metadata: HashMap<String, String>,

    /// Permit the balance to go negative
    pub allow_negative: bool,
}

impl Mutation {
    /// Mutation with the common defaults
    pub fn new(user_id: UserId, amount: Money, kind: EntryKind) -> Self {
        Self {
            user_id,
            amount,
            kind,
            idempotency_key: None,
            room_id: None,
            currency: None,
            metadata: HashMap::new(),
            allow_negative: false,
        }
    }

    /// Attach an idempotency key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Attach a room reference
    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Attach a metadata pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Permit a negative resulting balance
    pub fn allowing_negative(mut self) -> Self {
        self.allow_negative = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("KRW"), Some(Currency::KRW));
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse("BTC"), None);
        assert_eq!(Currency::default(), Currency::KRW);
    }

    #[test]
    fn test_entry_kind_wire_names() {
        assert_eq!(EntryKind::TopUp.as_str(), "top_up");
        assert_eq!(EntryKind::AutoTopUp.as_str(), "auto_top_up");
        assert_eq!(EntryKind::HoldDeposit.as_str(), "hold_deposit");
        assert_eq!(
            serde_json::to_string(&EntryKind::ExtraCollect).unwrap(),
            "\"extra_collect\""
        );
    }

    #[test]
    fn test_mutation_builder() {
        let m = Mutation::new(
            UserId::new("u1"),
            Money::from_minor(-3000),
            EntryKind::HoldDeposit,
        )
        .with_key("room:r1:hold:u1")
        .with_room(RoomId::new("r1"));

        assert_eq!(m.idempotency_key.as_deref(), Some("room:r1:hold:u1"));
        assert_eq!(m.room_id, Some(RoomId::new("r1")));
        assert!(!m.allow_negative);
    }
}
