//! Core types for room settlement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use wallet_core::{Money, RoomId, UserId};

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Accepting participants
    Open,
    /// At capacity
    Full,
    /// Departed or cancelled
    Closed,
}

/// Matching priority tag declared by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPriority {
    /// Leave as close to the requested time as possible
    Time,
    /// Minimize the per-head fare
    Price,
}

impl Default for RoomPriority {
    fn default() -> Self {
        RoomPriority::Time
    }
}

/// Settlement lifecycle of a room
///
/// Only ever moves forward: none → deposit_collected → settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// No settlement activity yet
    None,
    /// Hold phase completed for every member
    DepositCollected,
    /// Finalize phase completed for every member
    Settled,
}

/// Departure coordinates (WGS 84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// A shared-ride room (owned by the room service, referenced here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room ID
    pub room_id: RoomId,

    /// Display title
    pub title: String,

    /// Creator; pays through the auto-funding guard
    pub host: UserId,

    /// Participants other than the host
    pub participants: Vec<UserId>,

    /// Seat capacity including the host
    pub capacity: usize,

    /// Room status
    pub status: RoomStatus,

    /// Matching priority
    pub priority: RoomPriority,

    /// Departure point
    pub departure: GeoPoint,

    /// Scheduled departure time
    pub departure_time: DateTime<Utc>,

    /// Fare estimate used for the hold phase
    pub estimated_fare: Option<Money>,

    /// Real fare, recorded by finalize
    pub actual_fare: Option<Money>,

    /// Settlement lifecycle
    pub settlement_status: SettlementStatus,

    /// Members excluded from extra-fare liability (still refund-eligible)
    pub no_show_user_ids: Vec<UserId>,
}

impl Room {
    /// Member set: {host} ∪ participants, host first, no duplicates
    pub fn members(&self) -> Vec<UserId> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(self.participants.len() + 1);
        for user in std::iter::once(&self.host).chain(self.participants.iter()) {
            if seen.insert(user.clone()) {
                members.push(user.clone());
            }
        }
        members
    }

    /// Seats still open
    pub fn seats_available(&self) -> usize {
        self.capacity.saturating_sub(self.members().len())
    }

    /// No-show membership lookup
    pub fn is_no_show(&self, user: &UserId) -> bool {
        self.no_show_user_ids.contains(user)
    }

    /// Re-derive open/full from occupancy; closed rooms stay closed
    pub fn refresh_status(&mut self) {
        if self.status == RoomStatus::Closed {
            return;
        }
        self.status = if self.seats_available() == 0 {
            RoomStatus::Full
        } else {
            RoomStatus::Open
        };
    }
}

/// Role of a member in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementRole {
    /// Room creator
    Host,
    /// Joined participant
    Guest,
}

/// Settlement record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Deposit held, awaiting finalize
    Pending,
    /// Reconciled against the actual fare
    Settled,
}

/// Per-(room, member) settlement record
///
/// Upserted by key; finalize writes on top of the hold phase's fields.
/// `net_amount` is always recomputed as deposit + extra − refund, so a
/// replayed phase step writes the same record again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Room ID
    pub room_id: RoomId,

    /// Member
    pub user_id: UserId,

    /// Host or guest
    pub role: SettlementRole,

    /// Deposit collected in the hold phase
    pub deposit: Money,

    /// Extra collected in the finalize phase
    pub extra_collect: Money,

    /// Refund issued in the finalize phase
    pub refund: Money,

    /// Net paid by this member
    pub net_amount: Money,

    /// Member was marked no-show
    pub no_show: bool,

    /// Record status
    pub status: RecordStatus,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Fresh record from the hold phase
    pub fn held(room_id: RoomId, user_id: UserId, role: SettlementRole, deposit: Money) -> Self {
        Self {
            room_id,
            user_id,
            role,
            deposit,
            extra_collect: Money::ZERO,
            refund: Money::ZERO,
            net_amount: deposit,
            no_show: false,
            status: RecordStatus::Pending,
            updated_at: Utc::now(),
        }
    }

    /// Recompute the net from the component fields
    pub fn recompute_net(&mut self) {
        self.net_amount = self.deposit + self.extra_collect - self.refund;
        self.updated_at = Utc::now();
    }
}
