//! Two-phase room settlement
//!
//! `hold` collects the estimated per-head deposit from every member;
//! `finalize` reconciles against the actual fare, collecting extras or
//! issuing refunds. Both phases fan out over idempotent per-member
//! steps: each step commits a ledger mutation keyed by
//! `room:{room}:{phase}:{user}`, so a crashed or retried phase re-runs
//! from the top and already-committed members replay as no-ops. Failed
//! member steps are collected into the phase report, never rolled back;
//! the room's settlement status only advances once every member step
//! has succeeded.

use crate::notify::NotificationSender;
use crate::pricing::{split_collect, split_refund};
use crate::store::{RoomStore, SettlementStore};
use crate::types::{RecordStatus, Room, SettlementRecord, SettlementRole, SettlementStatus};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use wallet_core::{EntryKind, FundingContext, FundingGuard, Ledger, Money, Mutation, RoomId, UserId};

/// A member step that failed inside a phase
#[derive(Debug, Clone, Serialize)]
pub struct MemberStepFailure {
    /// Member whose step failed
    pub user_id: UserId,

    /// What went wrong
    pub detail: String,

    /// Whether re-running the phase can resolve it
    pub retryable: bool,
}

/// Outcome of the hold phase
#[derive(Debug, Clone, Serialize)]
pub struct HoldReport {
    /// Room ID
    pub room_id: RoomId,

    /// Deposit collected per member (ceiling split of the estimate)
    pub per_head: Money,

    /// Members whose deposit committed in this run or a previous one
    pub collected_from: Vec<UserId>,

    /// Members whose deposit could not be collected
    pub failures: Vec<MemberStepFailure>,
}

impl HoldReport {
    /// True when every member's deposit is committed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error out unless the phase fully committed
    pub fn require_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::PhaseIncomplete {
                room: self.room_id.to_string(),
                failed: self.failures.len(),
                total: self.failures.len() + self.collected_from.len(),
            })
        }
    }
}

/// Outcome of the finalize phase
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeReport {
    /// Room ID
    pub room_id: RoomId,

    /// Actual fare supplied by the caller
    pub actual_fare: Money,

    /// Actual minus estimated fare
    pub delta: Money,

    /// Extra collected per active member (zero when the estimate covered it)
    pub extra_per_head: Money,

    /// Refund issued per member (zero when nothing came back)
    pub refund_per_head: Money,

    /// Members whose reconciliation committed
    pub settled_members: Vec<UserId>,

    /// Members whose reconciliation failed
    pub failures: Vec<MemberStepFailure>,
}

impl FinalizeReport {
    /// True when every member's reconciliation is committed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error out unless the phase fully committed
    pub fn require_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::PhaseIncomplete {
                room: self.room_id.to_string(),
                failed: self.failures.len(),
                total: self.failures.len() + self.settled_members.len(),
            })
        }
    }
}

/// Two-phase settlement orchestrator
pub struct SettlementEngine {
    ledger: Arc<Ledger>,
    funding: FundingGuard,
    rooms: Arc<dyn RoomStore>,
    records: Arc<dyn SettlementStore>,
    notifier: NotificationSender,
}

impl SettlementEngine {
    /// Create new engine over its collaborators
    pub fn new(
        ledger: Arc<Ledger>,
        funding: FundingGuard,
        rooms: Arc<dyn RoomStore>,
        records: Arc<dyn SettlementStore>,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            ledger,
            funding,
            rooms,
            records,
            notifier,
        }
    }

    /// Collect the estimated per-head deposit from every member
    ///
    /// Idempotent: re-running after a partial failure retries only the
    /// members whose deposit never committed. The host's step is
    /// preceded by the auto-funding guard so it cannot fail for lack of
    /// balance.
    pub async fn hold(&self, room_id: &RoomId) -> Result<HoldReport> {
        let mut room = self.load_room(room_id)?;

        if room.settlement_status == SettlementStatus::Settled {
            return Err(Error::AlreadySettled(room_id.to_string()));
        }

        let estimated = room
            .estimated_fare
            .ok_or_else(|| Error::EstimatedFareMissing(room_id.to_string()))?;

        let members = room.members();
        let per_head = split_collect(estimated, members.len());

        tracing::info!(
            room_id = %room_id,
            estimated = %estimated,
            members = members.len(),
            per_head = %per_head,
            "Hold phase started"
        );

        let mut report = HoldReport {
            room_id: room_id.clone(),
            per_head,
            collected_from: Vec::new(),
            failures: Vec::new(),
        };

        for member in &members {
            match self.hold_member(&room, member, per_head).await {
                Ok(()) => report.collected_from.push(member.clone()),
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::warn!(
                        room_id = %room_id,
                        user_id = %member,
                        retryable,
                        "Hold step failed: {}",
                        e
                    );
                    report.failures.push(MemberStepFailure {
                        user_id: member.clone(),
                        detail: e.to_string(),
                        retryable,
                    });
                }
            }
        }

        if report.is_complete() {
            room.settlement_status = SettlementStatus::DepositCollected;
            self.rooms.put(room)?;
            tracing::info!(room_id = %room_id, "Hold phase complete");
        }

        Ok(report)
    }

    /// One member's hold step: fund (host only), debit, record, notify
    async fn hold_member(&self, room: &Room, member: &UserId, per_head: Money) -> Result<()> {
        let role = if member == &room.host {
            SettlementRole::Host
        } else {
            SettlementRole::Guest
        };

        if role == SettlementRole::Host {
            self.funding
                .ensure_funds(
                    member,
                    per_head,
                    &FundingContext::for_room("hold", room.room_id.clone()),
                )
                .await?;
        }

        let kind = match role {
            SettlementRole::Host => EntryKind::HostCharge,
            SettlementRole::Guest => EntryKind::HoldDeposit,
        };

        self.ledger
            .mutate(
                Mutation::new(member.clone(), -per_head, kind)
                    .with_key(format!("room:{}:hold:{}", room.room_id, member))
                    .with_room(room.room_id.clone()),
            )
            .await?;

        let mut record =
            SettlementRecord::held(room.room_id.clone(), member.clone(), role, per_head);
        record.no_show = room.is_no_show(member);
        self.records.upsert(record)?;

        self.notifier.notify(
            member,
            "Deposit held",
            format!("{} held for room {}", per_head, room.title),
            room_metadata(&room.room_id),
        );

        Ok(())
    }

    /// Reconcile the room against the actual fare
    ///
    /// When the actual fare exceeds the estimate, the shortfall is
    /// collected from members who showed up (ceiling split); no-shows
    /// are excluded from the extra charge. When the estimate exceeded
    /// the actual fare, every member is refunded their floor share,
    /// no-shows included. Rejected once the room is settled.
    pub async fn finalize(&self, room_id: &RoomId, actual_fare: Money) -> Result<FinalizeReport> {
        let mut room = self.load_room(room_id)?;

        if room.settlement_status == SettlementStatus::Settled {
            return Err(Error::AlreadySettled(room_id.to_string()));
        }

        let estimated = room
            .estimated_fare
            .ok_or_else(|| Error::EstimatedFareMissing(room_id.to_string()))?;

        let members = room.members();
        let delta = actual_fare - estimated;

        let active: Vec<UserId> = members
            .iter()
            .filter(|m| !room.is_no_show(m))
            .cloned()
            .collect();

        let extra_per_head = if delta.is_positive() {
            split_collect(delta, active.len())
        } else {
            Money::ZERO
        };
        let refund_per_head = if delta.is_negative() {
            split_refund(-delta, members.len())
        } else {
            Money::ZERO
        };

        tracing::info!(
            room_id = %room_id,
            actual_fare = %actual_fare,
            delta = %delta,
            extra_per_head = %extra_per_head,
            refund_per_head = %refund_per_head,
            "Finalize phase started"
        );

        let mut report = FinalizeReport {
            room_id: room_id.clone(),
            actual_fare,
            delta,
            extra_per_head,
            refund_per_head,
            settled_members: Vec::new(),
            failures: Vec::new(),
        };

        for member in &members {
            let no_show = room.is_no_show(member);
            let extra = if no_show { Money::ZERO } else { extra_per_head };

            let step = self
                .finalize_member(&room, member, extra, refund_per_head)
                .await;

            match step {
                Ok(()) => report.settled_members.push(member.clone()),
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::warn!(
                        room_id = %room_id,
                        user_id = %member,
                        retryable,
                        "Finalize step failed: {}",
                        e
                    );
                    report.failures.push(MemberStepFailure {
                        user_id: member.clone(),
                        detail: e.to_string(),
                        retryable,
                    });
                }
            }
        }

        if report.is_complete() {
            room.actual_fare = Some(actual_fare);
            room.settlement_status = SettlementStatus::Settled;
            self.rooms.put(room)?;
            tracing::info!(room_id = %room_id, "Finalize phase complete");
        }

        Ok(report)
    }

    /// One member's finalize step: extra charge or refund, record, notify
    async fn finalize_member(
        &self,
        room: &Room,
        member: &UserId,
        extra: Money,
        refund: Money,
    ) -> Result<()> {
        let role = if member == &room.host {
            SettlementRole::Host
        } else {
            SettlementRole::Guest
        };

        if extra.is_positive() {
            if role == SettlementRole::Host {
                self.funding
                    .ensure_funds(
                        member,
                        extra,
                        &FundingContext::for_room("extra", room.room_id.clone()),
                    )
                    .await?;
            }

            self.ledger
                .mutate(
                    Mutation::new(member.clone(), -extra, EntryKind::ExtraCollect)
                        .with_key(format!("room:{}:extra:{}", room.room_id, member))
                        .with_room(room.room_id.clone()),
                )
                .await?;
        }

        if refund.is_positive() {
            // Settlement refunds are uniform across roles; host_refund
            // belongs to the direct wallet route only.
            self.ledger
                .mutate(
                    Mutation::new(member.clone(), refund, EntryKind::Refund)
                        .with_key(format!("room:{}:refund:{}", room.room_id, member))
                        .with_room(room.room_id.clone()),
                )
                .await?;
        }

        // Fields are set absolutely, not accumulated, so a replayed step
        // converges on the same record. Without a prior hold there is no
        // deposit entry, and the record must not claim one.
        let mut record = match self.records.get(&room.room_id, member)? {
            Some(record) => record,
            None => SettlementRecord::held(
                room.room_id.clone(),
                member.clone(),
                role,
                Money::ZERO,
            ),
        };
        record.extra_collect = extra;
        record.refund = refund;
        record.no_show = room.is_no_show(member);
        record.status = RecordStatus::Settled;
        record.recompute_net();
        self.records.upsert(record)?;

        let body = if extra.is_positive() {
            format!("Extra {} collected for room {}", extra, room.title)
        } else if refund.is_positive() {
            format!("{} refunded for room {}", refund, room.title)
        } else {
            format!("Room {} settled, no adjustment", room.title)
        };
        self.notifier
            .notify(member, "Room settled", body, room_metadata(&room.room_id));

        Ok(())
    }

    /// Settlement records for a room
    pub fn records_for_room(&self, room_id: &RoomId) -> Result<Vec<SettlementRecord>> {
        self.records.list_for_room(room_id)
    }

    fn load_room(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms
            .get(room_id)?
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))
    }
}

fn room_metadata(room_id: &RoomId) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("room_id".to_string(), room_id.to_string());
    metadata
}
