//! Auto-funding guard
//!
//! Wraps a debit attempt for accounts that must not fail for lack of
//! funds (the host's own portion of a room-wide charge). If the balance
//! cannot cover the upcoming debit, the deficit is charged through the
//! payment gateway and credited to the wallet exactly once, keyed by the
//! gateway payment ID.

use crate::gateway::PaymentGateway;
use crate::types::{EntryKind, Mutation, RoomId, UserId};
use crate::{Error, Ledger, Money, Result};
use serde::Serialize;
use std::sync::Arc;

/// Why funds are being ensured; becomes part of the top-up replay token
#[derive(Debug, Clone)]
pub struct FundingContext {
    /// Settlement phase or caller-defined reason (e.g. "hold", "extra")
    pub reason: String,

    /// Room driving the debit, if any
    pub room_id: Option<RoomId>,
}

impl FundingContext {
    /// Context for a settlement-driven debit
    pub fn for_room(reason: impl Into<String>, room_id: RoomId) -> Self {
        Self {
            reason: reason.into(),
            room_id: Some(room_id),
        }
    }
}

/// Outcome of an ensure-funds call
#[derive(Debug, Clone, Serialize)]
pub struct FundingOutcome {
    /// True if a top-up was synthesized
    pub auto_top_up: bool,

    /// Amount that had to be funded (zero when covered)
    pub deficit: Money,
}

/// Auto-funding guard over ledger + gateway
pub struct FundingGuard {
    ledger: Arc<Ledger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl FundingGuard {
    /// Create new guard
    pub fn new(ledger: Arc<Ledger>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    /// Top up the account so an upcoming debit of `amount` can succeed
    ///
    /// Advisory only: the caller still issues the debit through
    /// [`Ledger::mutate`] afterwards. Between this check and that debit
    /// another writer may spend the balance, so the debit can still
    /// legitimately fail; that narrow race is accepted.
    pub async fn ensure_funds(
        &self,
        user_id: &UserId,
        amount: Money,
        context: &FundingContext,
    ) -> Result<FundingOutcome> {
        let balance = self.ledger.get_balance(user_id).await?;

        if balance >= amount {
            return Ok(FundingOutcome {
                auto_top_up: false,
                deficit: Money::ZERO,
            });
        }

        let deficit = amount
            .checked_sub(balance)
            .ok_or_else(|| Error::AmountOverflow(user_id.to_string()))?;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("reason".to_string(), context.reason.clone());
        if let Some(ref room_id) = context.room_id {
            metadata.insert("room_id".to_string(), room_id.to_string());
        }

        let payment = self
            .gateway
            .charge(deficit, Default::default(), metadata)?;

        // Keyed by the gateway payment ID: a retried settlement step
        // cannot double-fund the same charge.
        let key = format!(
            "auto_top_up:{}:{}:{}:{}",
            context.reason,
            context
                .room_id
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "general".to_string()),
            user_id,
            payment.id
        );

        let mut mutation = Mutation::new(user_id.clone(), deficit, EntryKind::AutoTopUp)
            .with_key(key)
            .with_metadata("gateway_payment_id", payment.id.to_string());
        mutation.room_id = context.room_id.clone();

        self.ledger.mutate(mutation).await?;

        tracing::info!(
            user_id = %user_id,
            deficit = %deficit,
            reason = %context.reason,
            "Auto top-up applied"
        );

        Ok(FundingOutcome {
            auto_top_up: true,
            deficit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::Config;

    async fn test_guard() -> (Arc<Ledger>, Arc<MockGateway>, FundingGuard, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let ledger = Arc::new(Ledger::open(config).await.unwrap());
        let gateway = Arc::new(MockGateway::new());
        let guard = FundingGuard::new(ledger.clone(), gateway.clone());
        (ledger, gateway, guard, temp_dir)
    }

    #[tokio::test]
    async fn test_no_top_up_when_covered() {
        let (ledger, gateway, guard, _temp) = test_guard().await;

        let user = UserId::new("host");
        ledger
            .open_account(user.clone(), Money::from_minor(5000))
            .await
            .unwrap();

        let outcome = guard
            .ensure_funds(
                &user,
                Money::from_minor(3000),
                &FundingContext::for_room("hold", RoomId::new("r1")),
            )
            .await
            .unwrap();

        assert!(!outcome.auto_top_up);
        assert_eq!(outcome.deficit, Money::ZERO);
        assert!(gateway.payments().is_empty());
        assert_eq!(
            ledger.get_balance(&user).await.unwrap(),
            Money::from_minor(5000)
        );
    }

    #[tokio::test]
    async fn test_top_up_covers_deficit() {
        let (ledger, gateway, guard, _temp) = test_guard().await;

        let user = UserId::new("host");
        ledger
            .open_account(user.clone(), Money::from_minor(1000))
            .await
            .unwrap();

        let outcome = guard
            .ensure_funds(
                &user,
                Money::from_minor(3000),
                &FundingContext::for_room("hold", RoomId::new("r1")),
            )
            .await
            .unwrap();

        assert!(outcome.auto_top_up);
        assert_eq!(outcome.deficit, Money::from_minor(2000));
        assert_eq!(gateway.payments().len(), 1);

        // Balance now covers the upcoming debit exactly
        assert_eq!(
            ledger.get_balance(&user).await.unwrap(),
            Money::from_minor(3000)
        );

        let entries = ledger.entries_for_user(&user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::AutoTopUp);
        assert!(entries[0]
            .idempotency_key
            .as_deref()
            .unwrap()
            .starts_with("auto_top_up:hold:r1:host:"));
    }
}
