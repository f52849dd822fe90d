//! Payment gateway collaborator
//!
//! The real provider sits behind [`PaymentGateway`]; everything in this
//! workspace talks to the trait. [`MockGateway`] is the stand-in used in
//! development and tests. It is injected with an explicit lifecycle,
//! never a process-wide singleton.

use crate::money::Money;
use crate::types::Currency;
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Gateway payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Charge went through
    Succeeded,
    /// Charge was declined
    Failed,
}

/// Gateway payment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Money pulled from the external method
    Charge,
    /// Money returned to the external method
    Refund,
}

/// A payment as reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    /// Gateway-assigned payment ID
    pub id: Uuid,

    /// Charge or refund
    pub payment_type: PaymentType,

    /// Amount (positive)
    pub amount: Money,

    /// Currency
    pub currency: Currency,

    /// Outcome
    pub status: PaymentStatus,

    /// Parent payment for refunds
    pub parent_id: Option<Uuid>,

    /// Caller-supplied metadata
    pub metadata: HashMap<String, String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// External payment provider seam
pub trait PaymentGateway: Send + Sync {
    /// Charge the user's external payment method
    fn charge(
        &self,
        amount: Money,
        currency: Currency,
        metadata: HashMap<String, String>,
    ) -> Result<GatewayPayment>;

    /// Refund a previous charge
    fn refund(
        &self,
        payment_id: Uuid,
        amount: Money,
        currency: Currency,
        metadata: HashMap<String, String>,
    ) -> Result<GatewayPayment>;
}

/// In-memory gateway stub
///
/// Every charge succeeds. Keeps a payment log for inspection.
#[derive(Default)]
pub struct MockGateway {
    payments: Mutex<Vec<GatewayPayment>>,
}

impl MockGateway {
    /// Create new mock gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all payments issued so far
    pub fn payments(&self) -> Vec<GatewayPayment> {
        self.payments.lock().clone()
    }
}

impl PaymentGateway for MockGateway {
    fn charge(
        &self,
        amount: Money,
        currency: Currency,
        metadata: HashMap<String, String>,
    ) -> Result<GatewayPayment> {
        let payment = GatewayPayment {
            id: Uuid::new_v4(),
            payment_type: PaymentType::Charge,
            amount,
            currency,
            status: PaymentStatus::Succeeded,
            parent_id: None,
            metadata,
            created_at: Utc::now(),
        };

        tracing::debug!(payment_id = %payment.id, amount = %amount, "Mock charge");

        self.payments.lock().push(payment.clone());
        Ok(payment)
    }

    fn refund(
        &self,
        payment_id: Uuid,
        amount: Money,
        currency: Currency,
        metadata: HashMap<String, String>,
    ) -> Result<GatewayPayment> {
        let payment = GatewayPayment {
            id: Uuid::new_v4(),
            payment_type: PaymentType::Refund,
            amount,
            currency,
            status: PaymentStatus::Succeeded,
            parent_id: Some(payment_id),
            metadata,
            created_at: Utc::now(),
        };

        tracing::debug!(payment_id = %payment.id, parent_id = %payment_id, "Mock refund");

        self.payments.lock().push(payment.clone());
        Ok(payment)
    }
}
