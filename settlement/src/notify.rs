//! Fire-and-forget notification sink
//!
//! Settlement never blocks or fails on notification delivery: sends go
//! through a bounded channel with `try_send`, and a saturated queue
//! drops the message with a warning. A consumer task appends delivered
//! messages to a per-user inbox that callers can inspect.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use wallet_core::UserId;

/// A delivered notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Message ID
    pub id: Uuid,

    /// Recipient
    pub user_id: UserId,

    /// Short title
    pub title: String,

    /// Message body
    pub body: String,

    /// Structured metadata
    pub metadata: HashMap<String, String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Per-user inbox filled by the sink's consumer task
#[derive(Clone, Default)]
pub struct NotificationInbox {
    messages: Arc<RwLock<HashMap<UserId, Vec<Notification>>>>,
}

impl NotificationInbox {
    /// Messages delivered to one user, oldest first
    pub fn for_user(&self, user_id: &UserId) -> Vec<Notification> {
        self.messages
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total delivered message count
    pub fn len(&self) -> usize {
        self.messages.read().values().map(Vec::len).sum()
    }

    /// True when nothing has been delivered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, notification: Notification) {
        self.messages
            .write()
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification);
    }
}

/// Sending half of the notification sink
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// One-way send; never blocks, never errors to the caller
    pub fn notify(
        &self,
        user_id: &UserId,
        title: impl Into<String>,
        body: impl Into<String>,
        metadata: HashMap<String, String>,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user_id.clone(),
            title: title.into(),
            body: body.into(),
            metadata,
            created_at: Utc::now(),
        };

        if let Err(e) = self.tx.try_send(notification) {
            tracing::warn!(user_id = %user_id, "Notification dropped: {}", e);
        }
    }
}

/// Spawn the sink's consumer task
///
/// Returns the sender handle and the inbox the consumer fills.
pub fn spawn_notification_sink(capacity: usize) -> (NotificationSender, NotificationInbox) {
    let (tx, mut rx) = mpsc::channel::<Notification>(capacity);
    let inbox = NotificationInbox::default();

    let consumer_inbox = inbox.clone();
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            tracing::info!(
                user_id = %notification.user_id,
                title = %notification.title,
                "Notification delivered"
            );
            consumer_inbox.push(notification);
        }
    });

    (NotificationSender { tx }, inbox)
}
