//! Notification Sender port and channel implementations.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rentflow_shared::EmailService;
use rentflow_shared::types::UserId;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::types::Recipient;
use crate::error::{Classify, ErrorKind};

/// Preferred delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelHint {
    /// Sender decides.
    Any,
    /// Email.
    Email,
    /// SMS.
    Sms,
    /// Push notification.
    Push,
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundNotification {
    /// Recipient user.
    pub user_id: UserId,
    /// Contact details.
    pub recipient: Recipient,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Preferred channel.
    pub channel_hint: ChannelHint,
}

/// What the sender did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// Channel actually used.
    pub method: String,
    /// Whether delivery was accepted.
    pub success: bool,
    /// Provider message ID.
    pub receipt_id: Option<String>,
}

/// Delivery errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// The recipient has no address for any supported channel.
    #[error("No delivery channel for recipient")]
    NoChannel,

    /// The provider refused the message.
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Delivery failed: {0}")]
    Unavailable(String),
}

impl Classify for SendError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoChannel | Self::Rejected(_) => ErrorKind::Validation,
            Self::Unavailable(_) => ErrorKind::Transient,
        }
    }
}

/// Delivers notifications over whatever channel the recipient has.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Delivers one notification.
    async fn send(&self, notification: &OutboundNotification)
    -> Result<DeliveryReceipt, SendError>;
}

/// SMTP delivery through [`EmailService`].
#[derive(Clone)]
pub struct EmailNotificationSender {
    email: EmailService,
}

impl EmailNotificationSender {
    /// Wraps an email service.
    #[must_use]
    pub const fn new(email: EmailService) -> Self {
        Self { email }
    }
}

#[async_trait]
impl NotificationSender for EmailNotificationSender {
    async fn send(
        &self,
        notification: &OutboundNotification,
    ) -> Result<DeliveryReceipt, SendError> {
        let to = notification
            .recipient
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(SendError::NoChannel)?;

        self.email
            .send_notification(
                to,
                &notification.recipient.display_name,
                &notification.title,
                &notification.body,
            )
            .await
            .map_err(|e| match e {
                rentflow_shared::EmailError::SendError(msg) => SendError::Unavailable(msg),
                other => SendError::Rejected(other.to_string()),
            })?;

        Ok(DeliveryReceipt {
            method: "email".to_string(),
            success: true,
            receipt_id: None,
        })
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(
        &self,
        notification: &OutboundNotification,
    ) -> Result<DeliveryReceipt, SendError> {
        info!(
            user_id = %notification.user_id,
            title = %notification.title,
            body = %notification.body,
            "Notification (log channel)"
        );
        Ok(DeliveryReceipt {
            method: "log".to_string(),
            success: true,
            receipt_id: None,
        })
    }
}

/// Keeps every notification in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct OutboxSender {
    sent: Mutex<Vec<OutboundNotification>>,
    failure: Mutex<Option<SendError>>,
}

impl OutboxSender {
    /// Empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivered notification, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes every later send fail with `error` (or succeed again with `None`).
    pub fn fail_with(&self, error: Option<SendError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }
}

#[async_trait]
impl NotificationSender for OutboxSender {
    async fn send(
        &self,
        notification: &OutboundNotification,
    ) -> Result<DeliveryReceipt, SendError> {
        if let Some(error) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.push(notification.clone());
        Ok(DeliveryReceipt {
            method: "outbox".to_string(),
            success: true,
            receipt_id: Some(format!("outbox-{}", sent.len())),
        })
    }
}
