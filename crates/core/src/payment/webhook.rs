//! Gateway webhook events.
//!
//! Signature checks happen at the HTTP edge; this module only sees
//! authenticated payloads of the form `{"event": "...", "data": {...}}`.
//! Every handler is idempotent, so a redelivered event is harmless. The
//! event log records each `(event, reference)` once, after processing
//! succeeded, which lets a failed delivery be retried by the gateway.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::PaymentError;
use super::processor::PaymentProcessor;
use crate::error::Classify;
use crate::gateway::TransferStatus;

/// An authenticated gateway notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A checkout or recurring charge succeeded.
    ChargeSuccess {
        /// Charge reference.
        reference: String,
    },
    /// A transfer reached a final (or new) status.
    Transfer {
        /// Withdrawal reference.
        reference: String,
        /// Processor transfer code.
        transfer_code: Option<String>,
        /// Reported status.
        status: TransferStatus,
    },
    /// Anything we do not act on.
    Other {
        /// Event name.
        event: String,
    },
}

impl GatewayEvent {
    /// Parses a webhook body.
    pub fn from_payload(payload: &Value) -> Result<Self, PaymentError> {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| PaymentError::InvalidEvent("missing event name".to_string()))?;
        let data = payload.get("data").unwrap_or(&Value::Null);
        let field = |name: &str| data.get(name).and_then(Value::as_str).map(str::to_string);
        let reference = || {
            field("reference")
                .ok_or_else(|| PaymentError::InvalidEvent(format!("{event} without reference")))
        };

        let parsed = match event {
            "charge.success" => Self::ChargeSuccess {
                reference: reference()?,
            },
            "transfer.success" | "transfer.failed" | "transfer.reversed" => Self::Transfer {
                reference: reference()?,
                transfer_code: field("transfer_code"),
                status: TransferStatus::parse(event.trim_start_matches("transfer.")),
            },
            other => Self::Other {
                event: other.to_string(),
            },
        };
        Ok(parsed)
    }

    /// Event name as delivered.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::ChargeSuccess { .. } => "charge.success".to_string(),
            Self::Transfer { status, .. } => format!("transfer.{}", transfer_word(*status)),
            Self::Other { event } => event.clone(),
        }
    }

    /// Reference the event is about.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::ChargeSuccess { reference } | Self::Transfer { reference, .. } => {
                Some(reference)
            }
            Self::Other { .. } => None,
        }
    }
}

const fn transfer_word(status: TransferStatus) -> &'static str {
    match status {
        TransferStatus::Success => "success",
        TransferStatus::Failed => "failed",
        TransferStatus::Reversed => "reversed",
        TransferStatus::Pending => "pending",
    }
}

/// What happened to a delivered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Applied for the first time.
    Processed,
    /// Seen before; nothing changed.
    Duplicate,
    /// Not an event we act on.
    Ignored,
    /// Processing failed permanently; the event is recorded so it is not retried.
    Rejected(String),
}

impl PaymentProcessor {
    /// Applies an authenticated webhook payload.
    ///
    /// Returns `Err` only for transient failures the gateway should redeliver.
    pub async fn handle_event(&self, payload: &Value) -> Result<WebhookOutcome, PaymentError> {
        let event = match GatewayEvent::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed gateway event");
                return Ok(WebhookOutcome::Ignored);
            }
        };
        let Some(reference) = event.reference().map(str::to_string) else {
            debug!(event = %event.name(), "Ignoring gateway event");
            return Ok(WebhookOutcome::Ignored);
        };

        let applied = match &event {
            GatewayEvent::ChargeSuccess { reference } => {
                self.complete_payment(reference).await.map(|_| ())
            }
            GatewayEvent::Transfer {
                reference,
                transfer_code,
                status,
            } => self
                .settle_transfer(reference, *status, transfer_code.as_deref())
                .await
                .map(|_| ()),
            GatewayEvent::Other { .. } => Ok(()),
        };

        let outcome = match applied {
            Ok(()) => WebhookOutcome::Processed,
            Err(e) if e.is_retryable() => {
                warn!(event = %event.name(), %reference, error = %e, "Gateway event deferred");
                return Err(e);
            }
            Err(e) => {
                warn!(event = %event.name(), %reference, error = %e, "Gateway event rejected");
                WebhookOutcome::Rejected(e.to_string())
            }
        };

        let first = self
            .store
            .record_webhook_event(&event.name(), &reference, payload)
            .await?;
        if !first {
            debug!(event = %event.name(), %reference, "Duplicate gateway event");
            return Ok(WebhookOutcome::Duplicate);
        }
        info!(event = %event.name(), %reference, ?outcome, "Gateway event handled");
        Ok(outcome)
    }
}
