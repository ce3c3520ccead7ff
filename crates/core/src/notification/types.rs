//! Notification domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rentflow_shared::types::{ContractId, NotificationId, UserId};
use serde::{Deserialize, Serialize};

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Upcoming or due-today rent, contract expiry warning.
    Reminder,
    /// Rent past due.
    Overdue,
    /// Payment received, escrow released.
    Success,
}

impl NotificationType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Overdue => "overdue",
            Self::Success => "success",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reminder" => Ok(Self::Reminder),
            "overdue" => Ok(Self::Overdue),
            "success" => Ok(Self::Success),
            _ => Err(format!("Unknown notification type: {s}")),
        }
    }
}

/// Delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Claimed, not yet delivered.
    Pending,
    /// Delivered by the sender.
    Sent,
    /// Delivery failed or no recipient channel.
    Failed,
}

impl NotificationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown notification status: {s}")),
        }
    }
}

/// The rule that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum NotificationTrigger {
    /// Rent due in `days` days.
    EarlyReminder {
        /// Days until due.
        days: u32,
    },
    /// Rent due today.
    DueToday,
    /// Rent `days` days past due.
    Overdue {
        /// Days past due.
        days: u32,
    },
    /// Contract expires within the warning window.
    ExpiryWarning,
    /// Tenant payment posted.
    PaymentReceived,
    /// Escrow bucket released to the landlord.
    EscrowReleased,
}

impl NotificationTrigger {
    /// Category of the notification this trigger creates.
    #[must_use]
    pub const fn notification_type(self) -> NotificationType {
        match self {
            Self::EarlyReminder { .. } | Self::DueToday | Self::ExpiryWarning => {
                NotificationType::Reminder
            }
            Self::Overdue { .. } => NotificationType::Overdue,
            Self::PaymentReceived | Self::EscrowReleased => NotificationType::Success,
        }
    }

    /// Stable label including the day offset.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::EarlyReminder { days } => format!("early_{days}d"),
            Self::DueToday => "due_today".to_string(),
            Self::Overdue { days } => format!("overdue_{days}d"),
            Self::ExpiryWarning => "expiry_warning".to_string(),
            Self::PaymentReceived => "payment_received".to_string(),
            Self::EscrowReleased => "escrow_released".to_string(),
        }
    }
}

/// A scheduled or sent notification.
///
/// `dedupe_key` is unique: one row per contract, trigger and cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    /// Notification ID.
    pub id: NotificationId,
    /// Contract the notification is about.
    pub contract_id: ContractId,
    /// Contract tenant.
    pub tenant_id: UserId,
    /// Who receives it (tenant, or landlord for escrow notices).
    pub recipient_id: UserId,
    /// Category.
    pub notification_type: NotificationType,
    /// Trigger label (see [`NotificationTrigger::label`]).
    pub trigger: String,
    /// Day the notification belongs to.
    pub scheduled_for: NaiveDate,
    /// Delivery time.
    pub sent_at: Option<DateTime<Utc>>,
    /// Title.
    pub title: String,
    /// Body.
    pub message: String,
    /// Delivery status.
    pub status: NotificationStatus,
    /// Sender receipt.
    pub delivery_receipt_id: Option<String>,
    /// Channel the sender used.
    pub delivery_method: Option<String>,
    /// Failure reason.
    pub error: Option<String>,
    /// Uniqueness key.
    pub dedupe_key: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Contact details for a tenant or landlord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// User.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Email address.
    pub email: Option<String>,
    /// Phone number for SMS.
    pub phone: Option<String>,
    /// Push token.
    pub push_token: Option<String>,
}

impl Recipient {
    /// Returns true if at least one delivery channel is known.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        [&self.email, &self.phone, &self.push_token]
            .iter()
            .any(|c| c.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}
