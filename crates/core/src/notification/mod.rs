//! Payment reminders, overdue escalation and receipts.

pub mod policy;
pub mod scheduler;
pub mod sender;
pub mod types;

pub use policy::ReminderPolicy;
pub use scheduler::{DispatchOutcome, NotificationError, NotificationScheduler};
pub use sender::{
    ChannelHint, DeliveryReceipt, EmailNotificationSender, LogNotificationSender,
    NotificationSender, OutboundNotification, OutboxSender, SendError,
};
pub use types::{
    NotificationStatus, NotificationTrigger, NotificationType, PaymentNotification, Recipient,
};
