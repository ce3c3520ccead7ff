//! When to notify, and what to say.
//!
//! Pure functions of a contract and a date; the scheduler owns the I/O.

use chrono::{Duration, NaiveDate};
use rentflow_shared::config::NotificationConfig;
use rentflow_shared::types::ContractId;
use rust_decimal::Decimal;

use super::types::NotificationTrigger;
use crate::contract::schedule::days_overdue;

/// Reminder and escalation rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Days before the due date for the early reminder.
    pub early_reminder_days: u32,
    /// Days past due before escalation starts.
    pub overdue_grace_days: u32,
    /// Days past due on which an overdue notice is sent.
    pub overdue_offsets: Vec<u32>,
    /// Contracts expiring within this many days get a warning.
    pub expiry_warning_days: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for ReminderPolicy {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            early_reminder_days: config.early_reminder_days,
            overdue_grace_days: config.overdue_grace_days,
            overdue_offsets: config.overdue_offsets.clone(),
            expiry_warning_days: config.expiry_warning_days,
        }
    }
}

impl ReminderPolicy {
    /// Due date that gets the early reminder today.
    #[must_use]
    pub fn early_reminder_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(i64::from(self.early_reminder_days))
    }

    /// Reminder to send today for a cycle due on `due`, if any.
    #[must_use]
    pub fn reminder_trigger(&self, due: NaiveDate, today: NaiveDate) -> Option<NotificationTrigger> {
        if due == today {
            Some(NotificationTrigger::DueToday)
        } else if self.early_reminder_days > 0 && due == self.early_reminder_date(today) {
            Some(NotificationTrigger::EarlyReminder {
                days: self.early_reminder_days,
            })
        } else {
            None
        }
    }

    /// Overdue notice to send today, only on a configured day offset past the grace period.
    #[must_use]
    pub fn overdue_trigger(&self, due: NaiveDate, today: NaiveDate) -> Option<NotificationTrigger> {
        let days = u32::try_from(days_overdue(due, today)).ok()?;
        (days > self.overdue_grace_days && self.overdue_offsets.contains(&days))
            .then_some(NotificationTrigger::Overdue { days })
    }

    /// Returns true if a contract expiring on `expiry` is inside the warning window.
    #[must_use]
    pub fn in_expiry_window(&self, expiry: NaiveDate, today: NaiveDate) -> bool {
        expiry >= today && expiry <= today + Duration::days(i64::from(self.expiry_warning_days))
    }

    /// Last due date still inside the grace period; anything before it is overdue.
    #[must_use]
    pub fn overdue_cutoff(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.overdue_grace_days))
    }
}

/// Uniqueness key for one notification per contract, trigger and cycle.
#[must_use]
pub fn dedupe_key(contract_id: ContractId, trigger: NotificationTrigger, cycle: &str) -> String {
    format!(
        "{contract_id}:{}:{}:{cycle}",
        trigger.notification_type().as_str(),
        trigger.label()
    )
}

/// Title and body for a trigger.
#[must_use]
pub fn render(
    trigger: NotificationTrigger,
    amount: Decimal,
    currency: &str,
    date: NaiveDate,
) -> (String, String) {
    let amount = format!("{currency} {}", amount.round_dp(2).normalize());
    match trigger {
        NotificationTrigger::EarlyReminder { days } => (
            format!("Rent due in {days} days"),
            format!("Your rent of {amount} is due on {date}."),
        ),
        NotificationTrigger::DueToday => (
            "Rent due today".to_string(),
            format!("Your rent of {amount} is due today ({date})."),
        ),
        NotificationTrigger::Overdue { days } => (
            format!("Rent overdue by {days} days"),
            format!("Your rent of {amount} was due on {date} and is {days} days overdue."),
        ),
        NotificationTrigger::ExpiryWarning => (
            "Tenancy expiring soon".to_string(),
            format!("Your rent contract expires on {date}. Contact your landlord to renew."),
        ),
        NotificationTrigger::PaymentReceived => (
            "Payment received".to_string(),
            format!("We received your rent payment of {amount}. Next payment is due on {date}."),
        ),
        NotificationTrigger::EscrowReleased => (
            "Escrow released".to_string(),
            format!("{amount} held in escrow has been released to your wallet on {date}."),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reminder_triggers() {
        let policy = ReminderPolicy::default();
        let today = date(2024, 1, 1);
        assert_eq!(
            policy.reminder_trigger(date(2024, 1, 4), today),
            Some(NotificationTrigger::EarlyReminder { days: 3 })
        );
        assert_eq!(
            policy.reminder_trigger(today, today),
            Some(NotificationTrigger::DueToday)
        );
        assert_eq!(policy.reminder_trigger(date(2024, 1, 3), today), None);
    }

    #[rstest]
    #[case(1, true)]
    #[case(2, false)]
    #[case(3, true)]
    #[case(5, false)]
    #[case(7, true)]
    #[case(14, true)]
    #[case(15, false)]
    #[case(0, false)]
    fn test_overdue_offsets(#[case] days: i64, #[case] fires: bool) {
        let policy = ReminderPolicy::default();
        let due = date(2024, 1, 1);
        let today = due + Duration::days(days);
        assert_eq!(policy.overdue_trigger(due, today).is_some(), fires);
    }

    #[test]
    fn test_overdue_grace_suppresses_early_offsets() {
        let policy = ReminderPolicy {
            overdue_grace_days: 3,
            ..ReminderPolicy::default()
        };
        let due = date(2024, 1, 1);
        assert!(policy.overdue_trigger(due, date(2024, 1, 2)).is_none());
        assert!(policy.overdue_trigger(due, date(2024, 1, 4)).is_none());
        assert!(policy.overdue_trigger(due, date(2024, 1, 8)).is_some());
    }

    #[test]
    fn test_not_yet_due_is_never_overdue() {
        let policy = ReminderPolicy::default();
        assert!(policy.overdue_trigger(date(2024, 1, 10), date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_expiry_window() {
        let policy = ReminderPolicy::default();
        let today = date(2024, 1, 1);
        assert!(policy.in_expiry_window(date(2024, 1, 31), today));
        assert!(!policy.in_expiry_window(date(2024, 2, 1), today));
        assert!(!policy.in_expiry_window(date(2023, 12, 31), today));
    }

    #[test]
    fn test_dedupe_key_includes_offset_and_cycle() {
        let id = ContractId::new();
        let a = dedupe_key(id, NotificationTrigger::Overdue { days: 1 }, "2024-01-01");
        let b = dedupe_key(id, NotificationTrigger::Overdue { days: 3 }, "2024-01-01");
        let c = dedupe_key(id, NotificationTrigger::Overdue { days: 1 }, "2024-02-01");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(":overdue:overdue_1d:2024-01-01"));
    }

    #[test]
    fn test_render_mentions_amount_and_date() {
        let (title, body) = render(
            NotificationTrigger::Overdue { days: 7 },
            dec!(50000.00),
            "NGN",
            date(2024, 1, 1),
        );
        assert_eq!(title, "Rent overdue by 7 days");
        assert!(body.contains("NGN 50000"));
        assert!(body.contains("2024-01-01"));
    }
}
