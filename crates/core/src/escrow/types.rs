//! Escrow domain types.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rentflow_shared::config::EscrowConfig;
use rentflow_shared::types::{ContractId, EscrowId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::schedule::add_months;

/// Accumulation bucket for a yearly-payout contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBalance {
    /// Bucket ID.
    pub id: EscrowId,
    /// Landlord the bucket is released to.
    pub landlord_id: UserId,
    /// Contract feeding the bucket.
    pub contract_id: ContractId,
    /// Sum of every payment routed here.
    pub total_escrowed: Decimal,
    /// One per routed payment.
    pub months_accumulated: u32,
    /// Date the bucket becomes releasable by age.
    pub expected_release_date: NaiveDate,
    /// Closed buckets never change again.
    pub is_released: bool,
    /// When the bucket was closed.
    pub released_at: Option<DateTime<Utc>>,
    /// Snapshot of `total_escrowed` at release.
    pub released_amount: Option<Decimal>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl EscrowBalance {
    /// Opens a bucket holding its first payment.
    #[must_use]
    pub fn open(
        landlord_id: UserId,
        contract_id: ContractId,
        amount: Decimal,
        today: NaiveDate,
        release_months: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EscrowId::new(),
            landlord_id,
            contract_id,
            total_escrowed: amount,
            months_accumulated: 1,
            expected_release_date: add_months(today, release_months),
            is_released: false,
            released_at: None,
            released_amount: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds one routed payment.
    pub fn accumulate(&mut self, amount: Decimal, now: DateTime<Utc>) {
        self.total_escrowed += amount;
        self.months_accumulated += 1;
        self.updated_at = now;
    }

    /// Closes the bucket, snapshotting the released amount.
    pub fn mark_released(&mut self, now: DateTime<Utc>) {
        self.is_released = true;
        self.released_at = Some(now);
        self.released_amount = Some(self.total_escrowed);
        self.updated_at = now;
    }

    /// Wallet-transaction reference used for this bucket's release credit.
    #[must_use]
    pub fn release_reference(&self) -> String {
        format!("escrow_release_{}", self.id)
    }

    /// Why the bucket may be released today, if at all.
    #[must_use]
    pub fn release_reason(
        &self,
        contract_expiry: Option<NaiveDate>,
        today: NaiveDate,
        policy: &EscrowPolicy,
    ) -> Option<ReleaseReason> {
        if self.is_released {
            return None;
        }
        if self.months_accumulated >= policy.release_months {
            return Some(ReleaseReason::MonthsAccumulated);
        }
        let expired = contract_expiry.is_some_and(|expiry| {
            expiry + Duration::days(i64::from(policy.grace_period_days)) <= today
        });
        (policy.release_on_expiry && expired).then_some(ReleaseReason::ContractExpired)
    }
}

/// Condition that made a bucket releasable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// A full year of payments is held.
    MonthsAccumulated,
    /// The contract ended and its grace period elapsed.
    ContractExpired,
    /// Requested by an operator.
    Manual,
}

impl ReleaseReason {
    /// Label used in logs and wallet metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MonthsAccumulated => "months_accumulated",
            Self::ContractExpired => "contract_expired",
            Self::Manual => "manual",
        }
    }
}

/// Release eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowPolicy {
    /// Payments needed before age-based release.
    pub release_months: u32,
    /// Whether contract expiry triggers release.
    pub release_on_expiry: bool,
    /// Days after expiry before release.
    pub grace_period_days: u32,
}

impl Default for EscrowPolicy {
    fn default() -> Self {
        Self::from(&EscrowConfig::default())
    }
}

impl From<&EscrowConfig> for EscrowPolicy {
    fn from(config: &EscrowConfig) -> Self {
        Self {
            release_months: config.release_months,
            release_on_expiry: config.release_on_expiry,
            grace_period_days: config.grace_period_days,
        }
    }
}

/// Result of a single release attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowRelease {
    /// Bucket.
    pub escrow_id: EscrowId,
    /// Amount credited to the landlord (zero when nothing was credited).
    pub amount: Decimal,
    /// False when the bucket had already been released.
    pub released: bool,
    /// Wallet credit reference.
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bucket(months: u32) -> EscrowBalance {
        let mut escrow = EscrowBalance::open(
            UserId::new(),
            ContractId::new(),
            dec!(50000),
            date(2024, 1, 1),
            12,
            Utc::now(),
        );
        for _ in 1..months {
            escrow.accumulate(dec!(50000), Utc::now());
        }
        escrow
    }

    #[test]
    fn test_open_and_accumulate() {
        let escrow = bucket(3);
        assert_eq!(escrow.total_escrowed, dec!(150000));
        assert_eq!(escrow.months_accumulated, 3);
        assert_eq!(escrow.expected_release_date, date(2025, 1, 1));
        assert!(!escrow.is_released);
    }

    #[test]
    fn test_release_after_twelve_months() {
        let policy = EscrowPolicy::default();
        assert_eq!(bucket(11).release_reason(None, date(2024, 6, 1), &policy), None);
        assert_eq!(
            bucket(12).release_reason(None, date(2024, 6, 1), &policy),
            Some(ReleaseReason::MonthsAccumulated)
        );
    }

    #[test]
    fn test_release_after_expiry_grace() {
        let policy = EscrowPolicy::default();
        let escrow = bucket(4);
        let expiry = Some(date(2024, 4, 30));
        assert_eq!(escrow.release_reason(expiry, date(2024, 5, 6), &policy), None);
        assert_eq!(
            escrow.release_reason(expiry, date(2024, 5, 7), &policy),
            Some(ReleaseReason::ContractExpired)
        );

        let no_expiry_release = EscrowPolicy {
            release_on_expiry: false,
            ..policy
        };
        assert_eq!(
            escrow.release_reason(expiry, date(2024, 12, 1), &no_expiry_release),
            None
        );
    }

    #[test]
    fn test_mark_released_snapshots_amount() {
        let mut escrow = bucket(12);
        escrow.mark_released(Utc::now());
        assert!(escrow.is_released);
        assert_eq!(escrow.released_amount, Some(dec!(600000)));
        assert_eq!(
            escrow.release_reason(None, date(2025, 1, 1), &EscrowPolicy::default()),
            None
        );
        assert!(escrow.release_reference().starts_with("escrow_release_"));
    }
}
