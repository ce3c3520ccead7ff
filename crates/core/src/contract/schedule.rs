//! Due-date arithmetic.
//!
//! Due dates move by calendar months anchored to the contract's billing day:
//! a contract billed on the 31st falls due on Feb 29 in a leap year and on
//! Mar 31 afterwards, never drifting to the 29th.

use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::Decimal;

use super::types::{Arrears, RentContract};

/// Number of days in the given month.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

/// The due date one calendar month after `current`, on `anchor_day` clamped
/// to the length of the target month.
#[must_use]
pub fn next_due_date(current: NaiveDate, anchor_day: u32) -> NaiveDate {
    let (year, month) = if current.month() == 12 {
        (current.year() + 1, 1)
    } else {
        (current.year(), current.month() + 1)
    };
    let day = anchor_day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(current)
}

/// Advances a contract's `next_payment_due` by exactly one cycle.
#[must_use]
pub fn advance_due_date(contract: &RentContract) -> NaiveDate {
    next_due_date(
        contract.next_payment_due,
        contract.transition_start_date.day(),
    )
}

/// `date` plus `months` calendar months, clamped to month end.
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Whole days between the due date and `today`; negative when not yet due.
#[must_use]
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days()
}

/// Unpaid cycles whose due date is more than `grace_days` in the past.
///
/// Cycles start at `next_payment_due` and stop at the contract's expiry.
#[must_use]
pub fn arrears(contract: &RentContract, today: NaiveDate, grace_days: u32) -> Arrears {
    let cutoff = today - Duration::days(i64::from(grace_days));
    let anchor = contract.transition_start_date.day();

    let mut cycles: u32 = 0;
    let mut due = contract.next_payment_due;
    while due < cutoff && due <= contract.expiry_date {
        cycles += 1;
        due = next_due_date(due, anchor);
    }

    Arrears {
        cycles,
        amount: contract.monthly_amount * Decimal::from(cycles),
        oldest_due: (cycles > 0).then_some(contract.next_payment_due),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::types::{ContractStatus, PayoutType};
    use chrono::Utc;
    use rentflow_shared::types::{ContractId, PropertyId, UnitId, UserId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(next_due: NaiveDate, expiry: NaiveDate) -> RentContract {
        RentContract {
            id: ContractId::new(),
            tenant_id: UserId::new(),
            landlord_id: UserId::new(),
            property_id: PropertyId::new(),
            unit_id: UnitId::new(),
            monthly_amount: dec!(50000),
            expiry_date: expiry,
            payout_type: PayoutType::Monthly,
            next_payment_due: next_due,
            transition_start_date: next_due,
            status: ContractStatus::Active,
            is_existing_tenant: false,
            original_expiry_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(2024, 2, 29)]
    #[case(2023, 2, 28)]
    #[case(2024, 4, 30)]
    #[case(2024, 12, 31)]
    fn test_days_in_month(#[case] year: i32, #[case] month: u32, #[case] expected: u32) {
        assert_eq!(days_in_month(year, month), expected);
    }

    #[rstest]
    #[case(date(2024, 1, 1), 1, date(2024, 2, 1))]
    #[case(date(2024, 1, 31), 31, date(2024, 2, 29))]
    #[case(date(2024, 2, 29), 31, date(2024, 3, 31))]
    #[case(date(2023, 1, 30), 30, date(2023, 2, 28))]
    #[case(date(2024, 12, 15), 15, date(2025, 1, 15))]
    fn test_next_due_date(
        #[case] current: NaiveDate,
        #[case] anchor: u32,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(next_due_date(current, anchor), expected);
    }

    #[test]
    fn test_add_months_clamps() {
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(add_months(date(2024, 1, 1), 12), date(2025, 1, 1));
    }

    #[test]
    fn test_days_overdue() {
        assert_eq!(days_overdue(date(2024, 1, 1), date(2024, 1, 6)), 5);
        assert_eq!(days_overdue(date(2024, 1, 6), date(2024, 1, 1)), -5);
    }

    #[test]
    fn test_arrears_counts_unpaid_cycles() {
        let c = contract(date(2024, 1, 1), date(2024, 12, 31));
        let result = arrears(&c, date(2024, 3, 15), 0);
        assert_eq!(result.cycles, 3);
        assert_eq!(result.amount, dec!(150000));
        assert_eq!(result.oldest_due, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_arrears_respects_grace_and_expiry() {
        let c = contract(date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(arrears(&c, date(2024, 1, 3), 5).cycles, 0);
        // Only the January cycle falls inside the contract.
        assert_eq!(arrears(&c, date(2024, 6, 1), 0).cycles, 1);
    }

    #[test]
    fn test_no_arrears_when_current() {
        let c = contract(date(2024, 2, 1), date(2024, 12, 31));
        let result = arrears(&c, date(2024, 1, 20), 0);
        assert_eq!(result.cycles, 0);
        assert_eq!(result.amount, dec!(0));
        assert!(result.oldest_due.is_none());
    }
}
