//! Property-based tests for due-date arithmetic.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;

use crate::contract::schedule::{days_in_month, next_due_date};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The due date always moves forward by one calendar month.
    #[test]
    fn prop_next_due_moves_exactly_one_month(current in arb_date(), anchor in 1u32..=31) {
        let next = next_due_date(current, anchor);
        let gap = (next - current).num_days();
        prop_assert!(gap > 0);
        prop_assert!(gap <= 62);

        let months = (next.year() - current.year()) * 12
            + i32::try_from(next.month()).unwrap()
            - i32::try_from(current.month()).unwrap();
        prop_assert_eq!(months, 1);
    }

    /// The day of month is the anchor, clamped to the month's length.
    #[test]
    fn prop_next_due_lands_on_clamped_anchor(current in arb_date(), anchor in 1u32..=31) {
        let next = next_due_date(current, anchor);
        prop_assert_eq!(next.day(), anchor.min(days_in_month(next.year(), next.month())));
    }

    /// Twelve advances from the anchor day land on the same day a year later.
    #[test]
    fn prop_twelve_cycles_is_one_year(start in arb_date()) {
        let anchor = start.day();
        let mut due = start;
        for _ in 0..12 {
            due = next_due_date(due, anchor);
        }
        prop_assert_eq!(due, NaiveDate::from_ymd_opt(start.year() + 1, start.month(), anchor).unwrap());
    }
}
