//! Property-based tests for wallet ledger integrity.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rentflow_shared::types::UserId;
use rust_decimal::Decimal;

use crate::clock::FixedClock;
use crate::store::{InMemoryLedgerStore, LedgerStore};
use crate::wallet::{WalletEntry, WalletService};

#[derive(Debug, Clone)]
enum Op {
    Credit(u32),
    Debit(u32),
    Withdraw(u32),
    Settle,
    Reverse,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u32..100_000).prop_map(Op::Credit),
        1 => (1u32..100_000).prop_map(Op::Debit),
        2 => (1u32..100_000).prop_map(Op::Withdraw),
        1 => Just(Op::Settle),
        1 => Just(Op::Reverse),
    ]
}

async fn replay(ops: Vec<Op>) -> (Decimal, Decimal, bool) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let wallet = WalletService::new(store.clone(), clock);
    let landlord = UserId::new();
    let mut open_withdrawals: Vec<String> = Vec::new();

    for (i, op) in ops.into_iter().enumerate() {
        let reference = format!("OP{i}");
        match op {
            Op::Credit(n) => {
                let _ = wallet
                    .credit(WalletEntry::new(landlord, Decimal::from(n), reference, "credit"))
                    .await;
            }
            Op::Debit(n) => {
                let _ = wallet
                    .debit(WalletEntry::new(landlord, Decimal::from(n), reference, "debit"))
                    .await;
            }
            Op::Withdraw(n) => {
                let mut tx = store.begin().await.unwrap();
                let entry = WalletEntry::new(landlord, Decimal::from(n), reference.clone(), "wd");
                if wallet.withdraw_in(tx.as_mut(), entry).await.is_ok() {
                    tx.commit().await.unwrap();
                    open_withdrawals.push(reference);
                }
            }
            Op::Settle => {
                if let Some(reference) = open_withdrawals.pop() {
                    let mut tx = store.begin().await.unwrap();
                    wallet
                        .settle_withdrawal_in(tx.as_mut(), &reference, None)
                        .await
                        .unwrap();
                    tx.commit().await.unwrap();
                }
            }
            Op::Reverse => {
                if let Some(reference) = open_withdrawals.pop() {
                    let mut tx = store.begin().await.unwrap();
                    wallet
                        .reverse_withdrawal_in(tx.as_mut(), &reference, "failed")
                        .await
                        .unwrap();
                    tx.commit().await.unwrap();
                }
            }
        }
    }

    let balance = wallet.get_balance(landlord).await.unwrap();
    let consistent = wallet.verify(landlord).await.unwrap().is_ok();
    (balance.available_balance, balance.pending_balance, consistent)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replaying the ledger always reproduces the stored balances, and the
    /// available balance never goes negative.
    #[test]
    fn prop_ledger_replay_matches_balance(ops in prop::collection::vec(arb_op(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (available, pending, consistent) = rt.block_on(replay(ops));
        prop_assert!(consistent);
        prop_assert!(available >= Decimal::ZERO);
        prop_assert!(pending >= Decimal::ZERO);
    }
}
