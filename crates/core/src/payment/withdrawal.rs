//! Landlord withdrawals.
//!
//! A withdrawal is a three-step saga keyed by one reference:
//!
//! 1. debit the wallet into `pending` (own unit of work, committed);
//! 2. ask the gateway to transfer, outside any unit of work;
//! 3. settle on success, or post a compensating refund on a definitive failure.
//!
//! A timeout is not a failure. The transfer is looked up by reference and
//! the debit stays pending while the outcome is unknown. Retrying with the
//! same reference resumes at step 2; the gateway dedupes transfers by reference.

use rentflow_shared::types::UserId;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::error::PaymentError;
use super::processor::PaymentProcessor;
use super::types::{PayoutAccount, RegisterPayoutAccountInput, WithdrawalResult};
use crate::gateway::{
    AccountDetails, GatewayError, TransferReceipt, TransferRequest, TransferStatus,
};
use crate::wallet::{WalletEntry, WalletTransaction, WalletTransactionStatus, WalletTransactionType};

/// What the gateway told us about a transfer.
enum TransferVerdict {
    Settled(TransferReceipt),
    InFlight(TransferReceipt),
    Failed(String),
    Unknown(GatewayError),
}

impl PaymentProcessor {
    /// Pays `amount` out of the landlord's wallet to their payout account.
    ///
    /// Without a `reference` a fresh `WD_` reference is generated.
    pub async fn process_withdrawal(
        &self,
        landlord_id: UserId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<WithdrawalResult, PaymentError> {
        if amount < self.settings.min_withdrawal {
            return Err(PaymentError::BelowMinimumWithdrawal {
                minimum: self.settings.min_withdrawal,
                requested: amount,
            });
        }
        let account = self
            .store
            .find_payout_account(landlord_id)
            .await?
            .ok_or(PaymentError::NoPayoutAccount(landlord_id))?;
        let reference = reference.unwrap_or_else(|| self.gateway.new_reference("WD"));

        let (debit, resumed) = self
            .hold_funds(landlord_id, amount, &reference, &account)
            .await?;
        if debit.status != WalletTransactionStatus::Pending {
            return Ok(Self::withdrawal_result(&debit, None, true));
        }

        let request = TransferRequest {
            amount: debit.amount,
            recipient_code: account.recipient_code.clone(),
            reason: "Rent payout".to_string(),
            reference: reference.clone(),
        };
        let verdict = match self.gateway.initiate_transfer(request).await {
            Ok(receipt) => Self::verdict(receipt),
            Err(GatewayError::Rejected(reason) | GatewayError::InvalidAmount(reason)) => {
                TransferVerdict::Failed(reason)
            }
            Err(e) => {
                warn!(%reference, error = %e, "Transfer outcome unknown; verifying");
                self.verify_transfer(&reference).await
            }
        };

        match verdict {
            TransferVerdict::Settled(receipt) => {
                let settled = self
                    .settle_transfer(
                        &reference,
                        TransferStatus::Success,
                        Some(&receipt.transfer_code),
                    )
                    .await?;
                let settled = settled.unwrap_or(debit);
                Ok(Self::withdrawal_result(
                    &settled,
                    Some(receipt.transfer_code),
                    resumed,
                ))
            }
            TransferVerdict::InFlight(receipt) => {
                info!(%reference, transfer_code = %receipt.transfer_code, "Transfer pending at gateway");
                Ok(Self::withdrawal_result(
                    &debit,
                    Some(receipt.transfer_code),
                    resumed,
                ))
            }
            TransferVerdict::Failed(reason) => {
                self.compensate(&reference, &reason).await?;
                Err(PaymentError::TransferFailed { reference, reason })
            }
            TransferVerdict::Unknown(e) => {
                warn!(%reference, error = %e, "Transfer unresolved; debit left pending");
                Err(e.into())
            }
        }
    }

    /// Applies a transfer outcome reported later (webhook or reconciliation).
    ///
    /// Returns `None` for a reference with no withdrawal.
    pub async fn settle_transfer(
        &self,
        reference: &str,
        status: TransferStatus,
        transfer_code: Option<&str>,
    ) -> Result<Option<WalletTransaction>, PaymentError> {
        let mut tx = self.store.begin().await?;
        let Some(row) = tx.wallet_transaction_by_reference(reference).await? else {
            warn!(reference, "Transfer event for unknown withdrawal");
            return Ok(None);
        };
        if row.transaction_type != WalletTransactionType::Withdrawal {
            return Ok(None);
        }

        let updated = match status {
            TransferStatus::Success => {
                self.wallet
                    .settle_withdrawal_in(tx.as_mut(), reference, transfer_code)
                    .await?
            }
            TransferStatus::Failed | TransferStatus::Reversed => {
                let reason = if status == TransferStatus::Failed {
                    "transfer failed"
                } else {
                    "transfer reversed"
                };
                self.wallet
                    .reverse_withdrawal_in(tx.as_mut(), reference, reason)
                    .await?;
                tx.wallet_transaction_by_reference(reference)
                    .await?
                    .unwrap_or(row)
            }
            TransferStatus::Pending => row,
        };
        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Resolves a landlord bank account and registers it as the payout recipient.
    pub async fn register_payout_account(
        &self,
        landlord_id: UserId,
        input: RegisterPayoutAccountInput,
    ) -> Result<PayoutAccount, PaymentError> {
        let resolved = self
            .gateway
            .resolve_account_number(&input.account_number, &input.bank_code)
            .await?;
        let recipient = self
            .gateway
            .create_transfer_recipient(AccountDetails {
                account_name: resolved.account_name.clone(),
                account_number: resolved.account_number.clone(),
                bank_code: input.bank_code.clone(),
                currency: self.settings.currency.clone(),
            })
            .await?;

        let account = PayoutAccount {
            landlord_id,
            account_number: resolved.account_number,
            bank_code: input.bank_code,
            account_name: resolved.account_name,
            recipient_code: recipient.recipient_code,
            updated_at: self.clock.now(),
        };
        self.store.save_payout_account(&account).await?;
        info!(landlord_id = %landlord_id, bank_code = %account.bank_code, "Payout account registered");
        Ok(account)
    }

    /// Step 1: moves the amount to pending, or finds the earlier attempt.
    async fn hold_funds(
        &self,
        landlord_id: UserId,
        amount: Decimal,
        reference: &str,
        account: &PayoutAccount,
    ) -> Result<(WalletTransaction, bool), PaymentError> {
        let mut tx = self.store.begin().await?;
        if let Some(existing) = tx.wallet_transaction_by_reference(reference).await? {
            if existing.landlord_id != landlord_id
                || existing.transaction_type != WalletTransactionType::Withdrawal
            {
                return Err(PaymentError::ForeignWithdrawal(reference.to_string()));
            }
            info!(reference, status = existing.status.as_str(), "Resuming withdrawal");
            return Ok((existing, true));
        }

        let entry = WalletEntry::new(
            landlord_id,
            amount,
            reference,
            format!("Withdrawal to {} ({})", account.account_name, account.bank_code),
        )
        .with_metadata(serde_json::json!({
            "type": "withdrawal",
            "recipient_code": account.recipient_code,
        }));
        let debit = self.wallet.withdraw_in(tx.as_mut(), entry).await?;
        tx.commit().await?;
        info!(landlord_id = %landlord_id, reference, %amount, "Withdrawal funds held");
        Ok((debit, false))
    }

    async fn verify_transfer(&self, reference: &str) -> TransferVerdict {
        match self.gateway.verify_transfer(reference).await {
            Ok(receipt) => Self::verdict(receipt),
            Err(GatewayError::NotFound(_)) => {
                TransferVerdict::Failed("transfer not found at gateway".to_string())
            }
            Err(e) => TransferVerdict::Unknown(e),
        }
    }

    fn verdict(receipt: TransferReceipt) -> TransferVerdict {
        match receipt.status {
            TransferStatus::Success => TransferVerdict::Settled(receipt),
            TransferStatus::Pending => TransferVerdict::InFlight(receipt),
            TransferStatus::Failed => TransferVerdict::Failed("transfer failed".to_string()),
            TransferStatus::Reversed => TransferVerdict::Failed("transfer reversed".to_string()),
        }
    }

    async fn compensate(&self, reference: &str, reason: &str) -> Result<(), PaymentError> {
        let mut tx = self.store.begin().await?;
        self.wallet
            .reverse_withdrawal_in(tx.as_mut(), reference, reason)
            .await?;
        tx.commit().await?;
        warn!(reference, reason, "Withdrawal compensated");
        Ok(())
    }

    fn withdrawal_result(
        debit: &WalletTransaction,
        transfer_code: Option<String>,
        duplicate: bool,
    ) -> WithdrawalResult {
        let transfer_code = transfer_code.or_else(|| {
            debit
                .metadata
                .get("transfer_code")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });
        WithdrawalResult {
            reference: debit.reference.clone(),
            transaction_id: debit.id,
            amount: debit.amount,
            status: debit.status,
            transfer_code,
            duplicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::PayoutType;
    use crate::gateway::TransferOutcome;
    use crate::payment::{PaymentMethod, ProcessPaymentInput};
    use crate::payment::testing::{Harness, contract, date, harness};
    use crate::store::LedgerStore;
    use crate::wallet::REVERSAL_SUFFIX;
    use rust_decimal_macros::dec;

    /// A landlord with 50 000 available and a registered payout account.
    async fn funded(h: &Harness) -> UserId {
        let c = contract(h, PayoutType::Monthly, date(2024, 1, 1)).await;
        h.processor
            .process_payment(ProcessPaymentInput {
                contract_id: c.id,
                amount: dec!(50000),
                payment_method: PaymentMethod::Card,
                reference: "RENT_1".into(),
            })
            .await
            .unwrap();
        h.processor
            .register_payout_account(
                c.landlord_id,
                RegisterPayoutAccountInput {
                    account_number: "0123456789".into(),
                    bank_code: "058".into(),
                },
            )
            .await
            .unwrap();
        c.landlord_id
    }

    #[tokio::test]
    async fn test_successful_withdrawal_settles() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;

        let result = h
            .processor
            .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
            .await
            .unwrap();
        assert_eq!(result.status, WalletTransactionStatus::Completed);
        assert!(result.transfer_code.is_some());

        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(40000));
        assert_eq!(balance.pending_balance, dec!(0));
        assert_eq!(balance.total_withdrawn, dec!(10000));
        assert!(h.wallet.verify(landlord).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_rejected_transfer_is_compensated() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;
        h.gateway
            .script_transfer(TransferOutcome::Reject("account closed".into()));

        let err = h
            .processor
            .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "TRANSFER_FAILED");

        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(50000));
        assert_eq!(balance.pending_balance, dec!(0));

        let ledger = h.store.wallet_ledger(landlord).await.unwrap();
        let debit = ledger.iter().find(|t| t.reference == "WD_1").unwrap();
        assert_eq!(debit.status, WalletTransactionStatus::Failed);
        let refunds: Vec<_> = ledger
            .iter()
            .filter(|t| t.reference == format!("WD_1{REVERSAL_SUFFIX}"))
            .collect();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].transaction_type, WalletTransactionType::Refund);
        assert!(h.wallet.verify(landlord).await.unwrap().is_ok());

        // Retrying the same reference does not debit again.
        let again = h
            .processor
            .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
            .await
            .unwrap();
        assert!(again.duplicate);
        assert_eq!(again.status, WalletTransactionStatus::Failed);
        assert_eq!(h.store.wallet_ledger(landlord).await.unwrap().len(), ledger.len());
    }

    #[tokio::test]
    async fn test_timeout_that_landed_is_settled_not_refunded() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;
        h.gateway.script_transfer(TransferOutcome::Timeout {
            landed: Some(TransferStatus::Success),
        });

        let result = h
            .processor
            .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
            .await
            .unwrap();
        assert_eq!(result.status, WalletTransactionStatus::Completed);
        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(40000));
        assert_eq!(balance.total_withdrawn, dec!(10000));
    }

    #[tokio::test]
    async fn test_timeout_that_never_landed_is_refunded() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;
        h.gateway
            .script_transfer(TransferOutcome::Timeout { landed: None });

        assert!(
            h.processor
                .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
                .await
                .is_err()
        );
        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(50000));
        assert_eq!(balance.pending_balance, dec!(0));
    }

    #[tokio::test]
    async fn test_pending_transfer_settles_by_event() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;
        h.gateway
            .script_transfer(TransferOutcome::Accept(TransferStatus::Pending));

        let result = h
            .processor
            .process_withdrawal(landlord, dec!(10000), Some("WD_1".into()))
            .await
            .unwrap();
        assert_eq!(result.status, WalletTransactionStatus::Pending);
        assert_eq!(
            h.wallet.get_balance(landlord).await.unwrap().pending_balance,
            dec!(10000)
        );

        let settled = h
            .processor
            .settle_transfer("WD_1", TransferStatus::Success, Some("TRF_9"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, WalletTransactionStatus::Completed);
        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.pending_balance, dec!(0));
        assert_eq!(balance.total_withdrawn, dec!(10000));

        // Late reversal after payout puts the money back.
        h.processor
            .settle_transfer("WD_1", TransferStatus::Reversed, None)
            .await
            .unwrap();
        let balance = h.wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(50000));
        assert_eq!(balance.total_withdrawn, dec!(0));
        assert!(h.wallet.verify(landlord).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_withdrawal_preconditions() {
        let h = harness(date(2024, 1, 1));
        let landlord = funded(&h).await;

        let err = h
            .processor
            .process_withdrawal(landlord, dec!(500), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "BELOW_MINIMUM_WITHDRAWAL");

        let err = h
            .processor
            .process_withdrawal(landlord, dec!(60000), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert!(h.gateway.transfer_requests().is_empty());

        let err = h
            .processor
            .process_withdrawal(UserId::new(), dec!(5000), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_PAYOUT_ACCOUNT");
    }

    #[tokio::test]
    async fn test_unknown_transfer_event_is_ignored() {
        let h = harness(date(2024, 1, 1));
        assert!(
            h.processor
                .settle_transfer("WD_missing", TransferStatus::Success, None)
                .await
                .unwrap()
                .is_none()
        );
    }
}
