//! In-process gateway for local runs and tests.
//!
//! Checkouts stay `pending` until [`SandboxGateway::complete_checkout`] is
//! called. Transfers succeed unless an outcome was scripted with
//! [`SandboxGateway::script_transfer`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::{
    AccountDetails, Authorization, ChargeAuthorization, GatewayError, InitializeTransaction,
    InitializedTransaction, PaymentGateway, ResolvedAccount, TransactionStatus, TransferReceipt,
    TransferRecipient, TransferRequest, TransferStatus, VerifiedTransaction,
};

/// Scripted result for the next `initiate_transfer` call.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// Accepted with the given status.
    Accept(TransferStatus),
    /// Declined.
    Reject(String),
    /// Network failure before the processor saw the request.
    Unavailable,
    /// Timed out. `landed` is what the processor actually recorded, if anything.
    Timeout {
        /// Status visible to a later `verify_transfer`.
        landed: Option<TransferStatus>,
    },
}

#[derive(Debug, Default)]
struct SandboxState {
    transactions: HashMap<String, VerifiedTransaction>,
    transfers: HashMap<String, TransferReceipt>,
    transfer_script: VecDeque<TransferOutcome>,
    verify_failures: VecDeque<GatewayError>,
    accounts: HashMap<(String, String), String>,
    transfer_requests: Vec<TransferRequest>,
    charges: Vec<ChargeAuthorization>,
}

/// Deterministic [`PaymentGateway`].
#[derive(Debug, Default)]
pub struct SandboxGateway {
    state: Mutex<SandboxState>,
    counter: AtomicU64,
}

impl SandboxGateway {
    /// Creates an empty sandbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Marks a checkout as paid through `channel`.
    pub fn complete_checkout(&self, reference: &str, channel: &str) -> Result<(), GatewayError> {
        let code = format!("AUTH_{}", self.next());
        let mut state = self.state();
        let txn = state
            .transactions
            .get_mut(reference)
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))?;
        txn.status = TransactionStatus::Success;
        txn.channel = channel.to_string();
        if channel == "card" {
            txn.authorization = Some(Authorization {
                authorization_code: code,
                reusable: true,
                card_type: Some("visa".to_string()),
                last4: Some("4081".to_string()),
                bank: Some("Sandbox Bank".to_string()),
            });
        }
        Ok(())
    }

    /// Queues an outcome for the next transfer request.
    pub fn script_transfer(&self, outcome: TransferOutcome) {
        self.state().transfer_script.push_back(outcome);
    }

    /// Makes the next `verify_transaction` call fail.
    pub fn fail_next_verification(&self, error: GatewayError) {
        self.state().verify_failures.push_back(error);
    }

    /// Registers a resolvable bank account.
    pub fn add_account(&self, account_number: &str, bank_code: &str, name: &str) {
        self.state().accounts.insert(
            (account_number.to_string(), bank_code.to_string()),
            name.to_string(),
        );
    }

    /// Every card charge received so far.
    #[must_use]
    pub fn charges(&self) -> Vec<ChargeAuthorization> {
        self.state().charges.clone()
    }

    /// Every transfer request received so far.
    #[must_use]
    pub fn transfer_requests(&self) -> Vec<TransferRequest> {
        self.state().transfer_requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    fn new_reference(&self, prefix: &str) -> String {
        format!(
            "{}_{}_{:06}",
            prefix.to_uppercase(),
            Utc::now().timestamp_millis(),
            self.next()
        )
    }

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayError> {
        if request.amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidAmount(request.amount.to_string()));
        }
        let access_code = format!("sandbox_{}", self.next());
        self.state().transactions.insert(
            request.reference.clone(),
            VerifiedTransaction {
                reference: request.reference.clone(),
                status: TransactionStatus::Pending,
                amount: request.amount,
                channel: String::new(),
                customer_email: Some(request.email),
                authorization: None,
                metadata: request.metadata,
            },
        );
        Ok(InitializedTransaction {
            authorization_url: format!("https://checkout.sandbox.local/{access_code}"),
            access_code,
            reference: request.reference,
        })
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, GatewayError> {
        let mut state = self.state();
        if let Some(error) = state.verify_failures.pop_front() {
            return Err(error);
        }
        state
            .transactions
            .get(reference)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))
    }

    async fn charge_authorization(
        &self,
        request: ChargeAuthorization,
    ) -> Result<VerifiedTransaction, GatewayError> {
        if request.authorization_code.is_empty() {
            return Err(GatewayError::Rejected("missing authorization".to_string()));
        }
        let txn = VerifiedTransaction {
            reference: request.reference.clone(),
            status: TransactionStatus::Success,
            amount: request.amount,
            channel: "card".to_string(),
            customer_email: Some(request.email.clone()),
            authorization: Some(Authorization {
                authorization_code: request.authorization_code.clone(),
                reusable: true,
                card_type: None,
                last4: None,
                bank: None,
            }),
            metadata: request.metadata.clone(),
        };
        let mut state = self.state();
        state.charges.push(request.clone());
        state.transactions.insert(request.reference, txn.clone());
        Ok(txn)
    }

    async fn initiate_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferReceipt, GatewayError> {
        let code = format!("TRF_{}", self.next());
        let mut state = self.state();
        state.transfer_requests.push(request.clone());
        if let Some(existing) = state.transfers.get(&request.reference) {
            return Ok(existing.clone());
        }

        let outcome = state
            .transfer_script
            .pop_front()
            .unwrap_or(TransferOutcome::Accept(TransferStatus::Success));
        let receipt = |status| TransferReceipt {
            reference: request.reference.clone(),
            transfer_code: code.clone(),
            status,
        };
        match outcome {
            TransferOutcome::Accept(status) => {
                let r = receipt(status);
                state.transfers.insert(request.reference.clone(), r.clone());
                Ok(r)
            }
            TransferOutcome::Reject(reason) => Err(GatewayError::Rejected(reason)),
            TransferOutcome::Unavailable => {
                Err(GatewayError::Unavailable("sandbox offline".to_string()))
            }
            TransferOutcome::Timeout { landed } => {
                if let Some(status) = landed {
                    state
                        .transfers
                        .insert(request.reference.clone(), receipt(status));
                }
                Err(GatewayError::Timeout(request.reference.clone()))
            }
        }
    }

    async fn verify_transfer(&self, reference: &str) -> Result<TransferReceipt, GatewayError> {
        self.state()
            .transfers
            .get(reference)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))
    }

    async fn create_transfer_recipient(
        &self,
        details: AccountDetails,
    ) -> Result<TransferRecipient, GatewayError> {
        Ok(TransferRecipient {
            recipient_code: format!("RCP_{}", self.next()),
            account_name: details.account_name,
        })
    }

    async fn resolve_account_number(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount, GatewayError> {
        if account_number.len() != 10 || !account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(GatewayError::Rejected(format!(
                "Could not resolve account {account_number}"
            )));
        }
        let name = self
            .state()
            .accounts
            .get(&(account_number.to_string(), bank_code.to_string()))
            .cloned()
            .unwrap_or_else(|| "Sandbox Account".to_string());
        Ok(ResolvedAccount {
            account_number: account_number.to_string(),
            account_name: name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transfer(reference: &str) -> TransferRequest {
        TransferRequest {
            amount: dec!(10000),
            recipient_code: "RCP_1".into(),
            reason: "payout".into(),
            reference: reference.into(),
        }
    }

    #[tokio::test]
    async fn test_checkout_flow() {
        let gateway = SandboxGateway::new();
        let reference = gateway.new_reference("rent");
        assert!(reference.starts_with("RENT_"));

        gateway
            .initialize_transaction(InitializeTransaction {
                email: "t@example.com".into(),
                amount: dec!(50000),
                reference: reference.clone(),
                callback_url: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        let pending = gateway.verify_transaction(&reference).await.unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);

        gateway.complete_checkout(&reference, "card").unwrap();
        let paid = gateway.verify_transaction(&reference).await.unwrap();
        assert_eq!(paid.status, TransactionStatus::Success);
        assert!(paid.authorization.unwrap().reusable);
    }

    #[tokio::test]
    async fn test_transfer_timeout_lands_for_verification() {
        let gateway = SandboxGateway::new();
        gateway.script_transfer(TransferOutcome::Timeout {
            landed: Some(TransferStatus::Success),
        });
        let err = gateway.initiate_transfer(transfer("WD_1")).await.unwrap_err();
        assert!(err.is_timeout());
        let receipt = gateway.verify_transfer("WD_1").await.unwrap();
        assert_eq!(receipt.status, TransferStatus::Success);
    }

    #[tokio::test]
    async fn test_duplicate_transfer_reference_returns_existing() {
        let gateway = SandboxGateway::new();
        let first = gateway.initiate_transfer(transfer("WD_2")).await.unwrap();
        gateway.script_transfer(TransferOutcome::Reject("no".into()));
        let second = gateway.initiate_transfer(transfer("WD_2")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.transfer_requests().len(), 2);
    }
}
