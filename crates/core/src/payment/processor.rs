//! Payment Processor.
//!
//! `process_payment` is the single place money enters the system. One unit
//! of work locks the contract, routes the amount (wallet credit or escrow
//! accumulation), upserts the payment record and advances the due date.
//! The gateway reference is the idempotency key: a reference whose record
//! is already `paid` returns the original result without touching balances.

use std::sync::Arc;

use rentflow_shared::config::AppConfig;
use rentflow_shared::types::ContractId;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::PaymentError;
use super::types::{
    InitializePaymentInput, InitializedPayment, PaymentMethod, PaymentRecord, PaymentResult,
    PaymentStatus, PayoutRouting, ProcessPaymentInput, StoredAuthorization,
};
use crate::clock::Clock;
use crate::contract::schedule::advance_due_date;
use crate::contract::{PayoutType, RentContract};
use crate::escrow::EscrowBalance;
use crate::gateway::{
    Authorization, ChargeAuthorization, GatewayError, InitializeTransaction, PaymentGateway,
    TransactionStatus, VerifiedTransaction,
};
use crate::notification::NotificationScheduler;
use crate::store::{LedgerStore, LedgerTx, StoreError};
use crate::wallet::{WalletEntry, WalletService};

/// Tunables for payment validation, routing and withdrawals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Largest tolerated difference between paid and monthly amount.
    pub amount_epsilon: Decimal,
    /// Months after which a new escrow bucket is expected to release.
    pub release_months: u32,
    /// Smallest withdrawal.
    pub min_withdrawal: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Redirect after hosted checkout.
    pub callback_url: Option<String>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PaymentSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            amount_epsilon: config.engine.amount_epsilon,
            release_months: config.escrow.release_months,
            min_withdrawal: config.engine.min_withdrawal,
            currency: config.engine.currency.clone(),
            callback_url: config.gateway.callback_url.clone(),
        }
    }
}

/// Posts rent payments and pays out landlord withdrawals.
pub struct PaymentProcessor {
    pub(super) store: Arc<dyn LedgerStore>,
    pub(super) wallet: Arc<WalletService>,
    pub(super) gateway: Arc<dyn PaymentGateway>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) settings: PaymentSettings,
    notifier: Option<Arc<NotificationScheduler>>,
}

impl PaymentProcessor {
    /// Creates a processor.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        wallet: Arc<WalletService>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            store,
            wallet,
            gateway,
            clock,
            settings,
            notifier: None,
        }
    }

    /// Sends a receipt to the tenant after each posted payment.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<NotificationScheduler>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Posts a payment. Re-posting a processed reference returns the first result.
    pub async fn process_payment(
        &self,
        input: ProcessPaymentInput,
    ) -> Result<PaymentResult, PaymentError> {
        if input.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(input.amount));
        }

        let mut tx = self.store.begin().await?;
        let mut contract = tx
            .lock_contract(input.contract_id)
            .await?
            .ok_or(PaymentError::ContractNotFound(input.contract_id))?;

        let existing = tx.payment_by_reference(&input.reference).await?;
        if let Some(record) = &existing {
            if record.contract_id != contract.id {
                return Err(PaymentError::ReferenceMismatch {
                    reference: input.reference,
                    contract_id: record.contract_id,
                });
            }
            if record.status == PaymentStatus::Paid {
                debug!(reference = %input.reference, "Payment already processed");
                return Self::duplicate_result(record);
            }
        }

        if !contract.status.accepts_payments() {
            return Err(PaymentError::ContractNotActive {
                id: contract.id,
                status: contract.status,
            });
        }
        if (input.amount - contract.monthly_amount).abs() > self.settings.amount_epsilon {
            return Err(PaymentError::AmountMismatch {
                expected: contract.monthly_amount,
                received: input.amount,
            });
        }

        let now = self.clock.now();
        let mut record = existing.unwrap_or_else(|| {
            PaymentRecord::pending(&contract, &input.reference, input.payment_method, now)
        });
        let routing = self
            .route(tx.as_mut(), &contract, &record, input.amount)
            .await?;

        let next_due = advance_due_date(&contract);
        record.amount_paid = input.amount;
        record.due_date = contract.next_payment_due;
        record.paid_date = Some(now);
        record.payment_method = input.payment_method;
        record.status = PaymentStatus::Paid;
        record.next_payment_due = Some(next_due);
        record.updated_at = now;
        match routing {
            PayoutRouting::Wallet { transaction_id } => {
                record.wallet_transaction_id = Some(transaction_id);
            }
            PayoutRouting::Escrow { escrow_id } => record.escrow_id = Some(escrow_id),
        }
        tx.save_payment(&record).await?;

        contract.next_payment_due = next_due;
        contract.updated_at = now;
        tx.update_contract(&contract).await?;
        tx.commit().await?;

        info!(
            contract_id = %contract.id,
            reference = %record.reference,
            amount = %input.amount,
            payout = contract.payout_type.as_str(),
            next_payment_due = %next_due,
            "Payment processed"
        );

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier
                .notify_payment_received(&contract, &record.reference, input.amount)
                .await
            {
                warn!(reference = %record.reference, error = %e, "Payment receipt failed");
            }
        }

        Ok(PaymentResult {
            payment_id: record.id,
            contract_id: contract.id,
            reference: record.reference,
            amount: input.amount,
            routing,
            next_payment_due: next_due,
            duplicate: false,
        })
    }

    async fn route(
        &self,
        tx: &mut dyn LedgerTx,
        contract: &RentContract,
        record: &PaymentRecord,
        amount: Decimal,
    ) -> Result<PayoutRouting, PaymentError> {
        let now = self.clock.now();
        match contract.payout_type {
            PayoutType::Monthly => {
                let entry = WalletEntry::new(
                    contract.landlord_id,
                    amount,
                    record.reference.clone(),
                    format!("Rent for {}", contract.next_payment_due),
                )
                .with_payment(record.id)
                .with_metadata(serde_json::json!({
                    "type": "rent_payment",
                    "contract_id": contract.id,
                    "reference": record.reference,
                }));
                let posted = self.wallet.credit_in(tx, entry).await?;
                Ok(PayoutRouting::Wallet {
                    transaction_id: posted.id,
                })
            }
            PayoutType::Yearly => {
                let escrow = if let Some(mut open) = tx.lock_open_escrow(contract.id).await? {
                    open.accumulate(amount, now);
                    tx.update_escrow(&open).await?;
                    open
                } else {
                    let fresh = EscrowBalance::open(
                        contract.landlord_id,
                        contract.id,
                        amount,
                        self.clock.today(),
                        self.settings.release_months,
                        now,
                    );
                    tx.insert_escrow(&fresh).await?;
                    fresh
                };
                debug!(
                    escrow_id = %escrow.id,
                    total = %escrow.total_escrowed,
                    months = escrow.months_accumulated,
                    "Escrow accumulated"
                );
                Ok(PayoutRouting::Escrow {
                    escrow_id: escrow.id,
                })
            }
        }
    }

    fn duplicate_result(record: &PaymentRecord) -> Result<PaymentResult, PaymentError> {
        let routing = record.routing().ok_or_else(|| {
            StoreError::Corrupt(format!("paid payment {} has no routing", record.reference))
        })?;
        Ok(PaymentResult {
            payment_id: record.id,
            contract_id: record.contract_id,
            reference: record.reference.clone(),
            amount: record.amount_paid,
            routing,
            next_payment_due: record.next_payment_due.unwrap_or(record.due_date),
            duplicate: true,
        })
    }

    /// Opens a hosted checkout for the contract's current cycle.
    pub async fn initialize_payment(
        &self,
        input: InitializePaymentInput,
    ) -> Result<InitializedPayment, PaymentError> {
        let contract = self.active_contract(input.contract_id).await?;
        let reference = self.gateway.new_reference("RENT");

        let record = PaymentRecord::pending(
            &contract,
            &reference,
            PaymentMethod::Other,
            self.clock.now(),
        );
        self.store.insert_payment_if_absent(&record).await?;

        let checkout = self
            .gateway
            .initialize_transaction(InitializeTransaction {
                email: input.email,
                amount: contract.monthly_amount,
                reference: reference.clone(),
                callback_url: self.settings.callback_url.clone(),
                metadata: Self::charge_metadata(&contract),
            })
            .await?;

        info!(contract_id = %contract.id, %reference, "Checkout initialized");
        Ok(InitializedPayment {
            authorization_url: checkout.authorization_url,
            access_code: checkout.access_code,
            reference,
            amount: contract.monthly_amount,
        })
    }

    /// Verifies a checkout with the gateway and posts it.
    ///
    /// A reference already posted returns without calling the gateway.
    pub async fn complete_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError> {
        let existing = self.store.find_payment_by_reference(reference).await?;
        if let Some(record) = existing.as_ref().filter(|r| r.status == PaymentStatus::Paid) {
            return Self::duplicate_result(record);
        }

        let verified = self.gateway.verify_transaction(reference).await?;
        let contract_id = existing
            .map(|r| r.contract_id)
            .or_else(|| Self::metadata_contract(&verified.metadata))
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))?;

        self.post_verified(contract_id, verified).await
    }

    /// Charges the tenant's stored card for the current cycle.
    ///
    /// The reference is derived from the contract and its due date, so a
    /// retry for the same cycle settles the earlier charge instead of
    /// taking a second one. Cycles not yet due are refused.
    pub async fn charge_recurring_payment(
        &self,
        contract_id: ContractId,
    ) -> Result<PaymentResult, PaymentError> {
        let contract = self.active_contract(contract_id).await?;
        let auth = self
            .store
            .find_authorization(contract.tenant_id)
            .await?
            .ok_or(PaymentError::NoAuthorization(contract.tenant_id))?;

        if contract.next_payment_due > self.clock.today() {
            return Err(PaymentError::CycleNotDue {
                contract_id: contract.id,
                due: contract.next_payment_due,
            });
        }

        let reference = Self::recurring_reference(&contract);
        let record = PaymentRecord::pending(
            &contract,
            &reference,
            PaymentMethod::Card,
            self.clock.now(),
        );
        if !self.store.insert_payment_if_absent(&record).await? {
            if let Some(verified) = self.earlier_charge(&reference).await? {
                info!(%reference, "Cycle already charged; posting the earlier charge");
                return self.post_verified(contract.id, verified).await;
            }
            debug!(%reference, "Earlier attempt left no successful charge; charging");
        }

        let charged = self
            .gateway
            .charge_authorization(ChargeAuthorization {
                email: auth.email,
                amount: contract.monthly_amount,
                authorization_code: auth.authorization_code,
                reference: reference.clone(),
                metadata: Self::charge_metadata(&contract),
            })
            .await;
        let verified = match charged {
            Ok(verified) => verified,
            Err(e) if e.is_timeout() => {
                warn!(%reference, "Recurring charge timed out; verifying");
                self.gateway.verify_transaction(&reference).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.post_verified(contract.id, verified).await
    }

    /// Successful charge already taken under `reference`, if any.
    async fn earlier_charge(
        &self,
        reference: &str,
    ) -> Result<Option<VerifiedTransaction>, PaymentError> {
        match self.gateway.verify_transaction(reference).await {
            Ok(verified) => match verified.status {
                TransactionStatus::Success => Ok(Some(verified)),
                TransactionStatus::Pending => Err(PaymentError::NotSuccessful {
                    reference: verified.reference,
                    status: "pending".to_string(),
                }),
                _ => Ok(None),
            },
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// One reference per contract and billing cycle.
    fn recurring_reference(contract: &RentContract) -> String {
        format!(
            "RECUR_{}_{}",
            contract.id,
            contract.next_payment_due.format("%Y%m%d")
        )
    }

    async fn post_verified(
        &self,
        contract_id: ContractId,
        verified: VerifiedTransaction,
    ) -> Result<PaymentResult, PaymentError> {
        if verified.status != TransactionStatus::Success {
            return Err(PaymentError::NotSuccessful {
                reference: verified.reference,
                status: format!("{:?}", verified.status).to_lowercase(),
            });
        }

        let result = self
            .process_payment(ProcessPaymentInput {
                contract_id,
                amount: verified.amount,
                payment_method: PaymentMethod::from_channel(&verified.channel),
                reference: verified.reference.clone(),
            })
            .await?;

        if let Some(auth) = verified.authorization.filter(|a| a.reusable) {
            self.save_authorization(contract_id, auth, verified.customer_email)
                .await;
        }
        Ok(result)
    }

    async fn save_authorization(
        &self,
        contract_id: ContractId,
        auth: Authorization,
        email: Option<String>,
    ) {
        let tenant_id = match self.store.find_contract(contract_id).await {
            Ok(Some(contract)) => contract.tenant_id,
            Ok(None) => return,
            Err(e) => {
                warn!(contract_id = %contract_id, error = %e, "Skipping card authorization");
                return;
            }
        };
        let stored = StoredAuthorization {
            tenant_id,
            authorization_code: auth.authorization_code,
            email: email.unwrap_or_default(),
            card_type: auth.card_type,
            last4: auth.last4,
            bank: auth.bank,
            updated_at: self.clock.now(),
        };
        if let Err(e) = self.store.save_authorization(&stored).await {
            warn!(tenant_id = %tenant_id, error = %e, "Failed to store card authorization");
        }
    }

    async fn active_contract(&self, id: ContractId) -> Result<RentContract, PaymentError> {
        let contract = self
            .store
            .find_contract(id)
            .await?
            .ok_or(PaymentError::ContractNotFound(id))?;
        if !contract.status.accepts_payments() {
            return Err(PaymentError::ContractNotActive {
                id,
                status: contract.status,
            });
        }
        Ok(contract)
    }

    fn charge_metadata(contract: &RentContract) -> serde_json::Value {
        serde_json::json!({
            "contract_id": contract.id,
            "tenant_id": contract.tenant_id,
            "payment_type": "rent",
        })
    }

    fn metadata_contract(metadata: &serde_json::Value) -> Option<ContractId> {
        metadata
            .get("contract_id")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}
