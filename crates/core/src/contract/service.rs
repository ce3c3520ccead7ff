//! Contract lifecycle: creation, expiry, termination and arrears.
//!
//! `status` is written only here. `next_payment_due` is written only by the
//! payment processor.

use std::sync::Arc;

use rentflow_shared::types::ContractId;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::ContractError;
use super::schedule;
use super::types::{Arrears, ContractFilter, ContractStatus, CreateContractInput, RentContract};
use crate::clock::Clock;
use crate::jobs::BatchReport;
use crate::store::LedgerStore;

/// Contract lifecycle service.
pub struct ContractService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    overdue_grace_days: u32,
}

impl ContractService {
    /// Creates a service with no overdue grace period.
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            overdue_grace_days: 0,
        }
    }

    /// Sets the grace period used for arrears.
    #[must_use]
    pub fn with_grace_days(mut self, days: u32) -> Self {
        self.overdue_grace_days = days;
        self
    }

    /// Registers a finalized tenancy as an active contract.
    ///
    /// Migrated tenants start paying on `transition_start_date`; new tenants
    /// on `start_date`. The first due date is also the billing anchor.
    pub async fn create_contract(
        &self,
        input: CreateContractInput,
    ) -> Result<RentContract, ContractError> {
        if input.monthly_amount <= Decimal::ZERO {
            return Err(ContractError::InvalidAmount(input.monthly_amount));
        }

        let first_due = if input.is_existing_tenant {
            input
                .transition_start_date
                .ok_or(ContractError::MissingTransitionDate)?
        } else {
            input.start_date
        };
        if input.expiry_date <= first_due {
            return Err(ContractError::InvalidDates {
                first_due,
                expiry_date: input.expiry_date,
            });
        }

        let now = self.clock.now();
        let contract = RentContract {
            id: ContractId::new(),
            tenant_id: input.tenant_id,
            landlord_id: input.landlord_id,
            property_id: input.property_id,
            unit_id: input.unit_id,
            monthly_amount: input.monthly_amount,
            expiry_date: input.expiry_date,
            payout_type: input.payout_type,
            next_payment_due: first_due,
            transition_start_date: first_due,
            status: ContractStatus::Active,
            is_existing_tenant: input.is_existing_tenant,
            original_expiry_date: input
                .is_existing_tenant
                .then_some(input.original_expiry_date)
                .flatten(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_contract(&contract).await?;

        info!(
            contract_id = %contract.id,
            landlord_id = %contract.landlord_id,
            payout_type = contract.payout_type.as_str(),
            first_due = %first_due,
            "Contract created"
        );
        Ok(contract)
    }

    /// Fetches a contract.
    pub async fn get_contract(&self, id: ContractId) -> Result<RentContract, ContractError> {
        self.store
            .find_contract(id)
            .await?
            .ok_or(ContractError::NotFound(id))
    }

    /// Moves every active contract whose expiry date has passed to `expired`.
    pub async fn expire_contracts(&self) -> Result<BatchReport, ContractError> {
        let today = self.clock.today();
        let candidates = self
            .store
            .list_contracts(&ContractFilter {
                status: Some(ContractStatus::Active),
                expired_before: Some(today),
                ..ContractFilter::default()
            })
            .await?;

        let mut report = BatchReport::new();
        for candidate in candidates {
            match self.expire_one(candidate.id, today).await {
                Ok(true) => report.succeeded(),
                Ok(false) => report.skipped(),
                Err(e) => {
                    warn!(contract_id = %candidate.id, error = %e, "Failed to expire contract");
                    report.failed(candidate.id, e);
                }
            }
        }
        Ok(report)
    }

    async fn expire_one(
        &self,
        id: ContractId,
        today: chrono::NaiveDate,
    ) -> Result<bool, ContractError> {
        let mut tx = self.store.begin().await?;
        let Some(mut contract) = tx.lock_contract(id).await? else {
            return Ok(false);
        };
        if contract.status != ContractStatus::Active || contract.expiry_date >= today {
            return Ok(false);
        }
        contract.status = ContractStatus::Expired;
        contract.updated_at = self.clock.now();
        tx.update_contract(&contract).await?;
        tx.commit().await?;

        info!(contract_id = %id, expiry_date = %contract.expiry_date, "Contract expired");
        Ok(true)
    }

    /// Administrative termination. Terminating twice is a no-op.
    pub async fn terminate_contract(&self, id: ContractId) -> Result<RentContract, ContractError> {
        let mut tx = self.store.begin().await?;
        let mut contract = tx
            .lock_contract(id)
            .await?
            .ok_or(ContractError::NotFound(id))?;

        match contract.status {
            ContractStatus::Terminated => {
                debug!(contract_id = %id, "Contract already terminated");
                return Ok(contract);
            }
            ContractStatus::Expired => {
                return Err(ContractError::NotActive {
                    id,
                    status: contract.status,
                });
            }
            ContractStatus::Active => {}
        }

        contract.status = ContractStatus::Terminated;
        contract.updated_at = self.clock.now();
        tx.update_contract(&contract).await?;
        tx.commit().await?;

        info!(contract_id = %id, "Contract terminated");
        Ok(contract)
    }

    /// Outstanding rent as of today.
    pub async fn arrears(&self, id: ContractId) -> Result<Arrears, ContractError> {
        let contract = self.get_contract(id).await?;
        Ok(schedule::arrears(
            &contract,
            self.clock.today(),
            self.overdue_grace_days,
        ))
    }
}
