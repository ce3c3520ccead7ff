//! Rent contract domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rentflow_shared::types::{ContractId, PropertyId, UnitId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the landlord receives rent for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutType {
    /// Each payment is credited to the landlord wallet immediately.
    Monthly,
    /// Payments accumulate in escrow and are released periodically.
    Yearly,
}

impl PayoutType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for PayoutType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown payout type: {s}")),
        }
    }
}

/// Contract lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    /// Rent is being collected.
    Active,
    /// `expiry_date` passed without renewal.
    Expired,
    /// Ended by an administrator.
    Terminated,
}

impl ContractStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }

    /// Returns true if payments may still be posted.
    #[must_use]
    pub const fn accepts_payments(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "terminated" => Ok(Self::Terminated),
            _ => Err(format!("Unknown contract status: {s}")),
        }
    }
}

/// One tenant's recurring obligation to one landlord for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentContract {
    /// Contract ID.
    pub id: ContractId,
    /// Paying tenant.
    pub tenant_id: UserId,
    /// Receiving landlord.
    pub landlord_id: UserId,
    /// Property the unit belongs to.
    pub property_id: PropertyId,
    /// Rented unit.
    pub unit_id: UnitId,
    /// Rent per monthly cycle (always positive).
    pub monthly_amount: Decimal,
    /// Last day covered by the contract.
    pub expiry_date: NaiveDate,
    /// Immediate or escrowed payout.
    pub payout_type: PayoutType,
    /// Next unpaid due date. Only advanced by a processed payment.
    pub next_payment_due: NaiveDate,
    /// First due date paid through the system; also the billing anchor day.
    pub transition_start_date: NaiveDate,
    /// Lifecycle status.
    pub status: ContractStatus,
    /// Tenant was already renting before joining the system.
    pub is_existing_tenant: bool,
    /// Expiry date of the pre-existing agreement, for migrated tenants.
    pub original_expiry_date: Option<NaiveDate>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input from the contract-creation collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContractInput {
    /// Paying tenant.
    pub tenant_id: UserId,
    /// Receiving landlord.
    pub landlord_id: UserId,
    /// Property.
    pub property_id: PropertyId,
    /// Unit.
    pub unit_id: UnitId,
    /// Rent per month.
    pub monthly_amount: Decimal,
    /// First due date for a new tenancy.
    pub start_date: NaiveDate,
    /// Contract expiry.
    pub expiry_date: NaiveDate,
    /// Payout preference.
    pub payout_type: PayoutType,
    /// Tenant migrating from an off-platform agreement.
    #[serde(default)]
    pub is_existing_tenant: bool,
    /// For migrated tenants: first due date paid through the system.
    pub transition_start_date: Option<NaiveDate>,
    /// For migrated tenants: expiry of the original agreement.
    pub original_expiry_date: Option<NaiveDate>,
}

/// Filter options for listing contracts.
///
/// All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    /// Filter by status.
    pub status: Option<ContractStatus>,
    /// `next_payment_due` equals this date.
    pub due_on: Option<NaiveDate>,
    /// `next_payment_due` strictly before this date.
    pub due_before: Option<NaiveDate>,
    /// `expiry_date` on or after this date.
    pub expiring_from: Option<NaiveDate>,
    /// `expiry_date` on or before this date.
    pub expiring_to: Option<NaiveDate>,
    /// `expiry_date` strictly before this date.
    pub expired_before: Option<NaiveDate>,
    /// Filter by landlord.
    pub landlord_id: Option<UserId>,
}

impl ContractFilter {
    /// Active contracts only.
    #[must_use]
    pub fn active() -> Self {
        Self {
            status: Some(ContractStatus::Active),
            ..Self::default()
        }
    }

    /// Returns true if `contract` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, contract: &RentContract) -> bool {
        self.status.is_none_or(|s| contract.status == s)
            && self.due_on.is_none_or(|d| contract.next_payment_due == d)
            && self.due_before.is_none_or(|d| contract.next_payment_due < d)
            && self.expiring_from.is_none_or(|d| contract.expiry_date >= d)
            && self.expiring_to.is_none_or(|d| contract.expiry_date <= d)
            && self.expired_before.is_none_or(|d| contract.expiry_date < d)
            && self.landlord_id.is_none_or(|l| contract.landlord_id == l)
    }
}

/// Outstanding rent for a contract at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrears {
    /// Number of unpaid cycles past the grace period.
    pub cycles: u32,
    /// `cycles * monthly_amount`.
    pub amount: Decimal,
    /// Oldest unpaid due date, when in arrears.
    pub oldest_due: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_accepts_payments() {
        assert!(ContractStatus::Active.accepts_payments());
        assert!(!ContractStatus::Expired.accepts_payments());
        assert!(!ContractStatus::Terminated.accepts_payments());
    }

    #[test]
    fn test_enum_string_round_trip() {
        for payout in [PayoutType::Monthly, PayoutType::Yearly] {
            assert_eq!(PayoutType::from_str(payout.as_str()).unwrap(), payout);
        }
        for status in [
            ContractStatus::Active,
            ContractStatus::Expired,
            ContractStatus::Terminated,
        ] {
            assert_eq!(ContractStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(PayoutType::from_str("weekly").is_err());
    }
}
