//! Row <-> domain conversions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rentflow_core::contract::RentContract;
use rentflow_core::escrow::EscrowBalance;
use rentflow_core::notification::{PaymentNotification, Recipient};
use rentflow_core::payment::{PaymentRecord, PayoutAccount, StoredAuthorization};
use rentflow_core::store::StoreError;
use rentflow_core::wallet::{WalletBalance, WalletTransaction};
use rentflow_shared::types::{
    ContractId, EscrowId, NotificationId, PaymentId, PropertyId, UnitId, UserId,
    WalletTransactionId,
};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{
    escrow_balances, notification_recipients, payment_authorizations, payment_notifications,
    payment_records, payout_accounts, rent_contracts, wallet_balances, wallet_transactions,
};

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T, StoreError> {
    value.parse().map_err(StoreError::Corrupt)
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn tz(value: DateTime<Utc>) -> DateTimeWithTimeZone {
    value.into()
}

// ---- contracts ----

impl TryFrom<rent_contracts::Model> for RentContract {
    type Error = StoreError;

    fn try_from(row: rent_contracts::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContractId::from_uuid(row.id),
            tenant_id: UserId::from_uuid(row.tenant_id),
            landlord_id: UserId::from_uuid(row.landlord_id),
            property_id: PropertyId::from_uuid(row.property_id),
            unit_id: UnitId::from_uuid(row.unit_id),
            monthly_amount: row.monthly_amount,
            expiry_date: row.expiry_date,
            payout_type: parse(&row.payout_type)?,
            next_payment_due: row.next_payment_due,
            transition_start_date: row.transition_start_date,
            status: parse(&row.status)?,
            is_existing_tenant: row.is_existing_tenant,
            original_expiry_date: row.original_expiry_date,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        })
    }
}

impl From<&RentContract> for rent_contracts::ActiveModel {
    fn from(c: &RentContract) -> Self {
        Self {
            id: Set(c.id.into_inner()),
            tenant_id: Set(c.tenant_id.into_inner()),
            landlord_id: Set(c.landlord_id.into_inner()),
            property_id: Set(c.property_id.into_inner()),
            unit_id: Set(c.unit_id.into_inner()),
            monthly_amount: Set(c.monthly_amount),
            expiry_date: Set(c.expiry_date),
            payout_type: Set(c.payout_type.as_str().to_string()),
            next_payment_due: Set(c.next_payment_due),
            transition_start_date: Set(c.transition_start_date),
            status: Set(c.status.as_str().to_string()),
            is_existing_tenant: Set(c.is_existing_tenant),
            original_expiry_date: Set(c.original_expiry_date),
            created_at: Set(tz(c.created_at)),
            updated_at: Set(tz(c.updated_at)),
        }
    }
}

// ---- escrow ----

impl TryFrom<escrow_balances::Model> for EscrowBalance {
    type Error = StoreError;

    fn try_from(row: escrow_balances::Model) -> Result<Self, Self::Error> {
        let months_accumulated = u32::try_from(row.months_accumulated).map_err(|_| {
            StoreError::Corrupt(format!(
                "escrow {} months_accumulated = {}",
                row.id, row.months_accumulated
            ))
        })?;
        Ok(Self {
            id: EscrowId::from_uuid(row.id),
            landlord_id: UserId::from_uuid(row.landlord_id),
            contract_id: ContractId::from_uuid(row.contract_id),
            total_escrowed: row.total_escrowed,
            months_accumulated,
            expected_release_date: row.expected_release_date,
            is_released: row.is_released,
            released_at: row.released_at.map(utc),
            released_amount: row.released_amount,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        })
    }
}

impl TryFrom<&EscrowBalance> for escrow_balances::ActiveModel {
    type Error = StoreError;

    fn try_from(e: &EscrowBalance) -> Result<Self, Self::Error> {
        let months_accumulated = i32::try_from(e.months_accumulated)
            .map_err(|_| StoreError::Database(format!("escrow {} months overflow", e.id)))?;
        Ok(Self {
            id: Set(e.id.into_inner()),
            landlord_id: Set(e.landlord_id.into_inner()),
            contract_id: Set(e.contract_id.into_inner()),
            total_escrowed: Set(e.total_escrowed),
            months_accumulated: Set(months_accumulated),
            expected_release_date: Set(e.expected_release_date),
            is_released: Set(e.is_released),
            released_at: Set(e.released_at.map(tz)),
            released_amount: Set(e.released_amount),
            created_at: Set(tz(e.created_at)),
            updated_at: Set(tz(e.updated_at)),
        })
    }
}

// ---- wallet ----

impl From<wallet_balances::Model> for WalletBalance {
    fn from(row: wallet_balances::Model) -> Self {
        Self {
            landlord_id: UserId::from_uuid(row.landlord_id),
            available_balance: row.available_balance,
            pending_balance: row.pending_balance,
            total_earned: row.total_earned,
            total_withdrawn: row.total_withdrawn,
            currency: row.currency,
            version: row.version,
            updated_at: utc(row.updated_at),
        }
    }
}

impl From<&WalletBalance> for wallet_balances::ActiveModel {
    fn from(w: &WalletBalance) -> Self {
        Self {
            landlord_id: Set(w.landlord_id.into_inner()),
            available_balance: Set(w.available_balance),
            pending_balance: Set(w.pending_balance),
            total_earned: Set(w.total_earned),
            total_withdrawn: Set(w.total_withdrawn),
            currency: Set(w.currency.clone()),
            version: Set(w.version),
            updated_at: Set(tz(w.updated_at)),
        }
    }
}

impl TryFrom<wallet_transactions::Model> for WalletTransaction {
    type Error = StoreError;

    fn try_from(row: wallet_transactions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: WalletTransactionId::from_uuid(row.id),
            landlord_id: UserId::from_uuid(row.landlord_id),
            transaction_type: parse(&row.transaction_type)?,
            amount: row.amount,
            balance_before: row.balance_before,
            balance_after: row.balance_after,
            reference: row.reference,
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            status: parse(&row.status)?,
            description: row.description,
            metadata: row.metadata,
            sequence: row.sequence,
            created_at: utc(row.created_at),
        })
    }
}

impl From<&WalletTransaction> for wallet_transactions::ActiveModel {
    fn from(t: &WalletTransaction) -> Self {
        Self {
            id: Set(t.id.into_inner()),
            landlord_id: Set(t.landlord_id.into_inner()),
            transaction_type: Set(t.transaction_type.as_str().to_string()),
            amount: Set(t.amount),
            balance_before: Set(t.balance_before),
            balance_after: Set(t.balance_after),
            reference: Set(t.reference.clone()),
            payment_id: Set(t.payment_id.map(PaymentId::into_inner)),
            status: Set(t.status.as_str().to_string()),
            description: Set(t.description.clone()),
            metadata: Set(t.metadata.clone()),
            sequence: Set(t.sequence),
            created_at: Set(tz(t.created_at)),
        }
    }
}

// ---- payments ----

impl TryFrom<payment_records::Model> for PaymentRecord {
    type Error = StoreError;

    fn try_from(row: payment_records::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            contract_id: ContractId::from_uuid(row.contract_id),
            landlord_id: UserId::from_uuid(row.landlord_id),
            tenant_id: UserId::from_uuid(row.tenant_id),
            property_id: PropertyId::from_uuid(row.property_id),
            unit_id: UnitId::from_uuid(row.unit_id),
            amount: row.amount,
            amount_paid: row.amount_paid,
            due_date: row.due_date,
            paid_date: row.paid_date.map(utc),
            payment_type: row.payment_type,
            payment_method: parse(&row.payment_method)?,
            status: parse(&row.status)?,
            reference: row.reference,
            description: row.description,
            notes: row.notes,
            wallet_transaction_id: row.wallet_transaction_id.map(WalletTransactionId::from_uuid),
            escrow_id: row.escrow_id.map(EscrowId::from_uuid),
            next_payment_due: row.next_payment_due,
            created_at: utc(row.created_at),
            updated_at: utc(row.updated_at),
        })
    }
}

impl From<&PaymentRecord> for payment_records::ActiveModel {
    fn from(p: &PaymentRecord) -> Self {
        Self {
            id: Set(p.id.into_inner()),
            contract_id: Set(p.contract_id.into_inner()),
            landlord_id: Set(p.landlord_id.into_inner()),
            tenant_id: Set(p.tenant_id.into_inner()),
            property_id: Set(p.property_id.into_inner()),
            unit_id: Set(p.unit_id.into_inner()),
            amount: Set(p.amount),
            amount_paid: Set(p.amount_paid),
            due_date: Set(p.due_date),
            paid_date: Set(p.paid_date.map(tz)),
            payment_type: Set(p.payment_type.clone()),
            payment_method: Set(p.payment_method.as_str().to_string()),
            status: Set(p.status.as_str().to_string()),
            reference: Set(p.reference.clone()),
            description: Set(p.description.clone()),
            notes: Set(p.notes.clone()),
            wallet_transaction_id: Set(p.wallet_transaction_id.map(WalletTransactionId::into_inner)),
            escrow_id: Set(p.escrow_id.map(EscrowId::into_inner)),
            next_payment_due: Set(p.next_payment_due),
            created_at: Set(tz(p.created_at)),
            updated_at: Set(tz(p.updated_at)),
        }
    }
}

impl From<payment_authorizations::Model> for StoredAuthorization {
    fn from(row: payment_authorizations::Model) -> Self {
        Self {
            tenant_id: UserId::from_uuid(row.tenant_id),
            authorization_code: row.authorization_code,
            email: row.email,
            card_type: row.card_type,
            last4: row.last4,
            bank: row.bank,
            updated_at: utc(row.updated_at),
        }
    }
}

impl From<&StoredAuthorization> for payment_authorizations::ActiveModel {
    fn from(a: &StoredAuthorization) -> Self {
        Self {
            tenant_id: Set(a.tenant_id.into_inner()),
            authorization_code: Set(a.authorization_code.clone()),
            email: Set(a.email.clone()),
            card_type: Set(a.card_type.clone()),
            last4: Set(a.last4.clone()),
            bank: Set(a.bank.clone()),
            updated_at: Set(tz(a.updated_at)),
        }
    }
}

impl From<payout_accounts::Model> for PayoutAccount {
    fn from(row: payout_accounts::Model) -> Self {
        Self {
            landlord_id: UserId::from_uuid(row.landlord_id),
            account_number: row.account_number,
            bank_code: row.bank_code,
            account_name: row.account_name,
            recipient_code: row.recipient_code,
            updated_at: utc(row.updated_at),
        }
    }
}

impl From<&PayoutAccount> for payout_accounts::ActiveModel {
    fn from(a: &PayoutAccount) -> Self {
        Self {
            landlord_id: Set(a.landlord_id.into_inner()),
            account_number: Set(a.account_number.clone()),
            bank_code: Set(a.bank_code.clone()),
            account_name: Set(a.account_name.clone()),
            recipient_code: Set(a.recipient_code.clone()),
            updated_at: Set(tz(a.updated_at)),
        }
    }
}

// ---- notifications ----

impl TryFrom<payment_notifications::Model> for PaymentNotification {
    type Error = StoreError;

    fn try_from(row: payment_notifications::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            contract_id: ContractId::from_uuid(row.contract_id),
            tenant_id: UserId::from_uuid(row.tenant_id),
            recipient_id: UserId::from_uuid(row.recipient_id),
            notification_type: parse(&row.notification_type)?,
            trigger: row.trigger_label,
            scheduled_for: row.scheduled_for,
            sent_at: row.sent_at.map(utc),
            title: row.title,
            message: row.message,
            status: parse(&row.status)?,
            delivery_receipt_id: row.delivery_receipt_id,
            delivery_method: row.delivery_method,
            error: row.error,
            dedupe_key: row.dedupe_key,
            created_at: utc(row.created_at),
        })
    }
}

impl From<&PaymentNotification> for payment_notifications::ActiveModel {
    fn from(n: &PaymentNotification) -> Self {
        Self {
            id: Set(n.id.into_inner()),
            contract_id: Set(n.contract_id.into_inner()),
            tenant_id: Set(n.tenant_id.into_inner()),
            recipient_id: Set(n.recipient_id.into_inner()),
            notification_type: Set(n.notification_type.as_str().to_string()),
            trigger_label: Set(n.trigger.clone()),
            scheduled_for: Set(n.scheduled_for),
            sent_at: Set(n.sent_at.map(tz)),
            title: Set(n.title.clone()),
            message: Set(n.message.clone()),
            status: Set(n.status.as_str().to_string()),
            delivery_receipt_id: Set(n.delivery_receipt_id.clone()),
            delivery_method: Set(n.delivery_method.clone()),
            error: Set(n.error.clone()),
            dedupe_key: Set(n.dedupe_key.clone()),
            created_at: Set(tz(n.created_at)),
        }
    }
}

impl From<notification_recipients::Model> for Recipient {
    fn from(row: notification_recipients::Model) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            display_name: row.display_name,
            email: row.email,
            phone: row.phone,
            push_token: row.push_token,
        }
    }
}

impl From<&Recipient> for notification_recipients::ActiveModel {
    fn from(r: &Recipient) -> Self {
        Self {
            user_id: Set(r.user_id.into_inner()),
            display_name: Set(r.display_name.clone()),
            email: Set(r.email.clone()),
            phone: Set(r.phone.clone()),
            push_token: Set(r.push_token.clone()),
        }
    }
}
