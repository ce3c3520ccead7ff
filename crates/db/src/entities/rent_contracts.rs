//! `SeaORM` Entity for rent_contracts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rent_contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub landlord_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub monthly_amount: Decimal,
    pub expiry_date: Date,
    pub payout_type: String,
    pub next_payment_due: Date,
    pub transition_start_date: Date,
    pub status: String,
    pub is_existing_tenant: bool,
    pub original_expiry_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::escrow_balances::Entity")]
    EscrowBalances,
    #[sea_orm(has_many = "super::payment_records::Entity")]
    PaymentRecords,
    #[sea_orm(has_many = "super::payment_notifications::Entity")]
    PaymentNotifications,
}

impl Related<super::escrow_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EscrowBalances.def()
    }
}

impl Related<super::payment_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentRecords.def()
    }
}

impl Related<super::payment_notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentNotifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
