//! `SeaORM` Entity for payment_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub landlord_id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount_paid: Decimal,
    pub due_date: Date,
    pub paid_date: Option<DateTimeWithTimeZone>,
    pub payment_type: String,
    pub payment_method: String,
    pub status: String,
    #[sea_orm(unique)]
    pub reference: String,
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub wallet_transaction_id: Option<Uuid>,
    pub escrow_id: Option<Uuid>,
    pub next_payment_due: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rent_contracts::Entity",
        from = "Column::ContractId",
        to = "super::rent_contracts::Column::Id"
    )]
    RentContracts,
}

impl Related<super::rent_contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RentContracts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
