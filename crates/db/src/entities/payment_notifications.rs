//! `SeaORM` Entity for payment_notifications table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub tenant_id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: String,
    pub trigger_label: String,
    pub scheduled_for: Date,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub status: String,
    pub delivery_receipt_id: Option<String>,
    pub delivery_method: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
    #[sea_orm(unique)]
    pub dedupe_key: String,
    pub created_at: DateTimeWithTimeZone,
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
