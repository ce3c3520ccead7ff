//! `SeaORM` Entity for escrow_balances table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "escrow_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub landlord_id: Uuid,
    pub contract_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_escrowed: Decimal,
    pub months_accumulated: i32,
    pub expected_release_date: Date,
    pub is_released: bool,
    pub released_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub released_amount: Option<Decimal>,
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
