//! `SeaORM` Entity for wallet_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub landlord_id: Uuid,
    pub transaction_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_after: Decimal,
    #[sea_orm(unique)]
    pub reference: String,
    pub payment_id: Option<Uuid>,
    pub status: String,
    pub description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub sequence: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallet_balances::Entity",
        from = "Column::LandlordId",
        to = "super::wallet_balances::Column::LandlordId"
    )]
    WalletBalances,
}

impl Related<super::wallet_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
