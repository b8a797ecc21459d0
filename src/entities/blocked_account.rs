//! Blocked account entity - One block placed on part of an account balance.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a block still holds funds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    #[sea_orm(string_value = "blocked")]
    Blocked,
    #[sea_orm(string_value = "released")]
    Released,
}

/// Blocked amount database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blocked_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account the block applies to
    pub account_id: i64,
    /// Amount withheld from the available balance
    pub amount: Decimal,
    pub reason: String,
    /// User who placed the block
    pub blocked_by: String,
    pub status: BlockStatus,
    pub blocked_at: DateTimeUtc,
    pub released_at: Option<DateTimeUtc>,
    pub released_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
