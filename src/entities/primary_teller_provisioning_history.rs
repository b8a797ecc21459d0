//! Primary teller provisioning history - One row per primary till per business day.
//!
//! The row is opened with the counted vault cash, tracks what was handed to
//! and returned by sub tellers during the day, and is closed with the counted
//! cash at hand.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Opening-of-day status of a till.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TillStatus {
    #[sea_orm(string_value = "opened")]
    Opened,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Primary teller provisioning history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "primary_teller_provisioning_histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub teller_id: i64,
    pub business_date: Date,
    /// Operator who opened the till
    pub user_id: String,
    /// Cash counted at opening
    pub opening_amount: Decimal,
    /// Total handed to sub tellers during the day
    pub provisioned_to_sub: Decimal,
    /// Total received back from sub tellers during the day
    pub returned_from_sub: Decimal,
    /// Customer cash received directly at this till
    pub cash_in: Decimal,
    /// Expected balance at closing
    pub closing_amount: Option<Decimal>,
    /// Cash counted at closing
    pub cash_at_hand: Option<Decimal>,
    /// `cash_at_hand - closing_amount`
    pub difference: Option<Decimal>,
    pub status: TillStatus,
    pub opening_reference: String,
    pub closing_reference: Option<String>,
    pub opened_at: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teller::Entity",
        from = "Column::TellerId",
        to = "super::teller::Column::Id"
    )]
    Teller,
}

impl Related<super::teller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
