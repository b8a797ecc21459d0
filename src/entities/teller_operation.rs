//! Teller operation entity - Journal of every cash movement in a till.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction and cause of a till cash movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Customer cash received at the counter
    #[sea_orm(string_value = "cash_in")]
    CashIn,
    /// Cash received from the primary teller at opening of day
    #[sea_orm(string_value = "provision_in")]
    ProvisionIn,
    /// Cash handed to a sub teller at its opening of day
    #[sea_orm(string_value = "provision_out")]
    ProvisionOut,
    /// Cash received back from a sub teller at its closing of day
    #[sea_orm(string_value = "return_in")]
    ReturnIn,
    /// Cash handed back to the primary teller at closing of day
    #[sea_orm(string_value = "return_out")]
    ReturnOut,
    /// Counting difference booked at closing of day
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl OperationType {
    /// Whether the till's maximum balance applies to this movement.
    ///
    /// Only fresh cash taken in is capped; closing returns and counting
    /// adjustments must always book.
    #[must_use]
    pub const fn is_capped(self) -> bool {
        matches!(self, Self::CashIn | Self::ProvisionIn)
    }
}

/// Teller operation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teller_operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub teller_id: i64,
    /// Customer account involved, for counter operations
    pub account_id: Option<i64>,
    pub reference: String,
    pub operation_type: OperationType,
    /// Signed change applied to the till balance
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub business_date: Date,
    pub performed_by: String,
    pub created_at: DateTimeUtc,
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
