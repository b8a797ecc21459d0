//! Sub teller provisioning history - One row per sub till per business day.
//!
//! Opened when the primary teller provisions the sub teller, closed when the
//! sub teller counts its cash and hands it back.

use super::primary_teller_provisioning_history::TillStatus;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sub teller provisioning history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sub_teller_provisioning_histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub teller_id: i64,
    /// Primary teller that provisioned the till
    pub primary_teller_id: i64,
    pub business_date: Date,
    pub user_id: String,
    /// Cash received from the primary teller
    pub opening_amount: Decimal,
    /// Customer cash received during the day
    pub cash_in: Decimal,
    /// Expected balance at closing (`opening_amount + cash_in`)
    pub closing_amount: Option<Decimal>,
    /// Cash counted at closing
    pub cash_at_hand: Option<Decimal>,
    /// `cash_at_hand - closing_amount`
    pub difference: Option<Decimal>,
    pub status: TillStatus,
    pub opening_reference: String,
    pub closing_reference: Option<String>,
    pub closing_comment: Option<String>,
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
