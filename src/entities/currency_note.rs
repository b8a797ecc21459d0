//! Currency note entity - Denomination breakdown of a cash movement.
//!
//! Each row is one face value of one movement; the movement is identified by
//! the business reference it was registered under.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Physical form of a denomination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum CurrencyKind {
    #[sea_orm(string_value = "note")]
    Note,
    #[sea_orm(string_value = "coin")]
    Coin,
}

/// Whether the cash entered or left the till.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    #[sea_orm(string_value = "in")]
    In,
    #[sea_orm(string_value = "out")]
    Out,
}

/// Currency note database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currency_notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub reference: String,
    pub teller_id: i64,
    pub business_date: Date,
    /// Face value of the note or coin
    pub denomination: i64,
    pub kind: CurrencyKind,
    pub quantity: i64,
    pub movement: Movement,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
