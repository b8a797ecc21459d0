//! Accounting entry entity - One balanced debit/credit pair in the general ledger.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Accounting entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounting_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business reference of the operation that produced the entry
    pub reference: String,
    pub branch_id: i64,
    /// GL account debited
    pub debit_account: String,
    /// GL account credited
    pub credit_account: String,
    /// Always strictly positive
    pub amount: Decimal,
    pub narration: String,
    pub business_date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
