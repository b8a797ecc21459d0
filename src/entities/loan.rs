//! Loan entity - Outstanding balances of a customer loan.
//!
//! Repayments are allocated penalty first, then interest, then principal.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a loan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Approved, waiting for the processing fee and disbursement
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "disbursed")]
    Disbursed,
    #[sea_orm(string_value = "repaid")]
    Repaid,
}

/// Loan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub loan_number: String,
    /// Customer account the loan is attached to
    pub account_id: i64,
    pub principal_outstanding: Decimal,
    pub interest_outstanding: Decimal,
    pub penalty_outstanding: Decimal,
    /// One-off fee due before disbursement
    pub processing_fee: Decimal,
    pub processing_fee_paid: bool,
    pub status: LoanStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
