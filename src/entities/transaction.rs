//! Transaction entity - Every movement recorded against a customer account.
//!
//! `amount` is signed (credits positive, fee debits negative) and
//! `balance_after = balance_before + amount` holds for rows that move the
//! deposit balance. Loan flows are paid in cash at the till, so their rows keep
//! `balance_after == balance_before` and carry the cash amount for the record.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of cash-in operation (or the fee that followed it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "momokash_collection")]
    MomokashCollection,
    #[sea_orm(string_value = "loan_repayment")]
    LoanRepayment,
    #[sea_orm(string_value = "loan_processing_fee")]
    LoanProcessingFee,
    /// Fee charged on the account after a cash-in
    #[sea_orm(string_value = "fee")]
    Fee,
}

impl TransactionType {
    /// Whether this kind of transaction changes the account balance.
    #[must_use]
    pub const fn moves_balance(self) -> bool {
        matches!(self, Self::Deposit | Self::MomokashCollection | Self::Fee)
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business reference shared with teller operations and accounting entries
    pub reference: String,
    pub account_id: i64,
    /// Teller who handled the cash, if any
    pub teller_id: Option<i64>,
    pub branch_id: i64,
    pub transaction_type: TransactionType,
    /// Signed amount (positive for credits, negative for debits)
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    /// Name of the person who brought the cash
    pub depositor_name: Option<String>,
    pub business_date: Date,
    /// User who created the transaction
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one account
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
