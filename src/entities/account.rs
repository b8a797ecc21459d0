//! Account entity - A customer deposit account held at a branch.
//!
//! `balance` is the ledger balance; `blocked_amount` is the part of it frozen by
//! active blocks. The available balance is always `balance - blocked_amount`.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product family of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Ordinary savings account
    #[sea_orm(string_value = "savings")]
    Savings,
    /// Current (checking) account
    #[sea_orm(string_value = "current")]
    Current,
    /// Collection account fed by momokash mobile-money cash collections
    #[sea_orm(string_value = "momokash")]
    Momokash,
}

/// Lifecycle status of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    /// No customer activity for a long period; any credit reactivates it
    #[sea_orm(string_value = "dormant")]
    Dormant,
    /// Frozen by the bank; no movements allowed
    #[sea_orm(string_value = "frozen")]
    Frozen,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer-facing account number (branch code + sequence)
    #[sea_orm(unique)]
    pub account_number: String,
    /// Identifier of the owning customer
    pub customer_id: String,
    /// Phone number used for deposit notifications
    pub customer_phone: Option<String>,
    /// Branch holding the account
    pub branch_id: i64,
    pub account_type: AccountType,
    /// ISO currency code
    pub currency: String,
    /// Ledger balance
    pub balance: Decimal,
    /// Sum of all active blocks on the account
    pub blocked_amount: Decimal,
    pub status: AccountStatus,
    /// Free-text reason recorded at closure
    pub closure_reason: Option<String>,
    pub closed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// Soft delete flag - if true, account is hidden but data is preserved
    pub is_deleted: bool,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each account belongs to one branch
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
    /// One account has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One account has many blocks
    #[sea_orm(has_many = "super::blocked_account::Entity")]
    Blocks,
    /// One account may back many loans
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::blocked_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Blocks.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
