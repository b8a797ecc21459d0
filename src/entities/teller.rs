//! Teller entity - A cash till operated at a branch.
//!
//! Tellers form a two-level hierarchy: a primary teller holds the branch cash
//! and provisions its sub tellers at the start of each business day.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Position of a teller in the till hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TellerType {
    #[sea_orm(string_value = "primary")]
    Primary,
    #[sea_orm(string_value = "sub")]
    Sub,
}

/// Teller database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tellers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique teller code (e.g., "BR001-T01")
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub branch_id: i64,
    pub teller_type: TellerType,
    /// Primary teller that provisions this one; `None` for primary tellers
    pub primary_teller_id: Option<i64>,
    /// Cash currently in the till
    pub balance: Decimal,
    /// Upper bound on the till balance; zero disables the check
    pub max_balance: Decimal,
    /// General-ledger account mirroring this till's cash
    pub cash_gl_account: String,
    /// Operator currently assigned to the till
    pub user_id: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
    #[sea_orm(has_many = "super::teller_operation::Entity")]
    Operations,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::teller_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
