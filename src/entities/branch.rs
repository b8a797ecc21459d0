//! Branch entity - A physical branch of the institution.
//!
//! Accounts and tellers belong to exactly one branch; the branch code prefixes
//! every account number opened there.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Branch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    /// Unique identifier for the branch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short branch code (e.g., "BR001"), used as account number prefix
    #[sea_orm(unique)]
    pub code: String,
    /// Human-readable branch name
    pub name: String,
    /// Soft delete flag
    pub is_deleted: bool,
}

/// Defines relationships between Branch and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One branch has many accounts
    #[sea_orm(has_many = "super::account::Entity")]
    Accounts,
    /// One branch has many tellers
    #[sea_orm(has_many = "super::teller::Entity")]
    Tellers,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::teller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tellers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
