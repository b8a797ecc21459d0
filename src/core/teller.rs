//! Teller business logic - Till registration and cash movements.
//!
//! A till's balance only ever changes through [`adjust_teller_balance`], which
//! also journals the movement as a `teller_operation` row so the till can be
//! reconciled against its operations at closing time.

use crate::{
    entities::{
        Branch, Teller, TellerOperation, branch,
        teller::{self, TellerType},
        teller_operation::{self, OperationType},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Input for [`create_teller`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeller {
    pub code: String,
    pub name: String,
    pub branch_id: i64,
    pub teller_type: TellerType,
    /// Required for sub tellers, forbidden for primary tellers
    pub primary_teller_id: Option<i64>,
    /// Cash placed in the till at creation
    pub opening_balance: Decimal,
    /// Zero disables the limit
    pub max_balance: Decimal,
    pub cash_gl_account: String,
    pub user_id: Option<String>,
}

/// Describes one till movement for the operations journal.
#[derive(Debug, Clone, Copy)]
pub struct TillMovement<'a> {
    pub reference: &'a str,
    pub operation_type: OperationType,
    pub account_id: Option<i64>,
    pub business_date: NaiveDate,
    pub performed_by: &'a str,
}

/// Registers a new till.
///
/// # Errors
/// Returns an error if:
/// - The code, name or GL account is blank, or a balance is negative
/// - The branch or the named primary teller does not exist
/// - The code is already taken
/// - The primary/sub hierarchy is inconsistent
pub async fn create_teller(db: &DatabaseConnection, new_teller: NewTeller) -> Result<teller::Model> {
    let code = new_teller.code.trim().to_string();
    if code.is_empty() || new_teller.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Teller code and name cannot be empty".to_string(),
        });
    }
    if new_teller.cash_gl_account.trim().is_empty() {
        return Err(Error::Validation {
            message: "Teller cash GL account cannot be empty".to_string(),
        });
    }
    if new_teller.opening_balance < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: new_teller.opening_balance,
        });
    }
    if new_teller.max_balance < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: new_teller.max_balance,
        });
    }

    let txn = db.begin().await?;

    let branch = Branch::find_by_id(new_teller.branch_id)
        .filter(branch::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Branch", new_teller.branch_id))?;

    if get_teller_by_code(&txn, &code).await?.is_some() {
        return Err(Error::Duplicate {
            entity: "Teller",
            key: code,
        });
    }

    match (new_teller.teller_type, new_teller.primary_teller_id) {
        (TellerType::Primary, Some(_)) => {
            return Err(Error::Validation {
                message: "A primary teller cannot report to another teller".to_string(),
            });
        }
        (TellerType::Sub, None) => {
            return Err(Error::Validation {
                message: "A sub teller needs a primary teller".to_string(),
            });
        }
        (TellerType::Sub, Some(primary_id)) => {
            let primary = require_teller(&txn, primary_id).await?;
            if primary.teller_type != TellerType::Primary || primary.branch_id != branch.id {
                return Err(Error::Validation {
                    message: format!(
                        "Teller {} is not a primary teller of branch {}",
                        primary.code, branch.code
                    ),
                });
            }
        }
        (TellerType::Primary, None) => {}
    }

    let created = teller::ActiveModel {
        code: Set(code),
        name: Set(new_teller.name.trim().to_string()),
        branch_id: Set(branch.id),
        teller_type: Set(new_teller.teller_type),
        primary_teller_id: Set(new_teller.primary_teller_id),
        balance: Set(new_teller.opening_balance),
        max_balance: Set(new_teller.max_balance),
        cash_gl_account: Set(new_teller.cash_gl_account.trim().to_string()),
        user_id: Set(new_teller.user_id),
        is_active: Set(true),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(teller = %created.code, branch = %branch.code, "teller created");
    Ok(created)
}

/// Finds a non-deleted teller by id.
pub async fn get_teller_by_id<C>(db: &C, teller_id: i64) -> Result<Option<teller::Model>>
where
    C: ConnectionTrait,
{
    Teller::find_by_id(teller_id)
        .filter(teller::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a non-deleted teller by its code.
pub async fn get_teller_by_code<C>(db: &C, code: &str) -> Result<Option<teller::Model>>
where
    C: ConnectionTrait,
{
    Teller::find()
        .filter(teller::Column::Code.eq(code))
        .filter(teller::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_teller<C>(db: &C, teller_id: i64) -> Result<teller::Model>
where
    C: ConnectionTrait,
{
    get_teller_by_id(db, teller_id)
        .await?
        .ok_or_else(|| Error::not_found("Teller", teller_id))
}

/// Sub tellers reporting to a primary teller, ordered by code.
pub async fn list_sub_tellers<C>(db: &C, primary_teller_id: i64) -> Result<Vec<teller::Model>>
where
    C: ConnectionTrait,
{
    Teller::find()
        .filter(teller::Column::PrimaryTellerId.eq(primary_teller_id))
        .filter(teller::Column::IsDeleted.eq(false))
        .order_by_asc(teller::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a signed change to a till and journals it.
///
/// # Errors
/// Returns an error if the till would go negative, or if a capped movement
/// (counter cash or provisioning) would take it over its maximum balance.
pub async fn adjust_teller_balance<C>(
    db: &C,
    teller: teller::Model,
    delta: Decimal,
    movement: TillMovement<'_>,
) -> Result<teller::Model>
where
    C: ConnectionTrait,
{
    let balance_before = teller.balance;
    let balance_after = balance_before + delta;
    if balance_after < Decimal::ZERO {
        return Err(Error::InsufficientFunds {
            available: balance_before,
            required: -delta,
        });
    }
    if delta > Decimal::ZERO
        && movement.operation_type.is_capped()
        && teller.max_balance > Decimal::ZERO
        && balance_after > teller.max_balance
    {
        return Err(Error::TellerLimitExceeded {
            teller: teller.code,
            max_balance: teller.max_balance,
        });
    }

    let teller_id = teller.id;
    let mut active: teller::ActiveModel = teller.into();
    active.balance = Set(balance_after);
    let updated = active.update(db).await?;

    teller_operation::ActiveModel {
        teller_id: Set(teller_id),
        account_id: Set(movement.account_id),
        reference: Set(movement.reference.to_string()),
        operation_type: Set(movement.operation_type),
        amount: Set(delta),
        balance_before: Set(balance_before),
        balance_after: Set(balance_after),
        business_date: Set(movement.business_date),
        performed_by: Set(movement.performed_by.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(updated)
}

/// Operations journaled for a till on a business day, oldest first.
pub async fn list_operations<C>(
    db: &C,
    teller_id: i64,
    business_date: NaiveDate,
) -> Result<Vec<teller_operation::Model>>
where
    C: ConnectionTrait,
{
    TellerOperation::find()
        .filter(teller_operation::Column::TellerId.eq(teller_id))
        .filter(teller_operation::Column::BusinessDate.eq(business_date))
        .order_by_asc(teller_operation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_teller_hierarchy() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let primary = create_primary_teller(&db, branch.id, "BR001-P01", dec!(1000000)).await?;
        let sub = create_sub_teller(&db, branch.id, "BR001-S01", primary.id).await?;

        assert_eq!(primary.teller_type, TellerType::Primary);
        assert_eq!(sub.primary_teller_id, Some(primary.id));
        assert_eq!(sub.balance, Decimal::ZERO);

        let subs = list_sub_tellers(&db, primary.id).await?;
        assert_eq!(subs, vec![sub.clone()]);
        assert_eq!(get_teller_by_code(&db, "BR001-S01").await?, Some(sub));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_teller_rejects_bad_hierarchy() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let primary = create_primary_teller(&db, branch.id, "BR001-P01", dec!(0)).await?;
        let sub = create_sub_teller(&db, branch.id, "BR001-S01", primary.id).await?;

        // Sub teller pointing at another sub teller
        let err = create_sub_teller(&db, branch.id, "BR001-S02", sub.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        // Sub teller pointing at a missing teller
        let err = create_sub_teller(&db, branch.id, "BR001-S03", 999).await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        // Duplicate code
        let err = create_primary_teller(&db, branch.id, "BR001-P01", dec!(0)).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_balance_journals_operation() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let teller = create_primary_teller(&db, branch.id, "BR001-P01", dec!(1000)).await?;
        let date = business_date();

        let movement = TillMovement {
            reference: "DEP-1",
            operation_type: OperationType::CashIn,
            account_id: Some(7),
            business_date: date,
            performed_by: "cashier",
        };
        let updated = adjust_teller_balance(&db, teller, dec!(500), movement).await?;
        assert_eq!(updated.balance, dec!(1500));

        let operations = list_operations(&db, updated.id, date).await?;
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].balance_before, dec!(1000));
        assert_eq!(operations[0].balance_after, dec!(1500));
        assert_eq!(operations[0].account_id, Some(7));

        let err = adjust_teller_balance(&db, updated, dec!(-2000), movement)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_balance_respects_limit() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let teller = create_teller(
            &db,
            NewTeller {
                code: "BR001-P09".to_string(),
                name: "Limited".to_string(),
                branch_id: branch.id,
                teller_type: TellerType::Primary,
                primary_teller_id: None,
                opening_balance: dec!(900),
                max_balance: dec!(1000),
                cash_gl_account: "571009".to_string(),
                user_id: None,
            },
        )
        .await?;
        let teller_id = teller.id;

        let movement = TillMovement {
            reference: "DEP-2",
            operation_type: OperationType::CashIn,
            account_id: None,
            business_date: business_date(),
            performed_by: "cashier",
        };
        let err = adjust_teller_balance(&db, teller, dec!(200), movement)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TellerLimitExceeded { .. }));
        assert_eq!(err.status_code(), 403);

        // Cash coming back at closing is never refused
        let teller = reload_teller(&db, teller_id).await?;
        let returned = TillMovement {
            operation_type: OperationType::ReturnIn,
            ..movement
        };
        let updated = adjust_teller_balance(&db, teller, dec!(200), returned).await?;
        assert_eq!(updated.balance, dec!(1100));
        Ok(())
    }
}
