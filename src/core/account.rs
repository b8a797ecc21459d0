//! Account business logic - Handles the account lifecycle.
//!
//! Provides functions for opening accounts, looking them up, moving them between
//! statuses, closing them, and blocking or releasing part of their balance.
//! Multi-row changes run inside a single database transaction so the account
//! row and its block rows never disagree.

use crate::{
    entities::{
        Account, BlockedAccount, Branch, Loan,
        account::{self, AccountStatus, AccountType},
        blocked_account::{self, BlockStatus},
        branch,
        loan::{self, LoanStatus},
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Input for [`open_account`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub customer_id: String,
    pub customer_phone: Option<String>,
    pub branch_id: i64,
    pub account_type: AccountType,
    /// ISO currency code; the bank currency is used when `None`
    pub currency: Option<String>,
}

/// Funds that can still be moved or blocked.
#[must_use]
pub fn available_balance(account: &account::Model) -> Decimal {
    account.balance - account.blocked_amount
}

/// Whether a status change is permitted. Closure has its own operation.
#[must_use]
pub const fn is_allowed_transition(from: AccountStatus, to: AccountStatus) -> bool {
    matches!(
        (from, to),
        (
            AccountStatus::Active,
            AccountStatus::Inactive | AccountStatus::Dormant | AccountStatus::Frozen
        ) | (
            AccountStatus::Inactive | AccountStatus::Dormant | AccountStatus::Frozen,
            AccountStatus::Active
        ) | (
            AccountStatus::Inactive | AccountStatus::Dormant,
            AccountStatus::Frozen
        )
    )
}

/// Opens a new account with zero balance in `active` status.
///
/// # Errors
/// Returns an error if:
/// - The customer id or currency is blank
/// - The branch does not exist
/// - The customer already holds a non-closed account of the same type in the branch
pub async fn open_account(
    db: &DatabaseConnection,
    new_account: NewAccount,
    default_currency: &str,
) -> Result<account::Model> {
    let customer_id = new_account.customer_id.trim().to_string();
    if customer_id.is_empty() {
        return Err(Error::Validation {
            message: "Customer id cannot be empty".to_string(),
        });
    }
    let currency = new_account
        .currency
        .as_deref()
        .unwrap_or(default_currency)
        .trim()
        .to_uppercase();
    if currency.len() != 3 {
        return Err(Error::Validation {
            message: format!("Invalid currency code '{currency}'"),
        });
    }

    let txn = db.begin().await?;

    let branch = Branch::find_by_id(new_account.branch_id)
        .filter(branch::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Branch", new_account.branch_id))?;

    let existing = Account::find()
        .filter(account::Column::CustomerId.eq(customer_id.as_str()))
        .filter(account::Column::BranchId.eq(branch.id))
        .filter(account::Column::AccountType.eq(new_account.account_type))
        .filter(account::Column::Status.ne(AccountStatus::Closed))
        .filter(account::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?;
    if let Some(existing) = existing {
        return Err(Error::Duplicate {
            entity: "Account",
            key: format!(
                "{customer_id}/{}/{}",
                new_account.account_type.to_value(),
                existing.account_number
            ),
        });
    }

    let sequence = Account::find()
        .filter(account::Column::BranchId.eq(branch.id))
        .count(&txn)
        .await?
        + 1;
    let account_number = format!("{}{sequence:07}", branch.code);

    let now = chrono::Utc::now();
    let model = account::ActiveModel {
        account_number: Set(account_number),
        customer_id: Set(customer_id),
        customer_phone: Set(new_account.customer_phone),
        branch_id: Set(branch.id),
        account_type: Set(new_account.account_type),
        currency: Set(currency),
        balance: Set(Decimal::ZERO),
        blocked_amount: Set(Decimal::ZERO),
        status: Set(AccountStatus::Active),
        closure_reason: Set(None),
        closed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        is_deleted: Set(false),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;
    txn.commit().await?;

    info!(account = %created.account_number, customer = %created.customer_id, "account opened");
    Ok(created)
}

/// Finds a non-deleted account by its id.
pub async fn get_account_by_id<C>(db: &C, account_id: i64) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .filter(account::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a non-deleted account by its account number.
pub async fn get_account_by_number<C>(
    db: &C,
    account_number: &str,
) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find()
        .filter(account::Column::AccountNumber.eq(account_number))
        .filter(account::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_account<C>(db: &C, account_id: i64) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    get_account_by_id(db, account_id)
        .await?
        .ok_or_else(|| Error::not_found("Account", account_id))
}

/// All non-deleted accounts of a customer, ordered by account number.
pub async fn list_customer_accounts(
    db: &DatabaseConnection,
    customer_id: &str,
) -> Result<Vec<account::Model>> {
    Account::find()
        .filter(account::Column::CustomerId.eq(customer_id))
        .filter(account::Column::IsDeleted.eq(false))
        .order_by_asc(account::Column::AccountNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves an account to a new status.
///
/// # Errors
/// Returns an error if the account does not exist, already has the requested
/// status, or the transition is not permitted (including any change to or
/// from `closed`).
pub async fn change_status(
    db: &DatabaseConnection,
    account_id: i64,
    new_status: AccountStatus,
    changed_by: &str,
) -> Result<account::Model> {
    let txn = db.begin().await?;
    let account = require_account(&txn, account_id).await?;

    if account.status == new_status {
        return Err(Error::StatusUnchanged {
            account_number: account.account_number,
            status: new_status.to_value(),
        });
    }
    if !is_allowed_transition(account.status, new_status) {
        return Err(Error::InvalidStatusTransition {
            from: account.status.to_value(),
            to: new_status.to_value(),
        });
    }

    let old_status = account.status;
    let mut active: account::ActiveModel = account.into();
    active.status = Set(new_status);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        account = %updated.account_number,
        from = %old_status.to_value(),
        to = %new_status.to_value(),
        changed_by,
        "account status changed"
    );
    Ok(updated)
}

/// Closes an account. The account must be empty, unblocked and free of live loans.
pub async fn close_account(
    db: &DatabaseConnection,
    account_id: i64,
    reason: &str,
    closed_by: &str,
) -> Result<account::Model> {
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "Closure reason cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;
    let account = require_account(&txn, account_id).await?;

    if account.status == AccountStatus::Closed {
        return Err(Error::StatusUnchanged {
            account_number: account.account_number,
            status: AccountStatus::Closed.to_value(),
        });
    }
    if account.balance != Decimal::ZERO {
        return Err(Error::AccountNotClosable {
            account_number: account.account_number,
            reason: format!("balance is {}", account.balance),
        });
    }
    if account.blocked_amount > Decimal::ZERO {
        return Err(Error::AccountNotClosable {
            account_number: account.account_number,
            reason: format!("{} is still blocked", account.blocked_amount),
        });
    }
    let live_loans = Loan::find()
        .filter(loan::Column::AccountId.eq(account.id))
        .filter(loan::Column::Status.ne(LoanStatus::Repaid))
        .count(&txn)
        .await?;
    if live_loans > 0 {
        return Err(Error::AccountNotClosable {
            account_number: account.account_number,
            reason: format!("{live_loans} loan(s) are not repaid"),
        });
    }

    let now = chrono::Utc::now();
    let mut active: account::ActiveModel = account.into();
    active.status = Set(AccountStatus::Closed);
    active.closure_reason = Set(Some(reason.trim().to_string()));
    active.closed_at = Set(Some(now));
    active.updated_at = Set(now);
    let closed = active.update(&txn).await?;
    txn.commit().await?;

    info!(account = %closed.account_number, closed_by, "account closed");
    Ok(closed)
}

/// Blocks part of the available balance.
///
/// # Errors
/// Returns an error if the amount is not positive, the reason is blank, the
/// account does not exist or is closed, or the amount exceeds the available balance.
pub async fn block_amount(
    db: &DatabaseConnection,
    account_id: i64,
    amount: Decimal,
    reason: &str,
    blocked_by: &str,
) -> Result<blocked_account::Model> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "Block reason cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;
    let account = require_account(&txn, account_id).await?;

    if account.status == AccountStatus::Closed {
        return Err(Error::AccountNotOperational {
            account_number: account.account_number,
            status: account.status.to_value(),
            action: "be blocked",
        });
    }

    let available = available_balance(&account);
    if amount > available {
        return Err(Error::InsufficientFunds {
            available,
            required: amount,
        });
    }

    let now = chrono::Utc::now();
    let block = blocked_account::ActiveModel {
        account_id: Set(account.id),
        amount: Set(amount),
        reason: Set(reason.trim().to_string()),
        blocked_by: Set(blocked_by.to_string()),
        status: Set(BlockStatus::Blocked),
        blocked_at: Set(now),
        released_at: Set(None),
        released_by: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let account_number = account.account_number.clone();
    let new_blocked = account.blocked_amount + amount;
    let mut active: account::ActiveModel = account.into();
    active.blocked_amount = Set(new_blocked);
    active.updated_at = Set(now);
    active.update(&txn).await?;
    txn.commit().await?;

    info!(account = %account_number, %amount, blocked_by, "amount blocked");
    Ok(block)
}

/// Releases a block and gives its amount back to the available balance.
pub async fn release_blocked_amount(
    db: &DatabaseConnection,
    block_id: i64,
    released_by: &str,
) -> Result<blocked_account::Model> {
    let txn = db.begin().await?;
    let block = BlockedAccount::find_by_id(block_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Blocked amount", block_id))?;

    if block.status == BlockStatus::Released {
        return Err(Error::AlreadyReleased { block_id });
    }

    let account = require_account(&txn, block.account_id).await?;
    let new_blocked = (account.blocked_amount - block.amount).max(Decimal::ZERO);

    let now = chrono::Utc::now();
    let mut account_active: account::ActiveModel = account.into();
    account_active.blocked_amount = Set(new_blocked);
    account_active.updated_at = Set(now);
    account_active.update(&txn).await?;

    let mut block_active: blocked_account::ActiveModel = block.into();
    block_active.status = Set(BlockStatus::Released);
    block_active.released_at = Set(Some(now));
    block_active.released_by = Set(Some(released_by.to_string()));
    let released = block_active.update(&txn).await?;
    txn.commit().await?;

    info!(block_id, released_by, "blocked amount released");
    Ok(released)
}

/// All blocks ever placed on an account, newest first.
pub async fn list_blocks(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Vec<blocked_account::Model>> {
    BlockedAccount::find()
        .filter(blocked_account::Column::AccountId.eq(account_id))
        .order_by_desc(blocked_account::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Refuses credits on accounts that cannot take them.
pub(crate) fn ensure_can_receive_credit(account: &account::Model) -> Result<()> {
    match account.status {
        AccountStatus::Active | AccountStatus::Dormant => Ok(()),
        AccountStatus::Inactive | AccountStatus::Frozen | AccountStatus::Closed => {
            Err(Error::AccountNotOperational {
                account_number: account.account_number.clone(),
                status: account.status.to_value(),
                action: "receive deposits",
            })
        }
    }
}

/// Applies a signed change to an account balance and returns the updated row.
///
/// Debits may not dip into blocked funds. A credit on a dormant account
/// reactivates it.
pub(crate) async fn apply_balance_change<C>(
    db: &C,
    account: account::Model,
    delta: Decimal,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    let new_balance = account.balance + delta;
    if delta < Decimal::ZERO && new_balance < account.blocked_amount {
        return Err(Error::InsufficientFunds {
            available: available_balance(&account),
            required: -delta,
        });
    }

    let reactivate = delta > Decimal::ZERO && account.status == AccountStatus::Dormant;
    let account_number = account.account_number.clone();
    let mut active: account::ActiveModel = account.into();
    active.balance = Set(new_balance);
    if reactivate {
        active.status = Set(AccountStatus::Active);
        info!(account = %account_number, "dormant account reactivated by credit");
    }
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_transition_rules() {
        use AccountStatus::{Active, Closed, Dormant, Frozen, Inactive};
        assert!(is_allowed_transition(Active, Dormant));
        assert!(is_allowed_transition(Dormant, Active));
        assert!(is_allowed_transition(Inactive, Frozen));
        assert!(is_allowed_transition(Frozen, Active));
        assert!(!is_allowed_transition(Frozen, Dormant));
        assert!(!is_allowed_transition(Active, Closed));
        assert!(!is_allowed_transition(Closed, Active));
    }

    #[tokio::test]
    async fn test_open_account_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = open_account(
            &db,
            NewAccount {
                customer_id: "   ".to_string(),
                customer_phone: None,
                branch_id: 1,
                account_type: AccountType::Savings,
                currency: None,
            },
            "XAF",
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = open_account(
            &db,
            NewAccount {
                customer_id: "CUST-1".to_string(),
                customer_phone: None,
                branch_id: 1,
                account_type: AccountType::Savings,
                currency: Some("EURO".to_string()),
            },
            "XAF",
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_account_numbers_follow_branch_sequence() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;

        let first = create_test_account(&db, branch.id, "CUST-1").await?;
        let second = create_custom_account(&db, branch.id, "CUST-2", AccountType::Current).await?;

        assert_eq!(first.account_number, "BR0010000001");
        assert_eq!(second.account_number, "BR0010000002");
        assert_eq!(first.status, AccountStatus::Active);
        assert_eq!(first.balance, Decimal::ZERO);
        assert_eq!(first.currency, "XAF");
        Ok(())
    }

    #[tokio::test]
    async fn test_open_account_unknown_branch() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_test_account(&db, 42, "CUST-1").await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Branch", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_duplicate_account_conflicts() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        create_test_account(&db, branch.id, "CUST-1").await?;

        let err = create_test_account(&db, branch.id, "CUST-1").await.unwrap_err();
        assert!(matches!(err, Error::Duplicate { .. }));
        assert_eq!(err.status_code(), 409);

        // A different product for the same customer is fine
        create_custom_account(&db, branch.id, "CUST-1", AccountType::Current).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_and_list() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let savings = create_test_account(&db, branch.id, "CUST-1").await?;
        let current = create_custom_account(&db, branch.id, "CUST-1", AccountType::Current).await?;
        create_test_account(&db, branch.id, "CUST-2").await?;

        let by_number = get_account_by_number(&db, &savings.account_number).await?;
        assert_eq!(by_number, Some(savings.clone()));
        assert!(get_account_by_id(&db, 999).await?.is_none());

        let accounts = list_customer_accounts(&db, "CUST-1").await?;
        assert_eq!(accounts, vec![savings, current]);
        Ok(())
    }

    #[tokio::test]
    async fn test_change_status() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let account = create_test_account(&db, branch.id, "CUST-1").await?;

        let frozen = change_status(&db, account.id, AccountStatus::Frozen, "officer").await?;
        assert_eq!(frozen.status, AccountStatus::Frozen);

        let err = change_status(&db, account.id, AccountStatus::Frozen, "officer")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);

        let err = change_status(&db, account.id, AccountStatus::Dormant, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatusTransition { .. }));
        assert_eq!(err.status_code(), 403);

        let err = change_status(&db, account.id, AccountStatus::Closed, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatusTransition { .. }));

        let err = change_status(&db, 999, AccountStatus::Active, "officer")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_block_and_release() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let account = create_funded_account(&db, branch.id, "CUST-1", dec!(10000)).await?;

        let block = block_amount(&db, account.id, dec!(4000), "court order", "officer").await?;
        assert_eq!(block.status, BlockStatus::Blocked);
        let reloaded = require_account(&db, account.id).await?;
        assert_eq!(reloaded.blocked_amount, dec!(4000));
        assert_eq!(available_balance(&reloaded), dec!(6000));

        // Blocking more than what is still available is refused with 403
        let err = block_amount(&db, account.id, dec!(6001), "another", "officer")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                available,
                required
            } if available == dec!(6000) && required == dec!(6001)
        ));
        assert_eq!(err.status_code(), 403);

        let released = release_blocked_amount(&db, block.id, "officer").await?;
        assert_eq!(released.status, BlockStatus::Released);
        assert_eq!(released.released_by.as_deref(), Some("officer"));
        let reloaded = require_account(&db, account.id).await?;
        assert_eq!(reloaded.blocked_amount, Decimal::ZERO);

        let err = release_blocked_amount(&db, block.id, "officer").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyReleased { .. }));

        let err = release_blocked_amount(&db, 999, "officer").await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        assert_eq!(list_blocks(&db, account.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_block_invalid_amount() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = block_amount(&db, 1, dec!(0), "reason", "officer").await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        let result = block_amount(&db, 1, dec!(10), " ", "officer").await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_close_account_rules() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let funded = create_funded_account(&db, branch.id, "CUST-1", dec!(500)).await?;
        let err = close_account(&db, funded.id, "customer request", "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotClosable { .. }));
        assert_eq!(err.status_code(), 403);

        let empty = create_test_account(&db, branch.id, "CUST-2").await?;
        let closed = close_account(&db, empty.id, "customer request", "officer").await?;
        assert_eq!(closed.status, AccountStatus::Closed);
        assert_eq!(closed.closure_reason.as_deref(), Some("customer request"));
        assert!(closed.closed_at.is_some());

        let err = close_account(&db, empty.id, "again", "officer").await.unwrap_err();
        assert_eq!(err.status_code(), 409);

        // Closed accounts can't be blocked or reopened through a status change
        let err = block_amount(&db, empty.id, dec!(1), "x", "officer").await.unwrap_err();
        assert!(matches!(err, Error::AccountNotOperational { .. }));
        let err = change_status(&db, empty.id, AccountStatus::Active, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatusTransition { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_close_account_with_live_loan() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let account = create_test_account(&db, branch.id, "CUST-1").await?;
        create_test_loan(&db, account.id, "LN-1").await?;

        let err = close_account(&db, account.id, "customer request", "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotClosable { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_reactivates_dormant_account() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let account = create_test_account(&db, branch.id, "CUST-1").await?;
        let dormant = change_status(&db, account.id, AccountStatus::Dormant, "batch").await?;

        ensure_can_receive_credit(&dormant)?;
        let credited = apply_balance_change(&db, dormant, dec!(250)).await?;
        assert_eq!(credited.status, AccountStatus::Active);
        assert_eq!(credited.balance, dec!(250));
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_cannot_touch_blocked_funds() -> Result<()> {
        let (db, branch) = setup_with_branch().await?;
        let account = create_funded_account(&db, branch.id, "CUST-1", dec!(1000)).await?;
        block_amount(&db, account.id, dec!(800), "lien", "officer").await?;
        let account = require_account(&db, account.id).await?;

        let err = apply_balance_change(&db, account, dec!(-300)).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        Ok(())
    }
}
