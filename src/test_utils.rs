//! Shared test utilities for the core banking crate.
//!
//! This module provides common helper functions for setting up test databases
//! and creating branches, tellers, accounts and loans with sensible defaults.

use crate::{
    config::Settings,
    core::{
        account::{self, NewAccount},
        denomination::CashCount,
        loan::{self, NewLoan},
        seed::ensure_branch,
        teller::{self, NewTeller},
        till::{self, CloseSubTellerDay, ClosePrimaryTill, OpenPrimaryTill, ProvisionSubTeller},
    },
    entities::{
        self, account::AccountType, primary_teller_provisioning_history as primary_history,
        sub_teller_provisioning_history as sub_history, teller::TellerType,
    },
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The business day every test runs on.
#[must_use]
pub fn business_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap_or_default()
}

/// Creates a test database holding branch `BR001`.
pub async fn setup_with_branch() -> Result<(DatabaseConnection, entities::branch::Model)> {
    let db = setup_test_db().await?;
    let (branch, _) = ensure_branch(&db, "BR001", "Head Office").await?;
    Ok((db, branch))
}

/// Creates a primary teller with no balance limit.
pub async fn create_primary_teller(
    db: &DatabaseConnection,
    branch_id: i64,
    code: &str,
    opening_balance: Decimal,
) -> Result<entities::teller::Model> {
    teller::create_teller(
        db,
        NewTeller {
            code: code.to_string(),
            name: format!("Primary {code}"),
            branch_id,
            teller_type: TellerType::Primary,
            primary_teller_id: None,
            opening_balance,
            max_balance: Decimal::ZERO,
            cash_gl_account: format!("5710-{code}"),
            user_id: Some("head-cashier".to_string()),
        },
    )
    .await
}

/// Creates an empty sub teller under `primary_teller_id`.
pub async fn create_sub_teller(
    db: &DatabaseConnection,
    branch_id: i64,
    code: &str,
    primary_teller_id: i64,
) -> Result<entities::teller::Model> {
    teller::create_teller(
        db,
        NewTeller {
            code: code.to_string(),
            name: format!("Counter {code}"),
            branch_id,
            teller_type: TellerType::Sub,
            primary_teller_id: Some(primary_teller_id),
            opening_balance: Decimal::ZERO,
            max_balance: Decimal::ZERO,
            cash_gl_account: format!("5711-{code}"),
            user_id: Some("cashier".to_string()),
        },
    )
    .await
}

/// Reads a teller back from the database.
pub async fn reload_teller(
    db: &DatabaseConnection,
    teller_id: i64,
) -> Result<entities::teller::Model> {
    teller::require_teller(db, teller_id).await
}

/// Opens a savings account in the bank currency.
///
/// # Defaults
/// * `customer_phone`: "+237670000000"
/// * `account_type`: savings
pub async fn create_test_account(
    db: &DatabaseConnection,
    branch_id: i64,
    customer_id: &str,
) -> Result<entities::account::Model> {
    create_custom_account(db, branch_id, customer_id, AccountType::Savings).await
}

/// Opens an account of a given type.
pub async fn create_custom_account(
    db: &DatabaseConnection,
    branch_id: i64,
    customer_id: &str,
    account_type: AccountType,
) -> Result<entities::account::Model> {
    account::open_account(
        db,
        NewAccount {
            customer_id: customer_id.to_string(),
            customer_phone: Some("+237670000000".to_string()),
            branch_id,
            account_type,
            currency: None,
        },
        "XAF",
    )
    .await
}

/// Opens a savings account and credits it with `balance`.
pub async fn create_funded_account(
    db: &DatabaseConnection,
    branch_id: i64,
    customer_id: &str,
    balance: Decimal,
) -> Result<entities::account::Model> {
    let opened = create_test_account(db, branch_id, customer_id).await?;
    account::apply_balance_change(db, opened, balance).await
}

/// Registers a loan on `account_id`.
///
/// # Defaults
/// * principal: 50000
/// * interest: 5000
/// * processing fee: 2500
pub async fn create_test_loan(
    db: &DatabaseConnection,
    account_id: i64,
    loan_number: &str,
) -> Result<entities::loan::Model> {
    loan::create_loan(
        db,
        NewLoan {
            loan_number: loan_number.to_string(),
            account_id,
            principal: Decimal::from(50_000),
            interest: Decimal::from(5_000),
            processing_fee: Decimal::from(2_500),
        },
    )
    .await
}

/// A branch with one primary teller holding 1,000,000 and one empty sub teller.
pub struct Fixture {
    pub db: DatabaseConnection,
    pub settings: Settings,
    pub branch: entities::branch::Model,
    pub primary: entities::teller::Model,
    pub sub: entities::teller::Model,
}

/// Creates the standard branch, primary teller `BR001-P01` and sub teller `BR001-S01`.
pub async fn setup_branch_tellers() -> Result<Fixture> {
    let (db, branch) = setup_with_branch().await?;
    let primary =
        create_primary_teller(&db, branch.id, "BR001-P01", Decimal::from(1_000_000)).await?;
    let sub = create_sub_teller(&db, branch.id, "BR001-S01", primary.id).await?;
    Ok(Fixture {
        db,
        settings: Settings::default(),
        branch,
        primary,
        sub,
    })
}

/// Same as [`setup_branch_tellers`], with the primary till open and the sub
/// teller provisioned with 200,000 for [`business_date`].
pub async fn setup_open_day() -> Result<Fixture> {
    let fx = setup_branch_tellers().await?;
    open_primary(&fx).await?;
    provision(&fx, &[(10_000, 20)]).await?;
    Ok(fx)
}

/// Opens the fixture's primary till, counting its 1,000,000 in 10,000 notes.
pub async fn open_primary(fx: &Fixture) -> Result<primary_history::Model> {
    till::open_primary_till(
        &fx.db,
        &fx.settings,
        OpenPrimaryTill {
            teller_id: fx.primary.id,
            business_date: business_date(),
            user_id: "head-cashier".to_string(),
            counted: CashCount::from_notes(&[(10_000, 100)]),
        },
    )
    .await
}

/// Provisions the fixture's sub teller with `notes`.
pub async fn provision(fx: &Fixture, notes: &[(u32, u32)]) -> Result<sub_history::Model> {
    till::provision_sub_teller(
        &fx.db,
        &fx.settings,
        ProvisionSubTeller {
            primary_teller_id: fx.primary.id,
            sub_teller_id: fx.sub.id,
            business_date: business_date(),
            user_id: "head-cashier".to_string(),
            notes: CashCount::from_notes(notes),
        },
    )
    .await
}

/// Closes the fixture's sub teller day with `notes` counted at hand.
pub async fn close_sub(fx: &Fixture, notes: &[(u32, u32)]) -> Result<sub_history::Model> {
    till::close_sub_teller_day(
        &fx.db,
        &fx.settings,
        CloseSubTellerDay {
            sub_teller_id: fx.sub.id,
            business_date: business_date(),
            user_id: "cashier".to_string(),
            counted: CashCount::from_notes(notes),
            comment: None,
        },
    )
    .await
}

/// Closes the fixture's primary till with `notes` counted at hand.
pub async fn close_primary(fx: &Fixture, notes: &[(u32, u32)]) -> Result<primary_history::Model> {
    till::close_primary_till(
        &fx.db,
        &fx.settings,
        ClosePrimaryTill {
            teller_id: fx.primary.id,
            business_date: business_date(),
            user_id: "head-cashier".to_string(),
            counted: CashCount::from_notes(notes),
        },
    )
    .await
}
