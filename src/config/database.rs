//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    Account, AccountingEntry, BlockedAccount, Branch, CurrencyNote, Loan,
    PrimaryTellerProvisioningHistory, SubTellerProvisioningHistory, Teller, TellerOperation,
    Transaction,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/core_banking.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_dir(&database_url)?;
    tracing::debug!("Connecting to {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// `SQLite` creates the file with `mode=rwc` but not its directory.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Branch).await?;
    create_table(db, &schema, Account).await?;
    create_table(db, &schema, BlockedAccount).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, Teller).await?;
    create_table(db, &schema, TellerOperation).await?;
    create_table(db, &schema, PrimaryTellerProvisioningHistory).await?;
    create_table(db, &schema, SubTellerProvisioningHistory).await?;
    create_table(db, &schema, CurrencyNote).await?;
    create_table(db, &schema, AccountingEntry).await?;
    create_table(db, &schema, Loan).await?;

    Ok(())
}
