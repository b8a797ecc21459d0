use core_banking::{
    config::{database, settings},
    core::seed,
    errors::Result,
    handlers::AppContext,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application settings
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(bank = %settings.bank.name, currency = %settings.bank.currency, "Settings loaded.");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed branches and tellers from config.toml
    let report = seed::seed_from_settings(&db, &settings)
        .await
        .inspect_err(|e| error!("Failed to seed branches and tellers: {}", e))?;

    let ctx = AppContext::new(db, settings);
    info!(
        branches = ctx.settings.branches.len(),
        tellers = ctx.settings.tellers.len(),
        branches_created = report.branches_created,
        tellers_created = report.tellers_created,
        "Core banking services ready."
    );

    Ok(())
}
