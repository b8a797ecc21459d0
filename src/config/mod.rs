/// Database configuration and connection management
pub mod database;

/// Bank, till, fee, ledger and seed settings loaded from config.toml
pub mod settings;

pub use settings::Settings;
