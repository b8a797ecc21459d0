//! Application settings loading from config.toml
//!
//! The settings file describes the institution (currency, fee schedule,
//! general-ledger account codes, accepted denominations, till tolerances) and
//! the branches and tellers to seed on first run. Every section has defaults,
//! so an empty file yields a usable configuration.

use crate::{
    entities::teller::TellerType,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub bank: BankSettings,
    pub till: TillSettings,
    pub fees: FeeSettings,
    pub ledger: LedgerSettings,
    pub denominations: DenominationSettings,
    /// Branches to seed
    pub branches: Vec<BranchConfig>,
    /// Tellers to seed
    pub tellers: Vec<TellerConfig>,
}

/// Institution-wide settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BankSettings {
    pub name: String,
    /// ISO currency code for new accounts
    pub currency: String,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            name: "Core Bank".to_string(),
            currency: "XAF".to_string(),
        }
    }
}

/// Open/close of day rules
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TillSettings {
    /// Largest absolute difference between counted and expected cash accepted at closing
    pub max_closing_difference: Decimal,
}

/// Fee schedule applied to cash-in operations
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FeeSettings {
    /// Flat fee charged on every normal deposit
    pub deposit_flat: Decimal,
    /// Proportional fee on normal deposits (0.01 = 1%)
    pub deposit_rate: Decimal,
    /// Commission charged on momokash collections (0.01 = 1%)
    pub momokash_rate: Decimal,
}

/// General-ledger account codes used by postings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerSettings {
    pub customer_deposits: String,
    pub momokash_float: String,
    pub fee_income: String,
    pub loan_principal: String,
    pub loan_interest_income: String,
    pub loan_penalty_income: String,
    /// Counting differences found at closing of day
    pub till_suspense: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            customer_deposits: "371000".to_string(),
            momokash_float: "372000".to_string(),
            fee_income: "721000".to_string(),
            loan_principal: "201000".to_string(),
            loan_interest_income: "702000".to_string(),
            loan_penalty_income: "703000".to_string(),
            till_suspense: "471000".to_string(),
        }
    }
}

/// Face values accepted at the counter
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DenominationSettings {
    pub notes: Vec<u32>,
    pub coins: Vec<u32>,
}

impl Default for DenominationSettings {
    fn default() -> Self {
        Self {
            notes: vec![10_000, 5_000, 2_000, 1_000, 500],
            coins: vec![500, 100, 50, 25, 10, 5, 1],
        }
    }
}

/// Configuration for a single branch
#[derive(Debug, Deserialize, Clone)]
pub struct BranchConfig {
    pub code: String,
    pub name: String,
}

/// Configuration for a single teller
#[derive(Debug, Deserialize, Clone)]
pub struct TellerConfig {
    pub code: String,
    pub name: String,
    /// Code of the branch the teller works in
    pub branch: String,
    pub teller_type: TellerType,
    /// Code of the primary teller, for sub tellers
    #[serde(default)]
    pub primary: Option<String>,
    /// Cash placed in the till when it is first seeded
    #[serde(default)]
    pub opening_balance: Decimal,
    #[serde(default)]
    pub max_balance: Decimal,
    pub cash_gl_account: String,
}

impl Settings {
    /// Checks cross-field consistency that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.till.max_closing_difference < Decimal::ZERO {
            return Err(Error::Config {
                message: "till.max_closing_difference cannot be negative".to_string(),
            });
        }
        let rates = [self.fees.deposit_rate, self.fees.momokash_rate];
        if rates.iter().any(|r| *r < Decimal::ZERO || *r >= Decimal::ONE) {
            return Err(Error::Config {
                message: "fee rates must be within [0, 1)".to_string(),
            });
        }
        if self.fees.deposit_flat < Decimal::ZERO {
            return Err(Error::Config {
                message: "fees.deposit_flat cannot be negative".to_string(),
            });
        }
        for teller in &self.tellers {
            if !self.branches.iter().any(|b| b.code == teller.branch) {
                return Err(Error::Config {
                    message: format!(
                        "teller {} references unknown branch {}",
                        teller.code, teller.branch
                    ),
                });
            }
            match (teller.teller_type, &teller.primary) {
                (TellerType::Sub, None) => {
                    return Err(Error::Config {
                        message: format!("sub teller {} needs a primary teller", teller.code),
                    });
                }
                (TellerType::Primary, Some(_)) => {
                    return Err(Error::Config {
                        message: format!("primary teller {} cannot have a primary", teller.code),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The settings are inconsistent (see [`Settings::validate`])
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_settings(&contents)
}

/// Parses and validates settings from TOML text
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from `CONFIG_PATH`, or ./config.toml when unset
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    tracing::debug!("Loading settings from {path}");
    load_settings(path)
}
