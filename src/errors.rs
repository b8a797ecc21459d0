//! Unified error type for the core-banking handlers.
//!
//! Every business rule violation has its own variant so callers can match on it,
//! and [`Error::status_code`] maps each variant onto the HTTP-style code carried
//! by a [`ServiceResponse`](crate::handlers::response::ServiceResponse).

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the business layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    #[error("Account {account_number} is {status} and cannot {action}")]
    AccountNotOperational {
        account_number: String,
        status: String,
        action: &'static str,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Account {account_number} is already {status}")]
    StatusUnchanged {
        account_number: String,
        status: String,
    },

    #[error("Account {account_number} cannot be closed: {reason}")]
    AccountNotClosable {
        account_number: String,
        reason: String,
    },

    #[error("Blocked amount {block_id} was already released")]
    AlreadyReleased { block_id: i64 },

    #[error("Teller {teller} is not allowed to {action}")]
    TellerNotAllowed {
        teller: String,
        action: &'static str,
    },

    #[error("Till of teller {teller} is not open for {date}")]
    TillNotOpen { teller: String, date: String },

    #[error("Till of teller {teller} is already open")]
    TillAlreadyOpen { teller: String },

    #[error("Till of teller {teller} is already closed for {date}")]
    TillAlreadyClosed { teller: String, date: String },

    #[error("Sub tellers still open under {teller}: {open}")]
    SubTillsStillOpen { teller: String, open: String },

    #[error("Teller {teller} would exceed its maximum balance of {max_balance}")]
    TellerLimitExceeded {
        teller: String,
        max_balance: Decimal,
    },

    #[error("Counted cash {counted} does not match expected {expected}")]
    DenominationMismatch { counted: Decimal, expected: Decimal },

    #[error("Unknown {kind} denomination {value}")]
    UnknownDenomination { kind: &'static str, value: u32 },

    #[error(
        "Closing difference {difference} exceeds tolerance {tolerance} (expected {expected}, counted {counted})"
    )]
    ClosingDifference {
        expected: Decimal,
        counted: Decimal,
        difference: Decimal,
        tolerance: Decimal,
    },

    #[error("Loan {loan_number} is already repaid")]
    LoanAlreadyRepaid { loan_number: String },

    #[error("Repayment {amount} exceeds outstanding balance {outstanding} of loan {loan_number}")]
    Overpayment {
        loan_number: String,
        amount: Decimal,
        outstanding: Decimal,
    },

    #[error("Processing fee of loan {loan_number} is already paid")]
    FeeAlreadyPaid { loan_number: String },

    #[error("Processing fee of loan {loan_number} is {expected}, received {received}")]
    FeeMismatch {
        loan_number: String,
        expected: Decimal,
        received: Decimal,
    },

    #[error("Unbalanced posting: {message}")]
    InvalidPosting { message: String },

    #[error("Notification failed: {message}")]
    Notification { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP-style status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::UnknownDenomination { .. }
            | Self::InvalidPosting { .. } => 400,
            Self::InsufficientFunds { .. }
            | Self::AccountNotOperational { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::AccountNotClosable { .. }
            | Self::TellerNotAllowed { .. }
            | Self::TillNotOpen { .. }
            | Self::TellerLimitExceeded { .. }
            | Self::DenominationMismatch { .. }
            | Self::ClosingDifference { .. }
            | Self::Overpayment { .. }
            | Self::FeeMismatch { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Duplicate { .. }
            | Self::StatusUnchanged { .. }
            | Self::AlreadyReleased { .. }
            | Self::TillAlreadyOpen { .. }
            | Self::TillAlreadyClosed { .. }
            | Self::SubTillsStillOpen { .. }
            | Self::LoanAlreadyRepaid { .. }
            | Self::FeeAlreadyPaid { .. } => 409,
            Self::Config { .. } | Self::Notification { .. } | Self::Database(_) | Self::Io(_) => {
                500
            }
        }
    }

    /// Shorthand for a [`Error::NotFound`] keyed by anything displayable.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
