//! Core business logic - framework-agnostic account, till and cash-in operations.
//!
//! Functions here take a database connection (or transaction) and plain
//! request structs, and return entity models or summaries. They know nothing
//! about how they are invoked; see `handlers` for the command layer.

/// Account lifecycle, status changes and blocked amounts
pub mod account;
/// Double-entry postings to general-ledger accounts
pub mod accounting;
/// Currency note counts and their registration per operation
pub mod denomination;
/// Cash deposits, momokash collections and loan payments at the counter
pub mod deposit;
/// Loan balances and repayment allocation
pub mod loan;
/// Customer notifications
pub mod notification;
/// Operation reference numbers
pub mod reference;
/// Seeding of branches and tellers from settings
pub mod seed;
/// Teller registration and till balance movements
pub mod teller;
/// Open/close of day workflow for primary and sub tellers
pub mod till;
