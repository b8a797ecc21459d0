//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod accounting_entry;
pub mod blocked_account;
pub mod branch;
pub mod currency_note;
pub mod loan;
pub mod primary_teller_provisioning_history;
pub mod sub_teller_provisioning_history;
pub mod teller;
pub mod teller_operation;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use accounting_entry::{
    Column as AccountingEntryColumn, Entity as AccountingEntry, Model as AccountingEntryModel,
};
pub use blocked_account::{
    Column as BlockedAccountColumn, Entity as BlockedAccount, Model as BlockedAccountModel,
};
pub use branch::{Column as BranchColumn, Entity as Branch, Model as BranchModel};
pub use currency_note::{
    Column as CurrencyNoteColumn, Entity as CurrencyNote, Model as CurrencyNoteModel,
};
pub use loan::{Column as LoanColumn, Entity as Loan, Model as LoanModel};
pub use primary_teller_provisioning_history::{
    Column as PrimaryTellerProvisioningHistoryColumn, Entity as PrimaryTellerProvisioningHistory,
    Model as PrimaryTellerProvisioningHistoryModel,
};
pub use sub_teller_provisioning_history::{
    Column as SubTellerProvisioningHistoryColumn, Entity as SubTellerProvisioningHistory,
    Model as SubTellerProvisioningHistoryModel,
};
pub use teller::{Column as TellerColumn, Entity as Teller, Model as TellerModel};
pub use teller_operation::{
    Column as TellerOperationColumn, Entity as TellerOperation, Model as TellerOperationModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};

/// Open/closed state shared by primary and sub-teller provisioning histories.
pub use primary_teller_provisioning_history::TillStatus;
