//! Cash-in orchestration at the teller counter.
//!
//! Four kinds of cash-in share one pipeline:
//!
//! - normal deposits credit a customer account ([`deposit_cash`])
//! - momokash collections credit a momokash collection account ([`collect_momokash`])
//! - loan repayments settle penalty, interest and principal ([`repay_loan`])
//! - loan processing fees are paid before disbursement ([`pay_loan_processing_fee`])
//!
//! Each one validates the counted notes against the amount, checks that the
//! teller's till is open for the business day, and then, inside a single
//! database transaction, updates the target, writes the transaction row(s),
//! raises the till balance, registers the currency notes and posts the
//! accounting entries. The customer is notified only after the commit, and a
//! failed notification never fails the operation.

use crate::{
    config::Settings,
    core::{
        account::{apply_balance_change, available_balance, ensure_can_receive_credit, get_account_by_number},
        accounting::{Posting, post_entries},
        denomination::{CashCount, register_currency_notes},
        loan::{RepaymentAllocation, allocate_repayment, get_loan_by_number, outstanding},
        notification::{Notification, Notifier, credit_message, loan_message},
        reference::{self, new_reference},
        teller::{TillMovement, adjust_teller_balance, require_teller},
        till::{OpenTill, record_cash_in, require_open_till},
    },
    entities::{
        account::{self, AccountType},
        accounting_entry,
        currency_note::Movement,
        loan::{self, LoanStatus},
        teller,
        teller_operation::OperationType,
        transaction::{self, TransactionType},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Cash handed over at the counter, common to every cash-in kind.
#[derive(Debug, Clone, Deserialize)]
pub struct CashIn {
    pub teller_id: i64,
    pub business_date: NaiveDate,
    pub amount: Decimal,
    /// Breakdown of the cash; must add up to `amount`
    pub notes: CashCount,
    pub depositor_name: Option<String>,
    pub description: Option<String>,
    /// Operator recording the operation
    pub user_id: String,
}

/// Input for [`deposit_cash`].
#[derive(Debug, Clone, Deserialize)]
pub struct CashDeposit {
    pub account_number: String,
    #[serde(flatten)]
    pub cash: CashIn,
}

/// Input for [`collect_momokash`].
#[derive(Debug, Clone, Deserialize)]
pub struct MomokashCollection {
    pub account_number: String,
    #[serde(flatten)]
    pub cash: CashIn,
}

/// Input for [`repay_loan`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoanRepayment {
    pub loan_number: String,
    #[serde(flatten)]
    pub cash: CashIn,
}

/// Input for [`pay_loan_processing_fee`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoanProcessingFee {
    pub loan_number: String,
    #[serde(flatten)]
    pub cash: CashIn,
}

/// Everything written by one cash-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    pub reference: String,
    pub transaction: transaction::Model,
    /// Fee charged on the account after the credit, if any
    pub fee_transaction: Option<transaction::Model>,
    pub account_balance: Decimal,
    pub teller_balance: Decimal,
    pub entries: Vec<accounting_entry::Model>,
    /// Loan after the payment, for loan operations
    pub loan: Option<loan::Model>,
    pub allocation: Option<RepaymentAllocation>,
}

/// Fee due on a cash deposit of `amount`.
#[must_use]
pub fn deposit_fee(settings: &Settings, amount: Decimal) -> Decimal {
    (settings.fees.deposit_flat + settings.fees.deposit_rate * amount).round_dp(2)
}

/// Commission due on a momokash collection of `amount`.
#[must_use]
pub fn momokash_commission(settings: &Settings, amount: Decimal) -> Decimal {
    (settings.fees.momokash_rate * amount).round_dp(2)
}

fn validate_cash(settings: &Settings, cash: &CashIn) -> Result<()> {
    if cash.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: cash.amount,
        });
    }
    if cash.user_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "Operator id cannot be empty".to_string(),
        });
    }
    cash.notes
        .validate_against(&settings.denominations, cash.amount)
}

/// Loads the teller and the open history the cash will be booked against.
async fn open_counter(
    txn: &DatabaseTransaction,
    cash: &CashIn,
) -> Result<(teller::Model, OpenTill)> {
    let teller = require_teller(txn, cash.teller_id).await?;
    if !teller.is_active {
        return Err(Error::TellerNotAllowed {
            teller: teller.code,
            action: "take cash while inactive",
        });
    }
    let till = require_open_till(txn, &teller, cash.business_date).await?;
    Ok((teller, till))
}

/// Puts the cash in the till: balance, journal, day totals and notes.
async fn receive_cash(
    txn: &DatabaseTransaction,
    teller: teller::Model,
    till: OpenTill,
    cash: &CashIn,
    reference: &str,
    account_id: i64,
) -> Result<teller::Model> {
    let teller = adjust_teller_balance(
        txn,
        teller,
        cash.amount,
        TillMovement {
            reference,
            operation_type: OperationType::CashIn,
            account_id: Some(account_id),
            business_date: cash.business_date,
            performed_by: &cash.user_id,
        },
    )
    .await?;
    record_cash_in(txn, till, cash.amount).await?;
    register_currency_notes(
        txn,
        reference,
        teller.id,
        cash.business_date,
        Movement::In,
        &cash.notes,
    )
    .await?;
    Ok(teller)
}

struct NewTransaction<'a> {
    reference: &'a str,
    account: &'a account::Model,
    teller_id: i64,
    transaction_type: TransactionType,
    amount: Decimal,
    balance_before: Decimal,
    description: String,
    depositor_name: Option<String>,
    business_date: NaiveDate,
    created_by: &'a str,
}

async fn insert_transaction(
    txn: &DatabaseTransaction,
    new: NewTransaction<'_>,
) -> Result<transaction::Model> {
    let balance_after = if new.transaction_type.moves_balance() {
        new.account.balance
    } else {
        new.balance_before
    };
    transaction::ActiveModel {
        reference: Set(new.reference.to_string()),
        account_id: Set(new.account.id),
        teller_id: Set(Some(new.teller_id)),
        branch_id: Set(new.account.branch_id),
        transaction_type: Set(new.transaction_type),
        amount: Set(new.amount),
        balance_before: Set(new.balance_before),
        balance_after: Set(balance_after),
        description: Set(new.description),
        depositor_name: Set(new.depositor_name),
        business_date: Set(new.business_date),
        created_by: Set(new.created_by.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(Into::into)
}

fn notify_customer(notifier: &dyn Notifier, phone: Option<&str>, message: String) {
    let Some(phone) = phone else {
        return;
    };
    let notification = Notification {
        phone: phone.to_string(),
        message,
    };
    if let Err(e) = notifier.notify(&notification) {
        warn!(phone, "customer notification failed: {e}");
    }
}

/// How a credit to a customer account is booked.
#[derive(Debug, Clone, Copy)]
enum CreditKind {
    Deposit,
    Momokash,
}

impl CreditKind {
    const fn transaction_type(self) -> TransactionType {
        match self {
            Self::Deposit => TransactionType::Deposit,
            Self::Momokash => TransactionType::MomokashCollection,
        }
    }

    const fn reference_prefix(self) -> &'static str {
        match self {
            Self::Deposit => reference::DEPOSIT,
            Self::Momokash => reference::MOMOKASH,
        }
    }

    fn credit_gl(self, settings: &Settings) -> &str {
        match self {
            Self::Deposit => &settings.ledger.customer_deposits,
            Self::Momokash => &settings.ledger.momokash_float,
        }
    }

    fn fee(self, settings: &Settings, amount: Decimal) -> Decimal {
        match self {
            Self::Deposit => deposit_fee(settings, amount),
            Self::Momokash => momokash_commission(settings, amount),
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Deposit => "Cash deposit",
            Self::Momokash => "Momokash collection",
        }
    }
}

async fn credit_with_cash(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    account_number: &str,
    cash: &CashIn,
    kind: CreditKind,
) -> Result<DepositReceipt> {
    validate_cash(settings, cash)?;

    let txn = db.begin().await?;
    let (teller, till) = open_counter(&txn, cash).await?;

    let account = get_account_by_number(&txn, account_number)
        .await?
        .ok_or_else(|| Error::not_found("Account", account_number))?;
    ensure_can_receive_credit(&account)?;
    if matches!(kind, CreditKind::Momokash) && account.account_type != AccountType::Momokash {
        return Err(Error::Validation {
            message: format!("Account {account_number} is not a momokash collection account"),
        });
    }

    let reference = new_reference(kind.reference_prefix());
    let description = cash
        .description
        .clone()
        .unwrap_or_else(|| format!("{} by {}", kind.label(), teller.code));

    let balance_before = account.balance;
    let account = apply_balance_change(&txn, account, cash.amount).await?;
    let transaction = insert_transaction(
        &txn,
        NewTransaction {
            reference: &reference,
            account: &account,
            teller_id: teller.id,
            transaction_type: kind.transaction_type(),
            amount: cash.amount,
            balance_before,
            description,
            depositor_name: cash.depositor_name.clone(),
            business_date: cash.business_date,
            created_by: &cash.user_id,
        },
    )
    .await?;

    let credit_gl = kind.credit_gl(settings).to_string();
    let mut postings = vec![Posting::new(
        teller.cash_gl_account.as_str(),
        credit_gl.as_str(),
        cash.amount,
        format!("{} {}", kind.label(), account.account_number),
    )?];

    let fee = kind.fee(settings, cash.amount);
    let mut fee_transaction = None;
    let account = if fee <= Decimal::ZERO {
        account
    } else if available_balance(&account) < fee {
        warn!(account = %account.account_number, %fee, "fee waived: available balance too low");
        account
    } else {
        let before_fee = account.balance;
        let charged = apply_balance_change(&txn, account, -fee).await?;
        fee_transaction = Some(
            insert_transaction(
                &txn,
                NewTransaction {
                    reference: &reference,
                    account: &charged,
                    teller_id: teller.id,
                    transaction_type: TransactionType::Fee,
                    amount: -fee,
                    balance_before: before_fee,
                    description: format!("{} fee", kind.label()),
                    depositor_name: None,
                    business_date: cash.business_date,
                    created_by: &cash.user_id,
                },
            )
            .await?,
        );
        postings.push(Posting::new(
            credit_gl.as_str(),
            settings.ledger.fee_income.as_str(),
            fee,
            format!("{} fee {}", kind.label(), charged.account_number),
        )?);
        charged
    };

    let teller = receive_cash(&txn, teller, till, cash, &reference, account.id).await?;
    let entries = post_entries(
        &txn,
        &reference,
        teller.branch_id,
        cash.business_date,
        &postings,
    )
    .await?;
    txn.commit().await?;

    info!(
        account = %account.account_number,
        teller = %teller.code,
        amount = %cash.amount,
        %fee,
        %reference,
        "{} processed",
        kind.label()
    );

    notify_customer(
        notifier,
        account.customer_phone.as_deref(),
        credit_message(
            &settings.bank.name,
            &account.account_number,
            cash.amount,
            &account.currency,
            account.balance,
            &reference,
        ),
    );

    Ok(DepositReceipt {
        reference,
        transaction,
        fee_transaction,
        account_balance: account.balance,
        teller_balance: teller.balance,
        entries,
        loan: None,
        allocation: None,
    })
}

/// Deposits cash on a customer account.
///
/// # Errors
/// Returns an error if:
/// - The amount is not positive, or the notes do not add up to it
/// - The teller does not exist, is inactive, or its till is not open for the date
/// - The account does not exist or cannot receive deposits
/// - The till would exceed its maximum balance
pub async fn deposit_cash(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    request: CashDeposit,
) -> Result<DepositReceipt> {
    credit_with_cash(
        db,
        settings,
        notifier,
        &request.account_number,
        &request.cash,
        CreditKind::Deposit,
    )
    .await
}

/// Collects momokash cash onto a momokash collection account.
///
/// Same rules as [`deposit_cash`], and the account must be a momokash account.
pub async fn collect_momokash(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    request: MomokashCollection,
) -> Result<DepositReceipt> {
    credit_with_cash(
        db,
        settings,
        notifier,
        &request.account_number,
        &request.cash,
        CreditKind::Momokash,
    )
    .await
}

async fn load_payable_loan(txn: &DatabaseTransaction, loan_number: &str) -> Result<loan::Model> {
    get_loan_by_number(txn, loan_number)
        .await?
        .ok_or_else(|| Error::not_found("Loan", loan_number))
}

/// Takes a cash repayment on a loan.
///
/// # Errors
/// Returns an error if:
/// - The amount or notes are invalid, or the till is not open
/// - The loan does not exist, is not disbursed yet, or is already repaid
/// - The amount exceeds what is outstanding
pub async fn repay_loan(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    request: LoanRepayment,
) -> Result<DepositReceipt> {
    let cash = &request.cash;
    validate_cash(settings, cash)?;

    let txn = db.begin().await?;
    let (teller, till) = open_counter(&txn, cash).await?;
    let loan = load_payable_loan(&txn, &request.loan_number).await?;
    match loan.status {
        LoanStatus::Repaid => {
            return Err(Error::LoanAlreadyRepaid {
                loan_number: loan.loan_number,
            });
        }
        LoanStatus::Approved => {
            return Err(Error::Validation {
                message: format!("Loan {} is not disbursed yet", loan.loan_number),
            });
        }
        LoanStatus::Disbursed => {}
    }
    let allocation = allocate_repayment(&loan, cash.amount)?;
    let account = crate::core::account::require_account(&txn, loan.account_id).await?;

    let reference = new_reference(reference::LOAN_REPAYMENT);
    let principal_left = loan.principal_outstanding - allocation.principal;
    let interest_left = loan.interest_outstanding - allocation.interest;
    let penalty_left = loan.penalty_outstanding - allocation.penalty;
    let fully_repaid = principal_left + interest_left + penalty_left == Decimal::ZERO;

    let mut active: loan::ActiveModel = loan.into();
    active.principal_outstanding = Set(principal_left);
    active.interest_outstanding = Set(interest_left);
    active.penalty_outstanding = Set(penalty_left);
    if fully_repaid {
        active.status = Set(LoanStatus::Repaid);
    }
    active.updated_at = Set(chrono::Utc::now());
    let loan = active.update(&txn).await?;

    let transaction = insert_transaction(
        &txn,
        NewTransaction {
            reference: &reference,
            account: &account,
            teller_id: teller.id,
            transaction_type: TransactionType::LoanRepayment,
            amount: cash.amount,
            balance_before: account.balance,
            description: cash
                .description
                .clone()
                .unwrap_or_else(|| format!("Repayment of loan {}", loan.loan_number)),
            depositor_name: cash.depositor_name.clone(),
            business_date: cash.business_date,
            created_by: &cash.user_id,
        },
    )
    .await?;

    let ledger = &settings.ledger;
    let mut postings = Vec::with_capacity(3);
    for (part, credit, label) in [
        (allocation.penalty, &ledger.loan_penalty_income, "penalty"),
        (allocation.interest, &ledger.loan_interest_income, "interest"),
        (allocation.principal, &ledger.loan_principal, "principal"),
    ] {
        if part > Decimal::ZERO {
            postings.push(Posting::new(
                teller.cash_gl_account.as_str(),
                credit.as_str(),
                part,
                format!("Loan {} {label}", loan.loan_number),
            )?);
        }
    }

    let teller = receive_cash(&txn, teller, till, cash, &reference, account.id).await?;
    let entries = post_entries(
        &txn,
        &reference,
        teller.branch_id,
        cash.business_date,
        &postings,
    )
    .await?;
    txn.commit().await?;

    let remaining = outstanding(&loan);
    info!(
        loan = %loan.loan_number,
        amount = %cash.amount,
        %remaining,
        %reference,
        "loan repayment processed"
    );
    notify_customer(
        notifier,
        account.customer_phone.as_deref(),
        loan_message(
            &settings.bank.name,
            &loan.loan_number,
            cash.amount,
            &account.currency,
            remaining,
            &reference,
        ),
    );

    Ok(DepositReceipt {
        reference,
        transaction,
        fee_transaction: None,
        account_balance: account.balance,
        teller_balance: teller.balance,
        entries,
        loan: Some(loan),
        allocation: Some(allocation),
    })
}

/// Takes the processing fee of an approved loan in cash.
///
/// # Errors
/// Returns an error if:
/// - The amount or notes are invalid, or the till is not open
/// - The loan does not exist or its fee is already paid
/// - The amount differs from the processing fee
pub async fn pay_loan_processing_fee(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    request: LoanProcessingFee,
) -> Result<DepositReceipt> {
    let cash = &request.cash;
    validate_cash(settings, cash)?;

    let txn = db.begin().await?;
    let (teller, till) = open_counter(&txn, cash).await?;
    let loan = load_payable_loan(&txn, &request.loan_number).await?;
    if loan.processing_fee_paid {
        return Err(Error::FeeAlreadyPaid {
            loan_number: loan.loan_number,
        });
    }
    if cash.amount != loan.processing_fee {
        return Err(Error::FeeMismatch {
            loan_number: loan.loan_number,
            expected: loan.processing_fee,
            received: cash.amount,
        });
    }
    let account = crate::core::account::require_account(&txn, loan.account_id).await?;

    let reference = new_reference(reference::LOAN_FEE);
    let mut active: loan::ActiveModel = loan.into();
    active.processing_fee_paid = Set(true);
    active.updated_at = Set(chrono::Utc::now());
    let loan = active.update(&txn).await?;

    let transaction = insert_transaction(
        &txn,
        NewTransaction {
            reference: &reference,
            account: &account,
            teller_id: teller.id,
            transaction_type: TransactionType::LoanProcessingFee,
            amount: cash.amount,
            balance_before: account.balance,
            description: cash
                .description
                .clone()
                .unwrap_or_else(|| format!("Processing fee of loan {}", loan.loan_number)),
            depositor_name: cash.depositor_name.clone(),
            business_date: cash.business_date,
            created_by: &cash.user_id,
        },
    )
    .await?;

    let posting = Posting::new(
        teller.cash_gl_account.as_str(),
        settings.ledger.fee_income.as_str(),
        cash.amount,
        format!("Processing fee loan {}", loan.loan_number),
    )?;
    let teller = receive_cash(&txn, teller, till, cash, &reference, account.id).await?;
    let entries = post_entries(
        &txn,
        &reference,
        teller.branch_id,
        cash.business_date,
        &[posting],
    )
    .await?;
    txn.commit().await?;

    info!(loan = %loan.loan_number, amount = %cash.amount, %reference, "loan processing fee paid");
    notify_customer(
        notifier,
        account.customer_phone.as_deref(),
        loan_message(
            &settings.bank.name,
            &loan.loan_number,
            cash.amount,
            &account.currency,
            outstanding(&loan),
            &reference,
        ),
    );

    Ok(DepositReceipt {
        reference,
        transaction,
        fee_transaction: None,
        account_balance: account.balance,
        teller_balance: teller.balance,
        entries,
        loan: Some(loan),
        allocation: None,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        account::{change_status, require_account},
        accounting::{ledger_balance, trial_balance},
        denomination::count_for_reference,
        loan::mark_disbursed,
        notification::LogNotifier,
        teller::{NewTeller, create_teller},
        till::{get_primary_history, get_sub_history},
    };
    use crate::entities::{account::AccountStatus, teller::TellerType};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Mutex;

    /// Records notifications instead of sending them.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _notification: &Notification) -> Result<()> {
            Err(Error::Notification {
                message: "gateway down".to_string(),
            })
        }
    }

    fn cash(fx: &Fixture, amount: Decimal, notes: &[(u32, u32)]) -> CashIn {
        CashIn {
            teller_id: fx.sub.id,
            business_date: business_date(),
            amount,
            notes: CashCount::from_notes(notes),
            depositor_name: Some("Jean".to_string()),
            description: None,
            user_id: "cashier".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deposit_validation_before_database() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let settings = Settings::default();
        let request = CashDeposit {
            account_number: "BR0010000001".to_string(),
            cash: CashIn {
                teller_id: 1,
                business_date: business_date(),
                amount: dec!(0),
                notes: CashCount::default(),
                depositor_name: None,
                description: None,
                user_id: "cashier".to_string(),
            },
        };
        let err = deposit_cash(&db, &settings, &LogNotifier, request.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let mut mismatched = request;
        mismatched.cash.amount = dec!(5000);
        mismatched.cash.notes = CashCount::from_notes(&[(2_000, 2)]);
        let err = deposit_cash(&db, &settings, &LogNotifier, mismatched)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DenominationMismatch { .. }));
        assert_eq!(err.status_code(), 403);
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_into_missing_account_is_not_found() -> Result<()> {
        let fx = setup_open_day().await?;
        let err = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: "BR0019999999".to_string(),
                cash: cash(&fx, dec!(5000), &[(5_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Account", .. }));
        assert_eq!(err.status_code(), 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_requires_open_till() -> Result<()> {
        let fx = setup_branch_tellers().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        let err = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(5000), &[(5_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TillNotOpen { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_updates_everything() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        let notifier = RecordingNotifier::default();

        let receipt = deposit_cash(
            &fx.db,
            &fx.settings,
            &notifier,
            CashDeposit {
                account_number: account.account_number.clone(),
                cash: cash(&fx, dec!(25000), &[(10_000, 2), (5_000, 1)]),
            },
        )
        .await?;

        assert!(receipt.reference.starts_with("DEP-"));
        assert_eq!(receipt.transaction.transaction_type, TransactionType::Deposit);
        assert_eq!(receipt.transaction.amount, dec!(25000));
        assert_eq!(receipt.transaction.balance_before, Decimal::ZERO);
        assert_eq!(receipt.transaction.balance_after, dec!(25000));
        assert_eq!(receipt.transaction.depositor_name.as_deref(), Some("Jean"));
        assert!(receipt.fee_transaction.is_none());
        assert_eq!(receipt.account_balance, dec!(25000));
        assert_eq!(receipt.teller_balance, dec!(225000));

        let history = get_sub_history(&fx.db, fx.sub.id, business_date()).await?.unwrap();
        assert_eq!(history.cash_in, dec!(25000));

        let notes = count_for_reference(&fx.db, &receipt.reference).await?;
        assert_eq!(notes.total(), dec!(25000));

        assert_eq!(receipt.entries.len(), 1);
        assert_eq!(
            ledger_balance(&fx.db, &fx.settings.ledger.customer_deposits).await?,
            dec!(25000)
        );

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains(&account.account_number));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_charges_fee() -> Result<()> {
        let mut fx = setup_open_day().await?;
        fx.settings.fees.deposit_flat = dec!(100);
        fx.settings.fees.deposit_rate = dec!(0.01);
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;

        let receipt = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(10000), &[(10_000, 1)]),
            },
        )
        .await?;

        let fee = receipt.fee_transaction.unwrap();
        assert_eq!(fee.transaction_type, TransactionType::Fee);
        assert_eq!(fee.amount, dec!(-200));
        assert_eq!(fee.balance_before, dec!(10000));
        assert_eq!(fee.balance_after, dec!(9800));
        assert_eq!(receipt.account_balance, dec!(9800));
        // The till holds the full cash amount; the fee only moves on the ledger
        assert_eq!(receipt.teller_balance, dec!(210000));
        assert_eq!(ledger_balance(&fx.db, &fx.settings.ledger.fee_income).await?, dec!(200));
        assert_eq!(
            ledger_balance(&fx.db, &fx.settings.ledger.customer_deposits).await?,
            dec!(9800)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_fee_waived_when_balance_too_low() -> Result<()> {
        let mut fx = setup_open_day().await?;
        fx.settings.fees.deposit_flat = dec!(1000);
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;

        let receipt = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(500), &[(500, 1)]),
            },
        )
        .await?;

        assert!(receipt.fee_transaction.is_none());
        assert_eq!(receipt.account_balance, dec!(500));
        assert_eq!(receipt.entries.len(), 1);
        assert_eq!(ledger_balance(&fx.db, &fx.settings.ledger.fee_income).await?, Decimal::ZERO);
        assert_eq!(
            ledger_balance(&fx.db, &fx.settings.ledger.customer_deposits).await?,
            dec!(500)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_primary_teller_takes_counter_cash() -> Result<()> {
        let fx = setup_branch_tellers().await?;
        open_primary(&fx).await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;

        let mut counter = cash(&fx, dec!(25000), &[(10_000, 2), (5_000, 1)]);
        counter.teller_id = fx.primary.id;
        let receipt = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: counter,
            },
        )
        .await?;
        assert_eq!(receipt.teller_balance, dec!(1025000));
        assert_eq!(receipt.transaction.teller_id, Some(fx.primary.id));

        let primary_day = get_primary_history(&fx.db, fx.primary.id, business_date())
            .await?
            .unwrap();
        assert_eq!(primary_day.cash_in, dec!(25000));
        assert!(get_sub_history(&fx.db, fx.sub.id, business_date()).await?.is_none());

        // The counter cash is part of what the primary must count at closing
        let closed = close_primary(&fx, &[(10_000, 102), (5_000, 1)]).await?;
        assert_eq!(closed.difference, Some(Decimal::ZERO));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_refused_over_till_limit() -> Result<()> {
        let mut fx = setup_branch_tellers().await?;
        fx.sub = create_teller(
            &fx.db,
            NewTeller {
                code: "BR001-S05".to_string(),
                name: "Capped counter".to_string(),
                branch_id: fx.branch.id,
                teller_type: TellerType::Sub,
                primary_teller_id: Some(fx.primary.id),
                opening_balance: Decimal::ZERO,
                max_balance: dec!(200000),
                cash_gl_account: "5711-BR001-S05".to_string(),
                user_id: None,
            },
        )
        .await?;
        open_primary(&fx).await?;
        provision(&fx, &[(10_000, 20)]).await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;

        let err = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(5000), &[(5_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TellerLimitExceeded { .. }));
        assert_eq!(err.status_code(), 403);

        // Rolled back: neither the till nor the account moved
        let sub = reload_teller(&fx.db, fx.sub.id).await?;
        assert_eq!(sub.balance, dec!(200000));
        let account = require_account(&fx.db, account.id).await?;
        assert_eq!(account.balance, Decimal::ZERO);
        let history = get_sub_history(&fx.db, fx.sub.id, business_date()).await?.unwrap();
        assert_eq!(history.cash_in, Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_refused_on_frozen_account() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        change_status(&fx.db, account.id, AccountStatus::Frozen, "officer").await?;

        let err = deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(5000), &[(5_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AccountNotOperational { .. }));
        assert_eq!(err.status_code(), 403);

        // Nothing was written: the till is untouched
        let sub = reload_teller(&fx.db, fx.sub.id).await?;
        assert_eq!(sub.balance, dec!(200000));
        Ok(())
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_deposit() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;

        let receipt = deposit_cash(
            &fx.db,
            &fx.settings,
            &FailingNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(5000), &[(5_000, 1)]),
            },
        )
        .await?;
        assert_eq!(receipt.account_balance, dec!(5000));
        Ok(())
    }

    #[tokio::test]
    async fn test_momokash_collection() -> Result<()> {
        let mut fx = setup_open_day().await?;
        fx.settings.fees.momokash_rate = dec!(0.01);
        let savings = create_test_account(&fx.db, fx.branch.id, "AGENT-1").await?;
        let momokash =
            create_custom_account(&fx.db, fx.branch.id, "AGENT-1", AccountType::Momokash).await?;

        let err = collect_momokash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            MomokashCollection {
                account_number: savings.account_number,
                cash: cash(&fx, dec!(50000), &[(10_000, 5)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let receipt = collect_momokash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            MomokashCollection {
                account_number: momokash.account_number,
                cash: cash(&fx, dec!(50000), &[(10_000, 5)]),
            },
        )
        .await?;
        assert!(receipt.reference.starts_with("MMK-"));
        assert_eq!(
            receipt.transaction.transaction_type,
            TransactionType::MomokashCollection
        );
        assert_eq!(receipt.fee_transaction.unwrap().amount, dec!(-500));
        assert_eq!(receipt.account_balance, dec!(49500));
        assert_eq!(
            ledger_balance(&fx.db, &fx.settings.ledger.momokash_float).await?,
            dec!(49500)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_loan_repayment_allocates_and_posts() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_funded_account(&fx.db, fx.branch.id, "CUST-1", dec!(700)).await?;
        let loan = create_test_loan(&fx.db, account.id, "LN-1").await?;
        mark_disbursed(&fx.db, loan).await?;

        let receipt = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(15000), &[(10_000, 1), (5_000, 1)]),
            },
        )
        .await?;

        let allocation = receipt.allocation.unwrap();
        assert_eq!(allocation.interest, dec!(5000));
        assert_eq!(allocation.principal, dec!(10000));
        let loan = receipt.loan.unwrap();
        assert_eq!(loan.principal_outstanding, dec!(40000));
        assert_eq!(loan.interest_outstanding, Decimal::ZERO);
        assert_eq!(loan.status, LoanStatus::Disbursed);

        // The deposit balance is untouched by a cash repayment
        assert_eq!(receipt.transaction.balance_before, dec!(700));
        assert_eq!(receipt.transaction.balance_after, dec!(700));
        assert_eq!(receipt.entries.len(), 2);
        assert_eq!(
            ledger_balance(&fx.db, &fx.settings.ledger.loan_interest_income).await?,
            dec!(5000)
        );

        // Overpaying what is left is refused
        let err = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(50000), &[(10_000, 5)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Overpayment { .. }));

        let receipt = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(40000), &[(10_000, 4)]),
            },
        )
        .await?;
        assert_eq!(receipt.loan.unwrap().status, LoanStatus::Repaid);

        let err = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(1000), &[(1_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::LoanAlreadyRepaid { .. }));
        assert_eq!(err.status_code(), 409);
        Ok(())
    }

    #[tokio::test]
    async fn test_repayment_of_undisbursed_loan_refused() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        create_test_loan(&fx.db, account.id, "LN-1").await?;

        let err = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(1000), &[(1_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = repay_loan(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanRepayment {
                loan_number: "LN-404".to_string(),
                cash: cash(&fx, dec!(1000), &[(1_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_loan_processing_fee() -> Result<()> {
        let fx = setup_open_day().await?;
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        create_test_loan(&fx.db, account.id, "LN-1").await?;

        let err = pay_loan_processing_fee(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanProcessingFee {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(2000), &[(2_000, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::FeeMismatch { .. }));
        assert_eq!(err.status_code(), 403);

        let receipt = pay_loan_processing_fee(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanProcessingFee {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(2500), &[(2_000, 1), (500, 1)]),
            },
        )
        .await?;
        assert!(receipt.loan.unwrap().processing_fee_paid);
        assert_eq!(
            receipt.transaction.transaction_type,
            TransactionType::LoanProcessingFee
        );
        assert_eq!(receipt.transaction.balance_before, Decimal::ZERO);
        assert_eq!(receipt.transaction.balance_after, Decimal::ZERO);
        assert_eq!(receipt.account_balance, Decimal::ZERO);
        assert_eq!(ledger_balance(&fx.db, &fx.settings.ledger.fee_income).await?, dec!(2500));

        let err = pay_loan_processing_fee(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            LoanProcessingFee {
                loan_number: "LN-1".to_string(),
                cash: cash(&fx, dec!(2500), &[(2_000, 1), (500, 1)]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::FeeAlreadyPaid { .. }));
        assert_eq!(err.status_code(), 409);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_stays_balanced() -> Result<()> {
        let mut fx = setup_open_day().await?;
        fx.settings.fees.deposit_flat = dec!(50);
        let account = create_test_account(&fx.db, fx.branch.id, "CUST-1").await?;
        deposit_cash(
            &fx.db,
            &fx.settings,
            &LogNotifier,
            CashDeposit {
                account_number: account.account_number,
                cash: cash(&fx, dec!(3000), &[(1_000, 3)]),
            },
        )
        .await?;

        let trial = trial_balance(&fx.db).await?;
        assert_eq!(trial.values().copied().sum::<Decimal>(), Decimal::ZERO);
        let account = require_account(&fx.db, account.id).await?;
        assert_eq!(account.balance, dec!(2950));
        Ok(())
    }
}
