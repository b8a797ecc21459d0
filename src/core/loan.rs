//! Loan balances and repayment allocation.
//!
//! Loans are created by the credit department (outside this crate); tellers only
//! collect repayments and processing fees against them. Repayments settle the
//! penalty first, then interest, then principal.

use crate::{
    entities::{
        Loan,
        loan::{self, LoanStatus},
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Input for [`create_loan`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoan {
    pub loan_number: String,
    pub account_id: i64,
    pub principal: Decimal,
    pub interest: Decimal,
    pub processing_fee: Decimal,
}

/// How a repayment is split across the loan buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepaymentAllocation {
    pub penalty: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
}

impl RepaymentAllocation {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.penalty + self.interest + self.principal
    }
}

/// Total still owed on a loan.
#[must_use]
pub fn outstanding(loan: &loan::Model) -> Decimal {
    loan.principal_outstanding + loan.interest_outstanding + loan.penalty_outstanding
}

/// Splits `amount` penalty first, then interest, then principal.
///
/// # Errors
/// Returns an error if the amount is not positive or exceeds what is outstanding.
pub fn allocate_repayment(loan: &loan::Model, amount: Decimal) -> Result<RepaymentAllocation> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    let total = outstanding(loan);
    if amount > total {
        return Err(Error::Overpayment {
            loan_number: loan.loan_number.clone(),
            amount,
            outstanding: total,
        });
    }

    let mut remaining = amount;
    let mut take = |bucket: Decimal| {
        let part = remaining.min(bucket);
        remaining -= part;
        part
    };
    let penalty = take(loan.penalty_outstanding);
    let interest = take(loan.interest_outstanding);
    let principal = take(loan.principal_outstanding);

    Ok(RepaymentAllocation {
        penalty,
        interest,
        principal,
    })
}

/// Registers a loan in `approved` status.
pub async fn create_loan<C>(db: &C, new_loan: NewLoan) -> Result<loan::Model>
where
    C: ConnectionTrait,
{
    if new_loan.loan_number.trim().is_empty() {
        return Err(Error::Validation {
            message: "Loan number cannot be empty".to_string(),
        });
    }
    if new_loan.principal <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: new_loan.principal,
        });
    }
    if new_loan.interest < Decimal::ZERO || new_loan.processing_fee < Decimal::ZERO {
        return Err(Error::Validation {
            message: "Loan interest and processing fee cannot be negative".to_string(),
        });
    }
    crate::core::account::require_account(db, new_loan.account_id).await?;
    if get_loan_by_number(db, new_loan.loan_number.trim()).await?.is_some() {
        return Err(Error::Duplicate {
            entity: "Loan",
            key: new_loan.loan_number,
        });
    }

    let now = chrono::Utc::now();
    loan::ActiveModel {
        loan_number: Set(new_loan.loan_number.trim().to_string()),
        account_id: Set(new_loan.account_id),
        principal_outstanding: Set(new_loan.principal),
        interest_outstanding: Set(new_loan.interest),
        penalty_outstanding: Set(Decimal::ZERO),
        processing_fee: Set(new_loan.processing_fee),
        processing_fee_paid: Set(new_loan.processing_fee == Decimal::ZERO),
        status: Set(LoanStatus::Approved),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a loan by its number.
pub async fn get_loan_by_number<C>(db: &C, loan_number: &str) -> Result<Option<loan::Model>>
where
    C: ConnectionTrait,
{
    Loan::find()
        .filter(loan::Column::LoanNumber.eq(loan_number))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks a loan disbursed. Disbursement itself happens in the credit system.
pub async fn mark_disbursed<C>(db: &C, loan: loan::Model) -> Result<loan::Model>
where
    C: ConnectionTrait,
{
    let mut active: loan::ActiveModel = loan.into();
    active.status = Set(LoanStatus::Disbursed);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}
