//! Double-entry accounting postings.
//!
//! Every cash movement is mirrored in the general ledger as one or more
//! [`Posting`]s, each debiting one GL account and crediting another by the same
//! positive amount. Because each row is balanced on its own, the sum of all
//! ledger balances is always zero.

use crate::{
    entities::{AccountingEntry, accounting_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;

/// A balanced debit/credit pair waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub debit: String,
    pub credit: String,
    pub amount: Decimal,
    pub narration: String,
}

impl Posting {
    /// Builds a posting, rejecting non-positive amounts and self-postings.
    pub fn new(
        debit: impl Into<String>,
        credit: impl Into<String>,
        amount: Decimal,
        narration: impl Into<String>,
    ) -> Result<Self> {
        let debit = debit.into();
        let credit = credit.into();
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidPosting {
                message: format!("amount {amount} must be positive"),
            });
        }
        if debit.trim().is_empty() || credit.trim().is_empty() {
            return Err(Error::InvalidPosting {
                message: "GL account codes cannot be empty".to_string(),
            });
        }
        if debit == credit {
            return Err(Error::InvalidPosting {
                message: format!("debit and credit are both {debit}"),
            });
        }
        Ok(Self {
            debit,
            credit,
            amount,
            narration: narration.into(),
        })
    }
}

/// Writes the postings of one operation under its business reference.
pub async fn post_entries<C>(
    db: &C,
    reference: &str,
    branch_id: i64,
    business_date: NaiveDate,
    postings: &[Posting],
) -> Result<Vec<accounting_entry::Model>>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let mut written = Vec::with_capacity(postings.len());
    for posting in postings {
        let entry = accounting_entry::ActiveModel {
            reference: Set(reference.to_string()),
            branch_id: Set(branch_id),
            debit_account: Set(posting.debit.clone()),
            credit_account: Set(posting.credit.clone()),
            amount: Set(posting.amount),
            narration: Set(posting.narration.clone()),
            business_date: Set(business_date),
            created_at: Set(now),
            ..Default::default()
        };
        written.push(entry.insert(db).await?);
    }
    tracing::debug!(reference, entries = written.len(), "accounting entries posted");
    Ok(written)
}

/// All entries written for a reference, in insertion order.
pub async fn entries_for_reference<C>(
    db: &C,
    reference: &str,
) -> Result<Vec<accounting_entry::Model>>
where
    C: ConnectionTrait,
{
    AccountingEntry::find()
        .filter(accounting_entry::Column::Reference.eq(reference))
        .order_by_asc(accounting_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Balance of a GL account, credits minus debits.
pub async fn ledger_balance<C>(db: &C, gl_account: &str) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let entries = AccountingEntry::find()
        .filter(
            accounting_entry::Column::DebitAccount
                .eq(gl_account)
                .or(accounting_entry::Column::CreditAccount.eq(gl_account)),
        )
        .all(db)
        .await?;

    Ok(entries.iter().fold(Decimal::ZERO, |balance, entry| {
        let mut balance = balance;
        if entry.credit_account == gl_account {
            balance += entry.amount;
        }
        if entry.debit_account == gl_account {
            balance -= entry.amount;
        }
        balance
    }))
}

/// Balances of every GL account that has entries, credits minus debits.
pub async fn trial_balance<C>(db: &C) -> Result<BTreeMap<String, Decimal>>
where
    C: ConnectionTrait,
{
    let entries = AccountingEntry::find().all(db).await?;
    let mut balances: BTreeMap<String, Decimal> = BTreeMap::new();
    for entry in entries {
        *balances.entry(entry.credit_account).or_default() += entry.amount;
        *balances.entry(entry.debit_account).or_default() -= entry.amount;
    }
    Ok(balances)
}
