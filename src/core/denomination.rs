//! Cash denomination counting and currency-note registration.
//!
//! Every physical cash movement (deposit, provisioning, closing) is described by
//! a [`CashCount`]: how many notes and coins of each face value changed hands.
//! Counts are validated against the configured denominations, checked against
//! the declared amount, and stored as `currency_notes` rows under the movement's
//! business reference so they can be aggregated later.

use crate::{
    config::settings::DenominationSettings,
    entities::{
        CurrencyNote,
        currency_note::{self, CurrencyKind, Movement},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quantities per face value, split into notes and coins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashCount {
    /// Face value -> number of notes
    #[serde(default)]
    pub notes: BTreeMap<u32, u32>,
    /// Face value -> number of coins
    #[serde(default)]
    pub coins: BTreeMap<u32, u32>,
}

impl CashCount {
    /// Builds a count from `(face value, quantity)` note pairs.
    #[must_use]
    pub fn from_notes(notes: &[(u32, u32)]) -> Self {
        Self {
            notes: notes.iter().copied().collect(),
            coins: BTreeMap::new(),
        }
    }

    /// Adds coins to the count, returning it for chaining.
    #[must_use]
    pub fn with_coins(mut self, coins: &[(u32, u32)]) -> Self {
        self.coins.extend(coins.iter().copied());
        self
    }

    /// Total value of the counted cash.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.notes
            .iter()
            .chain(self.coins.iter())
            .map(|(value, quantity)| Decimal::from(u64::from(*value) * u64::from(*quantity)))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.values().chain(self.coins.values()).all(|q| *q == 0)
    }

    /// Adds every quantity of `other` into `self`.
    ///
    /// # Errors
    /// Returns a validation error if a quantity would overflow.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        for (value, quantity) in &other.notes {
            add_quantity(&mut self.notes, *value, *quantity)?;
        }
        for (value, quantity) in &other.coins {
            add_quantity(&mut self.coins, *value, *quantity)?;
        }
        Ok(())
    }

    /// Checks that every face value is accepted and every quantity is positive.
    pub fn validate(&self, accepted: &DenominationSettings) -> Result<()> {
        for (value, quantity) in &self.notes {
            if !accepted.notes.contains(value) {
                return Err(Error::UnknownDenomination {
                    kind: "note",
                    value: *value,
                });
            }
            if *quantity == 0 {
                return Err(Error::Validation {
                    message: format!("note {value} has a zero quantity"),
                });
            }
        }
        for (value, quantity) in &self.coins {
            if !accepted.coins.contains(value) {
                return Err(Error::UnknownDenomination {
                    kind: "coin",
                    value: *value,
                });
            }
            if *quantity == 0 {
                return Err(Error::Validation {
                    message: format!("coin {value} has a zero quantity"),
                });
            }
        }
        Ok(())
    }

    /// Validates the count and checks that it adds up to `expected`.
    pub fn validate_against(&self, accepted: &DenominationSettings, expected: Decimal) -> Result<()> {
        self.validate(accepted)?;
        let counted = self.total();
        if counted != expected {
            return Err(Error::DenominationMismatch { counted, expected });
        }
        Ok(())
    }
}

/// Persists the breakdown of one cash movement.
pub async fn register_currency_notes<C>(
    db: &C,
    reference: &str,
    teller_id: i64,
    business_date: NaiveDate,
    movement: Movement,
    count: &CashCount,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let rows: Vec<currency_note::ActiveModel> = count
        .notes
        .iter()
        .map(|entry| (CurrencyKind::Note, entry))
        .chain(count.coins.iter().map(|entry| (CurrencyKind::Coin, entry)))
        .filter(|(_, (_, quantity))| **quantity > 0)
        .map(|(kind, (value, quantity))| currency_note::ActiveModel {
            reference: Set(reference.to_string()),
            teller_id: Set(teller_id),
            business_date: Set(business_date),
            denomination: Set(i64::from(*value)),
            kind: Set(kind),
            quantity: Set(i64::from(*quantity)),
            movement: Set(movement),
            created_at: Set(now),
            ..Default::default()
        })
        .collect();

    if rows.is_empty() {
        return Ok(());
    }

    CurrencyNote::insert_many(rows).exec(db).await?;
    Ok(())
}

fn add_quantity(bucket: &mut BTreeMap<u32, u32>, value: u32, quantity: u32) -> Result<()> {
    let slot = bucket.entry(value).or_default();
    *slot = slot.checked_add(quantity).ok_or_else(|| Error::Validation {
        message: format!("too many pieces of {value} to count"),
    })?;
    Ok(())
}

fn accumulate(count: &mut CashCount, row: &currency_note::Model) -> Result<()> {
    let value = u32::try_from(row.denomination).map_err(|_| Error::Validation {
        message: format!("stored denomination {} is out of range", row.denomination),
    })?;
    let quantity = u32::try_from(row.quantity).map_err(|_| Error::Validation {
        message: format!("stored quantity {} is out of range", row.quantity),
    })?;
    let bucket = match row.kind {
        CurrencyKind::Note => &mut count.notes,
        CurrencyKind::Coin => &mut count.coins,
    };
    add_quantity(bucket, value, quantity)
}

/// Rebuilds the count registered under one reference.
pub async fn count_for_reference<C>(db: &C, reference: &str) -> Result<CashCount>
where
    C: ConnectionTrait,
{
    summarize(db, &[reference.to_string()]).await
}

/// Aggregates the counts registered under several references.
pub async fn summarize<C>(db: &C, references: &[String]) -> Result<CashCount>
where
    C: ConnectionTrait,
{
    let mut count = CashCount::default();
    if references.is_empty() {
        return Ok(count);
    }

    let rows = CurrencyNote::find()
        .filter(currency_note::Column::Reference.is_in(references.iter().cloned()))
        .order_by_desc(currency_note::Column::Denomination)
        .all(db)
        .await?;

    for row in &rows {
        accumulate(&mut count, row)?;
    }
    Ok(count)
}
