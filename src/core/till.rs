//! Till open/close-of-day workflow.
//!
//! The business day of a branch follows a fixed sequence:
//!
//! 1. The primary teller opens its till by counting the vault cash
//!    ([`open_primary_till`]). The count must match the till balance.
//! 2. The primary teller provisions each sub teller ([`provision_sub_teller`]).
//!    This is the sub teller's opening of day: cash moves primary -> sub.
//! 3. Sub tellers take customer cash during the day (see `core::deposit`).
//! 4. Each sub teller closes ([`close_sub_teller_day`]): the counted cash at
//!    hand is reconciled against the till balance and handed back to the
//!    primary teller.
//! 5. The primary teller closes ([`close_primary_till`]) once every sub till
//!    it provisioned that day is closed.
//!
//! Every step runs in one database transaction and writes its teller
//! operations, currency notes and accounting entries together.

use crate::{
    config::Settings,
    core::{
        accounting::{Posting, post_entries},
        denomination::{CashCount, register_currency_notes, summarize},
        reference::{self, new_reference},
        teller::{TillMovement, adjust_teller_balance, require_teller},
    },
    entities::{
        PrimaryTellerProvisioningHistory, SubTellerProvisioningHistory, Teller, TillStatus,
        currency_note::Movement,
        primary_teller_provisioning_history as primary_history,
        sub_teller_provisioning_history as sub_history,
        teller::{self, TellerType},
        teller_operation::OperationType,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Input for [`open_primary_till`].
#[derive(Debug, Clone, Deserialize)]
pub struct OpenPrimaryTill {
    pub teller_id: i64,
    pub business_date: NaiveDate,
    pub user_id: String,
    /// Cash counted in the vault
    pub counted: CashCount,
}

/// Input for [`provision_sub_teller`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionSubTeller {
    pub primary_teller_id: i64,
    pub sub_teller_id: i64,
    pub business_date: NaiveDate,
    pub user_id: String,
    /// Notes and coins handed over; their total is the provisioned amount
    pub notes: CashCount,
}

/// Input for [`close_sub_teller_day`].
#[derive(Debug, Clone, Deserialize)]
pub struct CloseSubTellerDay {
    pub sub_teller_id: i64,
    pub business_date: NaiveDate,
    pub user_id: String,
    /// Cash counted at hand
    pub counted: CashCount,
    pub comment: Option<String>,
}

/// Input for [`close_primary_till`].
#[derive(Debug, Clone, Deserialize)]
pub struct ClosePrimaryTill {
    pub teller_id: i64,
    pub business_date: NaiveDate,
    pub user_id: String,
    /// Cash counted at hand
    pub counted: CashCount,
}

/// Day position of one sub till, as seen from its primary teller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTillSummary {
    pub teller_id: i64,
    pub opening_amount: Decimal,
    pub cash_in: Decimal,
    pub cash_at_hand: Option<Decimal>,
    pub difference: Option<Decimal>,
    pub status: TillStatus,
}

/// Denomination breakdown of everything a primary teller handed out and got back in a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TillDenominationSummary {
    pub primary_teller_id: i64,
    pub business_date: NaiveDate,
    /// Notes and coins handed to sub tellers at opening
    pub provisioned: CashCount,
    /// Notes and coins returned by sub tellers at closing
    pub returned: CashCount,
    pub provisioned_total: Decimal,
    pub returned_total: Decimal,
    pub sub_tills: Vec<SubTillSummary>,
}

/// The open provisioning history a counter operation is booked against.
#[derive(Debug, Clone)]
pub(crate) enum OpenTill {
    Primary(primary_history::Model),
    Sub(sub_history::Model),
}

pub async fn get_primary_history<C>(
    db: &C,
    teller_id: i64,
    business_date: NaiveDate,
) -> Result<Option<primary_history::Model>>
where
    C: ConnectionTrait,
{
    PrimaryTellerProvisioningHistory::find()
        .filter(primary_history::Column::TellerId.eq(teller_id))
        .filter(primary_history::Column::BusinessDate.eq(business_date))
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_sub_history<C>(
    db: &C,
    teller_id: i64,
    business_date: NaiveDate,
) -> Result<Option<sub_history::Model>>
where
    C: ConnectionTrait,
{
    SubTellerProvisioningHistory::find()
        .filter(sub_history::Column::TellerId.eq(teller_id))
        .filter(sub_history::Column::BusinessDate.eq(business_date))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn has_opened_history<C>(db: &C, teller: &teller::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    let found = match teller.teller_type {
        TellerType::Primary => PrimaryTellerProvisioningHistory::find()
            .filter(primary_history::Column::TellerId.eq(teller.id))
            .filter(primary_history::Column::Status.eq(TillStatus::Opened))
            .one(db)
            .await?
            .is_some(),
        TellerType::Sub => SubTellerProvisioningHistory::find()
            .filter(sub_history::Column::TellerId.eq(teller.id))
            .filter(sub_history::Column::Status.eq(TillStatus::Opened))
            .one(db)
            .await?
            .is_some(),
    };
    Ok(found)
}

fn ensure_active(teller: &teller::Model) -> Result<()> {
    if teller.is_active {
        Ok(())
    } else {
        Err(Error::TellerNotAllowed {
            teller: teller.code.clone(),
            action: "operate while inactive",
        })
    }
}

fn ensure_type(teller: &teller::Model, expected: TellerType, action: &'static str) -> Result<()> {
    if teller.teller_type == expected {
        Ok(())
    } else {
        Err(Error::TellerNotAllowed {
            teller: teller.code.clone(),
            action,
        })
    }
}

/// The opened history of a primary till for `business_date`.
async fn require_open_primary_day<C>(
    db: &C,
    teller: &teller::Model,
    business_date: NaiveDate,
) -> Result<primary_history::Model>
where
    C: ConnectionTrait,
{
    get_primary_history(db, teller.id, business_date)
        .await?
        .filter(|h| h.status == TillStatus::Opened)
        .ok_or_else(|| Error::TillNotOpen {
            teller: teller.code.clone(),
            date: business_date.to_string(),
        })
}

/// Finds the history a counter operation on `business_date` must be booked against.
pub(crate) async fn require_open_till<C>(
    db: &C,
    teller: &teller::Model,
    business_date: NaiveDate,
) -> Result<OpenTill>
where
    C: ConnectionTrait,
{
    match teller.teller_type {
        TellerType::Primary => require_open_primary_day(db, teller, business_date)
            .await
            .map(OpenTill::Primary),
        TellerType::Sub => get_sub_history(db, teller.id, business_date)
            .await?
            .filter(|h| h.status == TillStatus::Opened)
            .map(OpenTill::Sub)
            .ok_or_else(|| Error::TillNotOpen {
                teller: teller.code.clone(),
                date: business_date.to_string(),
            }),
    }
}

/// Adds customer cash received at the counter to the open history.
pub(crate) async fn record_cash_in<C>(db: &C, till: OpenTill, amount: Decimal) -> Result<()>
where
    C: ConnectionTrait,
{
    match till {
        OpenTill::Primary(history) => {
            let cash_in = history.cash_in + amount;
            let mut active: primary_history::ActiveModel = history.into();
            active.cash_in = Set(cash_in);
            active.update(db).await?;
        }
        OpenTill::Sub(history) => {
            let cash_in = history.cash_in + amount;
            let mut active: sub_history::ActiveModel = history.into();
            active.cash_in = Set(cash_in);
            active.update(db).await?;
        }
    }
    Ok(())
}

fn check_difference(
    settings: &Settings,
    expected: Decimal,
    counted: Decimal,
) -> Result<Decimal> {
    let difference = counted - expected;
    let tolerance = settings.till.max_closing_difference;
    if difference.abs() > tolerance {
        return Err(Error::ClosingDifference {
            expected,
            counted,
            difference,
            tolerance,
        });
    }
    Ok(difference)
}

/// Books a counting difference so the till balance equals the counted cash.
async fn book_difference(
    txn: &DatabaseTransaction,
    settings: &Settings,
    till: teller::Model,
    difference: Decimal,
    closing_reference: &str,
    business_date: NaiveDate,
    user_id: &str,
) -> Result<teller::Model> {
    if difference == Decimal::ZERO {
        return Ok(till);
    }
    warn!(teller = %till.code, %difference, "closing difference booked to suspense");

    let posting = if difference > Decimal::ZERO {
        Posting::new(
            till.cash_gl_account.as_str(),
            settings.ledger.till_suspense.as_str(),
            difference,
            format!("Cash surplus at closing of {}", till.code),
        )?
    } else {
        Posting::new(
            settings.ledger.till_suspense.as_str(),
            till.cash_gl_account.as_str(),
            -difference,
            format!("Cash shortage at closing of {}", till.code),
        )?
    };
    post_entries(txn, closing_reference, till.branch_id, business_date, &[posting]).await?;

    adjust_teller_balance(
        txn,
        till,
        difference,
        TillMovement {
            reference: closing_reference,
            operation_type: OperationType::Adjustment,
            account_id: None,
            business_date,
            performed_by: user_id,
        },
    )
    .await
}

/// Opens a primary till for a business day.
///
/// # Errors
/// Returns an error if:
/// - The counted cash has unknown denominations
/// - The teller does not exist, is not a primary teller, or is inactive
/// - The till is already open, or was already used for that date
/// - The counted cash does not equal the till balance
pub async fn open_primary_till(
    db: &DatabaseConnection,
    settings: &Settings,
    request: OpenPrimaryTill,
) -> Result<primary_history::Model> {
    request.counted.validate(&settings.denominations)?;

    let txn = db.begin().await?;
    let teller = require_teller(&txn, request.teller_id).await?;
    ensure_type(&teller, TellerType::Primary, "open a primary till")?;
    ensure_active(&teller)?;

    if has_opened_history(&txn, &teller).await? {
        return Err(Error::TillAlreadyOpen {
            teller: teller.code,
        });
    }
    if get_primary_history(&txn, teller.id, request.business_date)
        .await?
        .is_some()
    {
        return Err(Error::TillAlreadyClosed {
            teller: teller.code,
            date: request.business_date.to_string(),
        });
    }

    request
        .counted
        .validate_against(&settings.denominations, teller.balance)?;

    let opening_reference = new_reference(reference::OPENING);
    let history = primary_history::ActiveModel {
        teller_id: Set(teller.id),
        business_date: Set(request.business_date),
        user_id: Set(request.user_id.clone()),
        opening_amount: Set(teller.balance),
        provisioned_to_sub: Set(Decimal::ZERO),
        returned_from_sub: Set(Decimal::ZERO),
        cash_in: Set(Decimal::ZERO),
        closing_amount: Set(None),
        cash_at_hand: Set(None),
        difference: Set(None),
        status: Set(TillStatus::Opened),
        opening_reference: Set(opening_reference.clone()),
        closing_reference: Set(None),
        opened_at: Set(chrono::Utc::now()),
        closed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    register_currency_notes(
        &txn,
        &opening_reference,
        teller.id,
        request.business_date,
        Movement::In,
        &request.counted,
    )
    .await?;
    txn.commit().await?;

    info!(
        teller = %teller.code,
        date = %request.business_date,
        opening = %history.opening_amount,
        "primary till opened"
    );
    Ok(history)
}

/// Provisions a sub teller from its primary teller, opening the sub till for the day.
///
/// # Errors
/// Returns an error if:
/// - The notes are invalid or add up to zero
/// - The primary till is not open for the date
/// - The sub teller does not report to this primary teller, or is inactive
/// - The sub till is already open or was already used for the date
/// - The primary till cannot cover the amount, or the sub till limit would be exceeded
pub async fn provision_sub_teller(
    db: &DatabaseConnection,
    settings: &Settings,
    request: ProvisionSubTeller,
) -> Result<sub_history::Model> {
    request.notes.validate(&settings.denominations)?;
    let amount = request.notes.total();
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;
    let primary = require_teller(&txn, request.primary_teller_id).await?;
    ensure_type(&primary, TellerType::Primary, "provision sub tellers")?;
    let primary_day = require_open_primary_day(&txn, &primary, request.business_date).await?;

    let sub = require_teller(&txn, request.sub_teller_id).await?;
    if sub.teller_type != TellerType::Sub || sub.primary_teller_id != Some(primary.id) {
        return Err(Error::TellerNotAllowed {
            teller: sub.code,
            action: "be provisioned by this primary teller",
        });
    }
    ensure_active(&sub)?;
    if has_opened_history(&txn, &sub).await? {
        return Err(Error::TillAlreadyOpen { teller: sub.code });
    }
    if get_sub_history(&txn, sub.id, request.business_date)
        .await?
        .is_some()
    {
        return Err(Error::TillAlreadyClosed {
            teller: sub.code,
            date: request.business_date.to_string(),
        });
    }

    let opening_reference = new_reference(reference::OPENING);
    let posting = Posting::new(
        sub.cash_gl_account.as_str(),
        primary.cash_gl_account.as_str(),
        amount,
        format!("Provisioning of {} by {}", sub.code, primary.code),
    )?;

    let primary = adjust_teller_balance(
        &txn,
        primary,
        -amount,
        TillMovement {
            reference: &opening_reference,
            operation_type: OperationType::ProvisionOut,
            account_id: None,
            business_date: request.business_date,
            performed_by: &request.user_id,
        },
    )
    .await?;
    let sub = adjust_teller_balance(
        &txn,
        sub,
        amount,
        TillMovement {
            reference: &opening_reference,
            operation_type: OperationType::ProvisionIn,
            account_id: None,
            business_date: request.business_date,
            performed_by: &request.user_id,
        },
    )
    .await?;

    let history = sub_history::ActiveModel {
        teller_id: Set(sub.id),
        primary_teller_id: Set(primary.id),
        business_date: Set(request.business_date),
        user_id: Set(request.user_id.clone()),
        opening_amount: Set(amount),
        cash_in: Set(Decimal::ZERO),
        closing_amount: Set(None),
        cash_at_hand: Set(None),
        difference: Set(None),
        status: Set(TillStatus::Opened),
        opening_reference: Set(opening_reference.clone()),
        closing_reference: Set(None),
        closing_comment: Set(None),
        opened_at: Set(chrono::Utc::now()),
        closed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let provisioned = primary_day.provisioned_to_sub + amount;
    let mut primary_day: primary_history::ActiveModel = primary_day.into();
    primary_day.provisioned_to_sub = Set(provisioned);
    primary_day.update(&txn).await?;

    register_currency_notes(
        &txn,
        &opening_reference,
        sub.id,
        request.business_date,
        Movement::In,
        &request.notes,
    )
    .await?;
    post_entries(
        &txn,
        &opening_reference,
        primary.branch_id,
        request.business_date,
        &[posting],
    )
    .await?;
    txn.commit().await?;

    info!(
        primary = %primary.code,
        sub = %sub.code,
        %amount,
        reference = %opening_reference,
        "sub teller provisioned"
    );
    Ok(history)
}

/// Closes a sub till: reconciles the cash at hand and hands it back to the primary teller.
///
/// # Errors
/// Returns an error if:
/// - The counted notes are invalid
/// - The teller is not a sub teller, or has no history for the date
/// - The till is already closed
/// - The difference between counted and expected cash exceeds the tolerance
/// - The primary till is no longer open to receive the cash
pub async fn close_sub_teller_day(
    db: &DatabaseConnection,
    settings: &Settings,
    request: CloseSubTellerDay,
) -> Result<sub_history::Model> {
    request.counted.validate(&settings.denominations)?;

    let txn = db.begin().await?;
    let sub = require_teller(&txn, request.sub_teller_id).await?;
    ensure_type(&sub, TellerType::Sub, "close a sub till")?;

    let history = get_sub_history(&txn, sub.id, request.business_date)
        .await?
        .ok_or_else(|| {
            Error::not_found(
                "Sub teller provisioning history",
                format!("{}@{}", sub.code, request.business_date),
            )
        })?;
    if history.status == TillStatus::Closed {
        return Err(Error::TillAlreadyClosed {
            teller: sub.code,
            date: request.business_date.to_string(),
        });
    }

    let expected = sub.balance;
    let journaled = history.opening_amount + history.cash_in;
    if journaled != expected {
        warn!(
            teller = %sub.code,
            %journaled,
            balance = %expected,
            "sub till balance differs from its provisioning history"
        );
    }
    let counted = request.counted.total();
    let difference = check_difference(settings, expected, counted)?;

    let primary = require_teller(&txn, history.primary_teller_id).await?;
    let primary_day = require_open_primary_day(&txn, &primary, request.business_date).await?;

    let closing_reference = new_reference(reference::CLOSING);
    let sub = book_difference(
        &txn,
        settings,
        sub,
        difference,
        &closing_reference,
        request.business_date,
        &request.user_id,
    )
    .await?;

    if counted > Decimal::ZERO {
        let posting = Posting::new(
            primary.cash_gl_account.as_str(),
            sub.cash_gl_account.as_str(),
            counted,
            format!("Closing of {} returned to {}", sub.code, primary.code),
        )?;
        adjust_teller_balance(
            &txn,
            sub.clone(),
            -counted,
            TillMovement {
                reference: &closing_reference,
                operation_type: OperationType::ReturnOut,
                account_id: None,
                business_date: request.business_date,
                performed_by: &request.user_id,
            },
        )
        .await?;
        adjust_teller_balance(
            &txn,
            primary.clone(),
            counted,
            TillMovement {
                reference: &closing_reference,
                operation_type: OperationType::ReturnIn,
                account_id: None,
                business_date: request.business_date,
                performed_by: &request.user_id,
            },
        )
        .await?;
        post_entries(
            &txn,
            &closing_reference,
            primary.branch_id,
            request.business_date,
            &[posting],
        )
        .await?;
    }

    register_currency_notes(
        &txn,
        &closing_reference,
        sub.id,
        request.business_date,
        Movement::Out,
        &request.counted,
    )
    .await?;

    let returned = primary_day.returned_from_sub + counted;
    let mut primary_day: primary_history::ActiveModel = primary_day.into();
    primary_day.returned_from_sub = Set(returned);
    primary_day.update(&txn).await?;

    let mut active: sub_history::ActiveModel = history.into();
    active.closing_amount = Set(Some(expected));
    active.cash_at_hand = Set(Some(counted));
    active.difference = Set(Some(difference));
    active.status = Set(TillStatus::Closed);
    active.closing_reference = Set(Some(closing_reference.clone()));
    active.closing_comment = Set(request.comment.clone());
    active.closed_at = Set(Some(chrono::Utc::now()));
    let closed = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        sub = %sub.code,
        primary = %primary.code,
        %expected,
        %counted,
        %difference,
        reference = %closing_reference,
        "sub till closed"
    );
    Ok(closed)
}

/// Closes a primary till once all of its sub tills for the day are closed.
///
/// # Errors
/// Returns an error if:
/// - The counted notes are invalid
/// - The teller is not a primary teller, or has no history for the date
/// - The till is already closed, or some sub till is still open
/// - The difference between counted and expected cash exceeds the tolerance
pub async fn close_primary_till(
    db: &DatabaseConnection,
    settings: &Settings,
    request: ClosePrimaryTill,
) -> Result<primary_history::Model> {
    request.counted.validate(&settings.denominations)?;

    let txn = db.begin().await?;
    let teller = require_teller(&txn, request.teller_id).await?;
    ensure_type(&teller, TellerType::Primary, "close a primary till")?;

    let history = get_primary_history(&txn, teller.id, request.business_date)
        .await?
        .ok_or_else(|| {
            Error::not_found(
                "Primary teller provisioning history",
                format!("{}@{}", teller.code, request.business_date),
            )
        })?;
    if history.status == TillStatus::Closed {
        return Err(Error::TillAlreadyClosed {
            teller: teller.code,
            date: request.business_date.to_string(),
        });
    }

    let still_open = SubTellerProvisioningHistory::find()
        .filter(sub_history::Column::PrimaryTellerId.eq(teller.id))
        .filter(sub_history::Column::BusinessDate.eq(request.business_date))
        .filter(sub_history::Column::Status.eq(TillStatus::Opened))
        .all(&txn)
        .await?;
    if !still_open.is_empty() {
        let ids: Vec<i64> = still_open.iter().map(|h| h.teller_id).collect();
        let codes: Vec<String> = Teller::find()
            .filter(teller::Column::Id.is_in(ids))
            .order_by_asc(teller::Column::Code)
            .all(&txn)
            .await?
            .into_iter()
            .map(|t| t.code)
            .collect();
        return Err(Error::SubTillsStillOpen {
            teller: teller.code,
            open: codes.join(", "),
        });
    }

    let expected = teller.balance;
    let counted = request.counted.total();
    let difference = check_difference(settings, expected, counted)?;

    let closing_reference = new_reference(reference::CLOSING);
    let teller = book_difference(
        &txn,
        settings,
        teller,
        difference,
        &closing_reference,
        request.business_date,
        &request.user_id,
    )
    .await?;

    register_currency_notes(
        &txn,
        &closing_reference,
        teller.id,
        request.business_date,
        Movement::Out,
        &request.counted,
    )
    .await?;

    let mut active: primary_history::ActiveModel = history.into();
    active.closing_amount = Set(Some(expected));
    active.cash_at_hand = Set(Some(counted));
    active.difference = Set(Some(difference));
    active.status = Set(TillStatus::Closed);
    active.closing_reference = Set(Some(closing_reference.clone()));
    active.closed_at = Set(Some(chrono::Utc::now()));
    let closed = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        teller = %teller.code,
        %expected,
        %counted,
        %difference,
        reference = %closing_reference,
        "primary till closed"
    );
    Ok(closed)
}

/// Aggregates the notes a primary teller handed out and got back on a business day.
pub async fn denomination_summary(
    db: &DatabaseConnection,
    primary_teller_id: i64,
    business_date: NaiveDate,
) -> Result<TillDenominationSummary> {
    let primary = require_teller(db, primary_teller_id).await?;
    ensure_type(&primary, TellerType::Primary, "summarize sub tills")?;

    let histories = SubTellerProvisioningHistory::find()
        .filter(sub_history::Column::PrimaryTellerId.eq(primary.id))
        .filter(sub_history::Column::BusinessDate.eq(business_date))
        .order_by_asc(sub_history::Column::Id)
        .all(db)
        .await?;

    let opening_refs: Vec<String> = histories
        .iter()
        .map(|h| h.opening_reference.clone())
        .collect();
    let closing_refs: Vec<String> = histories
        .iter()
        .filter_map(|h| h.closing_reference.clone())
        .collect();

    let provisioned = summarize(db, &opening_refs).await?;
    let returned = summarize(db, &closing_refs).await?;

    let sub_tills = histories
        .into_iter()
        .map(|h| SubTillSummary {
            teller_id: h.teller_id,
            opening_amount: h.opening_amount,
            cash_in: h.cash_in,
            cash_at_hand: h.cash_at_hand,
            difference: h.difference,
            status: h.status,
        })
        .collect();

    Ok(TillDenominationSummary {
        primary_teller_id: primary.id,
        business_date,
        provisioned_total: provisioned.total(),
        returned_total: returned.total(),
        provisioned,
        returned,
        sub_tills,
    })
}
