//! Customer notifications sent after a cash-in.
//!
//! Delivery channels (SMS, push) live outside this crate; the [`Notifier`]
//! trait is the seam they plug into. Notifications are best effort: callers
//! log a failure and carry on.

use crate::errors::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// A message addressed to a customer phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub phone: String,
    pub message: String,
}

/// Delivers notifications to customers.
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that only writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(phone = %notification.phone, "notification: {}", notification.message);
        Ok(())
    }
}

/// Message for a credit on a customer account.
#[must_use]
pub fn credit_message(
    bank: &str,
    account_number: &str,
    amount: Decimal,
    currency: &str,
    balance: Decimal,
    reference: &str,
) -> String {
    format!(
        "{bank}: your account {account_number} was credited with {amount} {currency}. \
         New balance: {balance} {currency}. Ref: {reference}"
    )
}

/// Message for a loan repayment or fee payment.
#[must_use]
pub fn loan_message(
    bank: &str,
    loan_number: &str,
    amount: Decimal,
    currency: &str,
    outstanding: Decimal,
    reference: &str,
) -> String {
    format!(
        "{bank}: payment of {amount} {currency} received on loan {loan_number}. \
         Outstanding: {outstanding} {currency}. Ref: {reference}"
    )
}
