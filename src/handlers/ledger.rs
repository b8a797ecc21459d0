//! General-ledger queries.

use super::{AppContext, Command};
use crate::{core::accounting, errors::Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerBalanceQuery {
    pub gl_account: String,
}

/// Balance of one GL account, credits minus debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerBalance {
    pub gl_account: String,
    pub balance: Decimal,
}

impl Command for LedgerBalanceQuery {
    type Output = LedgerBalance;
    const NAME: &'static str = "ledger_balance";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        let balance = accounting::ledger_balance(&ctx.db, &self.gl_account).await?;
        Ok(LedgerBalance {
            gl_account: self.gl_account,
            balance,
        })
    }
}
