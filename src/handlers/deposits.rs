//! Cash-in commands. Each one commits before the customer is notified.

use super::{AppContext, Command};
use crate::{
    core::deposit::{
        self, CashDeposit, DepositReceipt, LoanProcessingFee, LoanRepayment, MomokashCollection,
    },
    errors::Result,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CashDepositCommand(pub CashDeposit);

impl Command for CashDepositCommand {
    type Output = DepositReceipt;
    const NAME: &'static str = "cash_deposit";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        deposit::deposit_cash(&ctx.db, &ctx.settings, ctx.notifier.as_ref(), self.0).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MomokashCollectionCommand(pub MomokashCollection);

impl Command for MomokashCollectionCommand {
    type Output = DepositReceipt;
    const NAME: &'static str = "momokash_collection";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        deposit::collect_momokash(&ctx.db, &ctx.settings, ctx.notifier.as_ref(), self.0).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanRepaymentCommand(pub LoanRepayment);

impl Command for LoanRepaymentCommand {
    type Output = DepositReceipt;
    const NAME: &'static str = "loan_repayment";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        deposit::repay_loan(&ctx.db, &ctx.settings, ctx.notifier.as_ref(), self.0).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanProcessingFeeCommand(pub LoanProcessingFee);

impl Command for LoanProcessingFeeCommand {
    type Output = DepositReceipt;
    const NAME: &'static str = "loan_processing_fee";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        deposit::pay_loan_processing_fee(&ctx.db, &ctx.settings, ctx.notifier.as_ref(), self.0)
            .await
    }

    fn success_status(&self) -> u16 {
        201
    }
}
