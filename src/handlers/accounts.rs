//! Account commands.

use super::{AppContext, Command};
use crate::{
    core::account::{self, NewAccount},
    entities::{
        account::{self as account_entity, AccountStatus},
        blocked_account,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Opens an account in the bank currency unless one is given.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAccountCommand(pub NewAccount);

impl Command for OpenAccountCommand {
    type Output = account_entity::Model;
    const NAME: &'static str = "open_account";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::open_account(&ctx.db, self.0, &ctx.settings.bank.currency).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetAccountQuery {
    pub account_number: String,
}

impl Command for GetAccountQuery {
    type Output = account_entity::Model;
    const NAME: &'static str = "get_account";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::get_account_by_number(&ctx.db, &self.account_number)
            .await?
            .ok_or_else(|| Error::not_found("Account", self.account_number))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListCustomerAccountsQuery {
    pub customer_id: String,
}

impl Command for ListCustomerAccountsQuery {
    type Output = Vec<account_entity::Model>;
    const NAME: &'static str = "list_customer_accounts";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::list_customer_accounts(&ctx.db, &self.customer_id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeAccountStatusCommand {
    pub account_id: i64,
    pub status: AccountStatus,
    pub changed_by: String,
}

impl Command for ChangeAccountStatusCommand {
    type Output = account_entity::Model;
    const NAME: &'static str = "change_account_status";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::change_status(&ctx.db, self.account_id, self.status, &self.changed_by).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseAccountCommand {
    pub account_id: i64,
    pub reason: String,
    pub closed_by: String,
}

impl Command for CloseAccountCommand {
    type Output = account_entity::Model;
    const NAME: &'static str = "close_account";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::close_account(&ctx.db, self.account_id, &self.reason, &self.closed_by).await
    }
}

/// Places a hold on part of an account balance.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockAmountCommand {
    pub account_id: i64,
    pub amount: Decimal,
    pub reason: String,
    pub blocked_by: String,
}

impl Command for BlockAmountCommand {
    type Output = blocked_account::Model;
    const NAME: &'static str = "block_amount";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::block_amount(
            &ctx.db,
            self.account_id,
            self.amount,
            &self.reason,
            &self.blocked_by,
        )
        .await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseBlockedAmountCommand {
    pub block_id: i64,
    pub released_by: String,
}

impl Command for ReleaseBlockedAmountCommand {
    type Output = blocked_account::Model;
    const NAME: &'static str = "release_blocked_amount";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        account::release_blocked_amount(&ctx.db, self.block_id, &self.released_by).await
    }
}
