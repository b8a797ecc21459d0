//! Open/close of day commands.

use super::{AppContext, Command};
use crate::{
    core::till::{
        self, ClosePrimaryTill, CloseSubTellerDay, OpenPrimaryTill, ProvisionSubTeller,
        TillDenominationSummary,
    },
    entities::{primary_teller_provisioning_history, sub_teller_provisioning_history},
    errors::Result,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPrimaryTillCommand(pub OpenPrimaryTill);

impl Command for OpenPrimaryTillCommand {
    type Output = primary_teller_provisioning_history::Model;
    const NAME: &'static str = "open_primary_till";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        till::open_primary_till(&ctx.db, &ctx.settings, self.0).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

/// Opening of day for a sub teller.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionSubTellerCommand(pub ProvisionSubTeller);

impl Command for ProvisionSubTellerCommand {
    type Output = sub_teller_provisioning_history::Model;
    const NAME: &'static str = "provision_sub_teller";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        till::provision_sub_teller(&ctx.db, &ctx.settings, self.0).await
    }

    fn success_status(&self) -> u16 {
        201
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseSubTellerDayCommand(pub CloseSubTellerDay);

impl Command for CloseSubTellerDayCommand {
    type Output = sub_teller_provisioning_history::Model;
    const NAME: &'static str = "close_sub_teller_day";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        till::close_sub_teller_day(&ctx.db, &ctx.settings, self.0).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePrimaryTillCommand(pub ClosePrimaryTill);

impl Command for ClosePrimaryTillCommand {
    type Output = primary_teller_provisioning_history::Model;
    const NAME: &'static str = "close_primary_till";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        till::close_primary_till(&ctx.db, &ctx.settings, self.0).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenominationSummaryQuery {
    pub primary_teller_id: i64,
    pub business_date: NaiveDate,
}

impl Command for DenominationSummaryQuery {
    type Output = TillDenominationSummary;
    const NAME: &'static str = "denomination_summary";

    async fn execute(self, ctx: &AppContext) -> Result<Self::Output> {
        till::denomination_summary(&ctx.db, self.primary_teller_id, self.business_date).await
    }
}
