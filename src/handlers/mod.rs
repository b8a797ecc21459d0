//! Command layer - request structs, dispatch and response mapping.
//!
//! Each operation is a plain struct implementing [`Command`]. [`dispatch`]
//! runs it against an [`AppContext`], logs the outcome and turns the
//! `Result` into a [`ServiceResponse`]. Business rules live in `core`; this
//! layer only wires requests to them.

/// Account commands and queries
pub mod accounts;
/// Cash-in commands
pub mod deposits;
/// General-ledger queries
pub mod ledger;
/// Response envelope and status mapping
pub mod response;
/// Open/close of day commands
pub mod tills;

pub use accounts::*;
pub use deposits::*;
pub use ledger::*;
pub use response::ServiceResponse;
pub use tills::*;

use crate::{
    config::Settings,
    core::notification::{LogNotifier, Notifier},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state available to all commands.
pub struct AppContext {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    /// Creates a context that logs customer notifications.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replaces the notification channel.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// A request that can be dispatched.
#[allow(async_fn_in_trait)]
pub trait Command {
    /// Payload returned on success
    type Output: Serialize;

    /// Name used in logs
    const NAME: &'static str;

    /// Runs the request.
    async fn execute(self, ctx: &AppContext) -> Result<Self::Output>;

    /// Status reported on success.
    fn success_status(&self) -> u16 {
        200
    }
}

/// Runs `command` and maps its outcome onto a [`ServiceResponse`].
pub async fn dispatch<C: Command>(ctx: &AppContext, command: C) -> ServiceResponse<C::Output> {
    let status = command.success_status();
    match command.execute(ctx).await {
        Ok(output) => {
            info!(command = C::NAME, status, "command succeeded");
            let message = if status == 201 { "Created" } else { "OK" };
            ServiceResponse::return_result_with(output, message, status)
        }
        Err(e) => {
            let code = e.status_code();
            if code >= 500 {
                error!(command = C::NAME, status = code, "command failed: {e}");
            } else {
                warn!(command = C::NAME, status = code, "command rejected: {e}");
            }
            ServiceResponse::from_error(&e)
        }
    }
}
