//! First-run seeding of branches and tellers from config.toml.
//!
//! Seeding is idempotent: branches and tellers are matched by code and only
//! the missing ones are created, so it runs on every start.

use crate::{
    config::{Settings, settings::TellerConfig},
    core::teller::{NewTeller, create_teller, get_teller_by_code},
    entities::{Branch, branch, teller::TellerType},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::{debug, info, instrument};

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub branches_created: usize,
    pub tellers_created: usize,
}

/// Finds a non-deleted branch by code.
pub async fn get_branch_by_code<C>(db: &C, code: &str) -> Result<Option<branch::Model>>
where
    C: ConnectionTrait,
{
    Branch::find()
        .filter(branch::Column::Code.eq(code))
        .filter(branch::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the branch with `code`, creating it if missing.
pub async fn ensure_branch<C>(db: &C, code: &str, name: &str) -> Result<(branch::Model, bool)>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_branch_by_code(db, code).await? {
        return Ok((existing, false));
    }
    if code.trim().is_empty() {
        return Err(Error::Validation {
            message: "Branch code cannot be empty".to_string(),
        });
    }
    let created = branch::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.trim().to_string()),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}

async fn seed_teller(db: &DatabaseConnection, config: &TellerConfig) -> Result<bool> {
    if get_teller_by_code(db, &config.code).await?.is_some() {
        debug!(teller = %config.code, "teller already seeded");
        return Ok(false);
    }
    let branch = get_branch_by_code(db, &config.branch)
        .await?
        .ok_or_else(|| Error::not_found("Branch", &config.branch))?;
    let primary_teller_id = match &config.primary {
        Some(code) => Some(
            get_teller_by_code(db, code)
                .await?
                .ok_or_else(|| Error::not_found("Teller", code))?
                .id,
        ),
        None => None,
    };

    create_teller(
        db,
        NewTeller {
            code: config.code.clone(),
            name: config.name.clone(),
            branch_id: branch.id,
            teller_type: config.teller_type,
            primary_teller_id,
            opening_balance: config.opening_balance,
            max_balance: config.max_balance,
            cash_gl_account: config.cash_gl_account.clone(),
            user_id: None,
        },
    )
    .await?;
    Ok(true)
}

/// Creates the branches and tellers listed in the settings that do not exist yet.
///
/// Primary tellers are created before sub tellers so the hierarchy resolves
/// regardless of the order in the file.
#[instrument(skip_all)]
pub async fn seed_from_settings(db: &DatabaseConnection, settings: &Settings) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for config in &settings.branches {
        let (_, created) = ensure_branch(db, &config.code, &config.name).await?;
        if created {
            report.branches_created += 1;
        }
    }

    let (primaries, subs): (Vec<_>, Vec<_>) = settings
        .tellers
        .iter()
        .partition(|t| t.teller_type == TellerType::Primary);
    for config in primaries.into_iter().chain(subs) {
        if seed_teller(db, config).await? {
            report.tellers_created += 1;
        }
    }

    info!(
        branches = report.branches_created,
        tellers = report.tellers_created,
        "seeding finished"
    );
    Ok(report)
}
