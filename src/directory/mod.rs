// Read-only access to the tenant directory: `company_members` joined with `companies`

pub mod memory;
pub mod postgres;
pub mod rest;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{DirectoryBackend, DirectoryConfig};
use crate::models::{CompanyWithRole, Identity, MembershipRecord};

pub use memory::{DirectoryFixture, MemoryDirectory};
pub use postgres::PgDirectory;
pub use rest::RestDirectory;

/// Errors from a directory query. Callers treat these as opaque.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unreachable: {0}")]
    Transport(String),

    #[error("Directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid directory response: {0}")]
    Decode(String),

    #[error("Directory misconfigured: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DirectoryError::Decode(err.to_string())
        } else {
            DirectoryError::Transport(err.to_string())
        }
    }
}

/// Source of membership rows for one identity
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// All `company_members` rows of the identity, each with its embedded company
    async fn memberships(&self, identity: &Identity) -> Result<Vec<MembershipRecord>, DirectoryError>;
}

/// Build the directory selected by configuration
pub async fn connect(config: &DirectoryConfig) -> Result<Arc<dyn TenantDirectory>, DirectoryError> {
    let directory: Arc<dyn TenantDirectory> = match config.backend {
        DirectoryBackend::Rest => Arc::new(RestDirectory::from_config(config)?),
        DirectoryBackend::Postgres => Arc::new(PgDirectory::connect(config).await?),
        DirectoryBackend::Fixture => {
            let path = config
                .fixture_path
                .as_deref()
                .ok_or_else(|| DirectoryError::Config("DIRECTORY_FIXTURE is not set".to_string()))?;
            Arc::new(MemoryDirectory::from_file(path)?)
        }
    };
    tracing::info!("Using {} tenant directory", directory.name());
    Ok(directory)
}

/// Fetch memberships and join them into companies annotated with the caller's role.
///
/// Rows whose company is hidden are dropped. A company id seen twice keeps
/// its first row. Directory order is preserved.
pub async fn companies_for(
    directory: &dyn TenantDirectory,
    identity: &Identity,
) -> Result<Vec<CompanyWithRole>, DirectoryError> {
    let rows = directory.memberships(identity).await?;
    Ok(join_memberships(rows))
}

pub fn join_memberships(rows: Vec<MembershipRecord>) -> Vec<CompanyWithRole> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter_map(|row| {
            let company = row.company?;
            if !seen.insert(company.id.clone()) {
                tracing::warn!("Duplicate membership row for company {}", company.id);
                return None;
            }
            Some(CompanyWithRole::new(company, row.role))
        })
        .collect()
}
