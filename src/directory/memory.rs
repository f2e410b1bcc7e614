use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{DirectoryError, TenantDirectory};
use crate::models::{Company, Identity, MemberRole, MembershipRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRow {
    pub user_id: String,
    pub company_id: String,
    pub role: MemberRole,
}

/// Table contents for an in-process directory, loadable from JSON or YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub members: Vec<MemberRow>,
}

impl DirectoryFixture {
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Config(format!("cannot read fixture {}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| DirectoryError::Decode(e.to_string()))
            }
            _ => serde_json::from_str(&content).map_err(|e| DirectoryError::Decode(e.to_string())),
        }
    }
}

/// In-process directory. Rows come back in `companies` table order; a
/// membership pointing at an unknown company is returned with no company.
#[derive(Default)]
pub struct MemoryDirectory {
    tables: RwLock<DirectoryFixture>,
    failure: RwLock<Option<String>>,
    queries: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new(fixture: DirectoryFixture) -> Self {
        Self {
            tables: RwLock::new(fixture),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DirectoryError> {
        let fixture = DirectoryFixture::load(path)?;
        tracing::info!(
            "Loaded directory fixture {} ({} companies, {} members)",
            path.display(),
            fixture.companies.len(),
            fixture.members.len()
        );
        Ok(Self::new(fixture))
    }

    pub async fn add_company(&self, company: Company) {
        self.tables.write().await.companies.push(company);
    }

    pub async fn add_member(&self, user_id: &str, company_id: &str, role: MemberRole) {
        self.tables.write().await.members.push(MemberRow {
            user_id: user_id.to_string(),
            company_id: company_id.to_string(),
            role,
        });
    }

    pub async fn remove_member(&self, user_id: &str, company_id: &str) {
        self.tables
            .write()
            .await
            .members
            .retain(|m| !(m.user_id == user_id && m.company_id == company_id));
    }

    /// Make every following query fail with a transport error until cleared
    pub async fn fail_with(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    /// Number of membership queries served so far
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn memberships(&self, identity: &Identity) -> Result<Vec<MembershipRecord>, DirectoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure.read().await.as_ref() {
            return Err(DirectoryError::Transport(message.clone()));
        }

        let tables = self.tables.read().await;
        let position = |company_id: &str| {
            tables
                .companies
                .iter()
                .position(|c| c.id == company_id)
                .unwrap_or(usize::MAX)
        };

        let mut rows: Vec<&MemberRow> = tables
            .members
            .iter()
            .filter(|m| m.user_id == identity.id)
            .collect();
        rows.sort_by_key(|m| position(&m.company_id));

        Ok(rows
            .into_iter()
            .map(|m| MembershipRecord {
                company_id: m.company_id.clone(),
                role: m.role,
                company: tables.companies.iter().find(|c| c.id == m.company_id).cloned(),
            })
            .collect())
    }
}
