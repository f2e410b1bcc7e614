use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{CompanyWithRole, Identity, MemberRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPhase {
    Loading,
    Loaded,
    Empty,
}

/// Everything the view layer reads about the current tenant context.
/// Published as a whole; readers never see a half-applied load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub identity: Option<Identity>,
    pub companies: Vec<CompanyWithRole>,
    pub current_company: Option<CompanyWithRole>,
    pub user_role: Option<MemberRole>,
    pub loading: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Identity the published companies were loaded for. Lags `identity`
    /// while a load for a new identity is in flight.
    #[serde(skip)]
    pub owner: Option<Identity>,
}

impl ContextSnapshot {
    /// State before the first identity arrives
    pub fn initial() -> Self {
        Self {
            identity: None,
            companies: Vec::new(),
            current_company: None,
            user_role: None,
            loading: true,
            loaded_at: None,
            owner: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::initial()
        }
    }

    pub fn phase(&self) -> ContextPhase {
        if self.loading {
            ContextPhase::Loading
        } else if self.companies.is_empty() {
            ContextPhase::Empty
        } else {
            ContextPhase::Loaded
        }
    }

    pub fn company(&self, company_id: &str) -> Option<&CompanyWithRole> {
        self.companies.iter().find(|c| c.id() == company_id)
    }

    pub fn contains(&self, company_id: &str) -> bool {
        self.company(company_id).is_some()
    }

    pub fn current_company_id(&self) -> Option<&str> {
        self.current_company.as_ref().map(|c| c.id())
    }

    /// Whether the published companies belong to `identity`
    pub fn owned_by(&self, identity: &Identity) -> bool {
        self.owner.as_ref().is_some_and(|owner| owner.id == identity.id)
    }

    pub fn company_ids(&self) -> Vec<&str> {
        self.companies.iter().map(|c| c.id()).collect()
    }
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
