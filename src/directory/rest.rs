use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::{DirectoryError, TenantDirectory};
use crate::config::DirectoryConfig;
use crate::models::{Identity, MembershipRecord};

/// Embedded-resource select used against the REST gateway
const MEMBERSHIP_SELECT: &str = "company_id,role,companies(id,name,slug,logo_url,status)";

/// Directory backed by the managed backend's REST gateway (`/rest/v1`).
///
/// Requests carry the project anon key as `apikey` and the caller's access
/// token as bearer, so row-level security decides what is visible.
pub struct RestDirectory {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl RestDirectory {
    pub fn new(base_url: &str, anon_key: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| DirectoryError::Config(format!("invalid directory url '{}': {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            anon_key: anon_key.into(),
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| DirectoryError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;
        Self::new(&config.rest_url, anon_key, Duration::from_secs(config.timeout_secs))
    }

    /// URL of the membership query for one user
    pub fn memberships_url(&self, user_id: &str) -> Result<Url, DirectoryError> {
        let mut url = self
            .base_url
            .join("rest/v1/company_members")
            .map_err(|e| DirectoryError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("select", MEMBERSHIP_SELECT)
            .append_pair("user_id", &format!("eq.{}", user_id));
        Ok(url)
    }
}

#[async_trait]
impl TenantDirectory for RestDirectory {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn memberships(&self, identity: &Identity) -> Result<Vec<MembershipRecord>, DirectoryError> {
        let url = self.memberships_url(&identity.id)?;
        let bearer = identity.access_token.as_deref().unwrap_or(&self.anon_key);

        tracing::debug!("GET {}", url.path());
        let response = self
            .client
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}
