use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::time::Duration;

use super::{DirectoryError, TenantDirectory};
use crate::config::DirectoryConfig;
use crate::models::{Company, Identity, MembershipRecord};

const MEMBERSHIP_QUERY: &str = r#"
    SELECT
        m.company_id::text AS company_id,
        m.role::text AS role,
        c.id::text AS id,
        c.name,
        c.slug,
        c.logo_url,
        c.status::text AS status
    FROM company_members m
    LEFT JOIN companies c ON c.id = m.company_id
    WHERE m.user_id = $1::uuid
    ORDER BY m.joined_at
"#;

#[derive(Debug, FromRow)]
struct MembershipRow {
    company_id: String,
    role: String,
    id: Option<String>,
    name: Option<String>,
    slug: Option<String>,
    logo_url: Option<String>,
    status: Option<String>,
}

impl TryFrom<MembershipRow> for MembershipRecord {
    type Error = DirectoryError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(DirectoryError::Decode)?;

        let company = match (row.id, row.name, row.slug, row.status) {
            (Some(id), Some(name), Some(slug), Some(status)) => Some(Company {
                id,
                name,
                slug,
                logo_url: row.logo_url,
                status: status.parse().map_err(DirectoryError::Decode)?,
            }),
            _ => None,
        };

        Ok(MembershipRecord {
            company_id: row.company_id,
            role,
            company,
        })
    }
}

/// Directory reading the membership tables straight from Postgres.
///
/// Intended for trusted tooling; it does not apply row-level security on
/// behalf of the caller.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| DirectoryError::Config("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect(url)
            .await?;

        tracing::info!("Connected postgres directory");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TenantDirectory for PgDirectory {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn memberships(&self, identity: &Identity) -> Result<Vec<MembershipRecord>, DirectoryError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(MEMBERSHIP_QUERY)
            .bind(&identity.id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(MembershipRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyStatus, MemberRole};

    fn row() -> MembershipRow {
        MembershipRow {
            company_id: "c1".into(),
            role: "admin".into(),
            id: Some("c1".into()),
            name: Some("Acme".into()),
            slug: Some("acme".into()),
            logo_url: None,
            status: Some("trial".into()),
        }
    }

    #[test]
    fn filters_on_uncast_user_column() {
        assert!(MEMBERSHIP_QUERY.contains("WHERE m.user_id = $1::uuid"));
        assert!(!MEMBERSHIP_QUERY.contains("m.user_id::text"));
    }

    #[test]
    fn converts_joined_row() {
        let record = MembershipRecord::try_from(row()).unwrap();
        assert_eq!(record.role, MemberRole::Admin);
        assert_eq!(record.company.unwrap().status, CompanyStatus::Trial);
    }

    #[test]
    fn missing_company_columns_become_hidden_company() {
        let record = MembershipRecord::try_from(MembershipRow {
            id: None,
            name: None,
            slug: None,
            status: None,
            ..row()
        })
        .unwrap();
        assert!(record.company.is_none());
    }

    #[test]
    fn unknown_enum_values_are_decode_errors() {
        let result = MembershipRecord::try_from(MembershipRow {
            role: "owner".into(),
            ..row()
        });
        assert!(matches!(result, Err(DirectoryError::Decode(_))));
    }
}
