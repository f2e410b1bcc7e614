use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a user holds inside one company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    User,
    Admin,
    SuperAdmin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::User => "user",
            MemberRole::Admin => "admin",
            MemberRole::SuperAdmin => "super_admin",
        }
    }

    /// Tenant admins and super admins can manage company settings
    pub fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Admin | MemberRole::SuperAdmin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MemberRole::User),
            "admin" => Ok(MemberRole::Admin),
            "super_admin" => Ok(MemberRole::SuperAdmin),
            other => Err(format!("unknown member role '{}'", other)),
        }
    }
}

/// Company lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Trial,
    Delinquent,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Trial => "trial",
            CompanyStatus::Delinquent => "delinquent",
            CompanyStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CompanyStatus::Active),
            "trial" => Ok(CompanyStatus::Trial),
            "delinquent" => Ok(CompanyStatus::Delinquent),
            "suspended" => Ok(CompanyStatus::Suspended),
            other => Err(format!("unknown company status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub status: CompanyStatus,
}

/// One `company_members` row as returned by the directory, with the
/// embedded `companies` record. The embedded record is null when the
/// store hides the company from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub company_id: String,
    pub role: MemberRole,
    #[serde(rename = "companies")]
    pub company: Option<Company>,
}

/// A company annotated with the caller's role in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyWithRole {
    #[serde(flatten)]
    pub company: Company,
    pub user_role: MemberRole,
}

impl CompanyWithRole {
    pub fn new(company: Company, user_role: MemberRole) -> Self {
        Self { company, user_role }
    }

    pub fn id(&self) -> &str {
        &self.company.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_membership_row_with_embedded_company() {
        let row: MembershipRecord = serde_json::from_value(json!({
            "company_id": "c1",
            "role": "super_admin",
            "companies": {
                "id": "c1",
                "name": "Acme",
                "slug": "acme",
                "logo_url": null,
                "status": "delinquent"
            }
        }))
        .unwrap();

        assert_eq!(row.role, MemberRole::SuperAdmin);
        let company = row.company.unwrap();
        assert_eq!(company.status, CompanyStatus::Delinquent);
        assert!(company.logo_url.is_none());
    }

    #[test]
    fn parses_membership_row_with_hidden_company() {
        let row: MembershipRecord = serde_json::from_value(json!({
            "company_id": "c1",
            "role": "user",
            "companies": null
        }))
        .unwrap();
        assert!(row.company.is_none());
    }

    #[test]
    fn company_with_role_serializes_flat() {
        let company = CompanyWithRole::new(
            Company {
                id: "c1".into(),
                name: "Acme".into(),
                slug: "acme".into(),
                logo_url: Some("logos/acme.png".into()),
                status: CompanyStatus::Trial,
            },
            MemberRole::Admin,
        );
        let value = serde_json::to_value(&company).unwrap();
        assert_eq!(value["id"], "c1");
        assert_eq!(value["status"], "trial");
        assert_eq!(value["user_role"], "admin");
    }

    #[test]
    fn role_strings_round_trip_through_from_str() {
        for role in [MemberRole::User, MemberRole::Admin, MemberRole::SuperAdmin] {
            assert_eq!(role.as_str().parse::<MemberRole>().unwrap(), role);
        }
        assert!("owner".parse::<MemberRole>().is_err());
        assert!("closed".parse::<CompanyStatus>().is_err());
    }
}
