use serde::{Deserialize, Serialize};
use std::fmt;

/// The signed-in user as reported by the identity provider.
///
/// `access_token` is the provider-issued bearer token, when one exists. The
/// directory forwards it so row-level security applies to the caller. It is
/// never serialized and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let identity = Identity::new("u1", "a@example.com").with_access_token("secret-token");
        let printed = format!("{:?}", identity);
        assert!(printed.contains("u1"));
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn token_is_not_serialized() {
        let identity = Identity::new("u1", "a@example.com").with_access_token("secret-token");
        let value = serde_json::to_value(&identity).unwrap();
        assert!(value.get("access_token").is_none());
    }
}
