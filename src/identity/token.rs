use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::Identity;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("JWT secret not configured")]
    SecretMissing,

    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Access token has no email claim")]
    MissingEmail,
}

/// Claims the identity provider puts in its access tokens
#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    email: Option<String>,
}

/// Verify a provider-issued access token and turn it into an identity that
/// carries the token for directory queries.
pub fn identity_from_access_token(token: &str, auth: &AuthConfig) -> Result<Identity, IdentityError> {
    let secret = auth.jwt_secret.as_deref().ok_or(IdentityError::SecretMissing)?;
    if secret.is_empty() {
        return Err(IdentityError::SecretMissing);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[auth.jwt_audience.as_str()]);

    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    let email = data.claims.email.filter(|e| !e.is_empty()).ok_or(IdentityError::MissingEmail)?;

    Ok(Identity::new(data.claims.sub, email).with_access_token(token))
}
