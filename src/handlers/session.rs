use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiResponse;
use crate::context::ContextSnapshot;
use crate::error::ApiError;
use crate::handlers::context::ContextView;
use crate::identity::identity_from_access_token;
use crate::models::Identity;
use crate::server::AppState;

/// Identity handed over by the embedding application
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SessionRequest {
    /// Provider-issued access token; verified against the configured JWT secret
    Token { access_token: String },
    /// Plain identity, for directories that do not need the caller's token
    Identity { id: String, email: String },
}

impl SessionRequest {
    fn into_identity(self, state: &AppState) -> Result<Identity, ApiError> {
        match self {
            SessionRequest::Token { access_token } => Ok(identity_from_access_token(&access_token, &state.auth)?),
            SessionRequest::Identity { id, email } => {
                if id.trim().is_empty() {
                    return Err(ApiError::bad_request("Identity id must not be empty"));
                }
                Ok(Identity::new(id, email))
            }
        }
    }
}

/// PUT /api/session - Report the signed-in identity
///
/// The tenant context reloads in the background; poll GET /api/context
/// until `loading` is false.
pub async fn session_put(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<ApiResponse<Value>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(format!("Invalid session body: {}", e)))?;
    let identity = request.into_identity(&state)?;

    let data = json!({ "identity": identity });
    state.identities.sign_in(identity);

    Ok(ApiResponse::accepted(data))
}

/// DELETE /api/session - Report sign-out
///
/// Returns the cleared context the bridge settles on once sign-out is applied.
pub async fn session_delete(State(state): State<AppState>) -> ApiResponse<ContextView> {
    state.identities.sign_out();
    ApiResponse::accepted(ContextSnapshot::signed_out().into())
}
