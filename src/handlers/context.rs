use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::ApiResponse;
use crate::context::{ContextPhase, ContextSnapshot};
use crate::server::AppState;

/// Snapshot as served to the view layer, with its derived phase
#[derive(Debug, Serialize)]
pub struct ContextView {
    pub phase: ContextPhase,
    #[serde(flatten)]
    pub snapshot: ContextSnapshot,
}

impl From<ContextSnapshot> for ContextView {
    fn from(snapshot: ContextSnapshot) -> Self {
        Self {
            phase: snapshot.phase(),
            snapshot,
        }
    }
}

/// GET /api/context - Current tenant context
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "phase": "loaded",
///     "identity": { "id": "user_uuid", "email": "user@example.com" },
///     "companies": [
///       { "id": "company_uuid", "name": "Acme", "slug": "acme", "logo_url": null,
///         "status": "active", "user_role": "admin" }
///     ],
///     "current_company": { "id": "company_uuid", "...": "..." },
///     "user_role": "admin",
///     "loading": false,
///     "loaded_at": "2025-01-01T00:00:00Z"
///   }
/// }
/// ```
pub async fn context_get(State(state): State<AppState>) -> ApiResponse<ContextView> {
    ApiResponse::success(state.context.snapshot().into())
}

/// POST /api/context/switch/:company_id - Make a company current
///
/// Unknown company ids are ignored; the unchanged context is returned.
pub async fn context_switch(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResponse<ContextView> {
    state.context.switch_company(&company_id);
    ApiResponse::success(state.context.snapshot().into())
}

/// POST /api/context/refresh - Reload memberships for the current identity
pub async fn context_refresh(State(state): State<AppState>) -> ApiResponse<ContextView> {
    state.context.refresh().await;
    ApiResponse::success(state.context.snapshot().into())
}
