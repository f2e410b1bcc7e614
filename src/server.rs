use axum::{
    http::HeaderValue,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AuthConfig, ServerConfig};
use crate::context::TenantContext;
use crate::error::ApiError;
use crate::handlers;
use crate::identity::IdentitySource;

/// Shared state of the HTTP bridge
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<TenantContext>,
    pub identities: Arc<IdentitySource>,
    pub auth: AuthConfig,
}

pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(session_routes())
        .merge(context_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router.layer(cors_layer(&server.cors_origins))
    } else {
        router
    }
}

fn session_routes() -> Router<AppState> {
    use handlers::session;

    Router::new().route(
        "/api/session",
        put(session::session_put).delete(session::session_delete),
    )
}

fn context_routes() -> Router<AppState> {
    use handlers::context;

    Router::new()
        .route("/api/context", get(context::context_get))
        .route("/api/context/switch/:company_id", post(context::context_switch))
        .route("/api/context/refresh", post(context::context_refresh))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Company Context",
            "version": version,
            "description": "Tenant context bridge: memberships, current company and switching",
            "endpoints": {
                "health": "GET /health",
                "session": "PUT /api/session, DELETE /api/session",
                "context": "GET /api/context",
                "switch": "POST /api/context/switch/:company_id",
                "refresh": "POST /api/context/refresh",
            }
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::testing::{sample_directory, shared_store, user};

    fn state() -> AppState {
        AppState {
            context: Arc::new(TenantContext::new(Arc::new(sample_directory()), shared_store())),
            identities: Arc::new(IdentitySource::new()),
            auth: AuthConfig::default(),
        }
    }

    fn server_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            enable_cors: true,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_responds() {
        let (status, body) = send(app(state(), &server_config()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn context_reports_loaded_companies() {
        let state = state();
        state.context.load(Some(user("u1"))).await;

        let (status, body) = send(app(state, &server_config()), "GET", "/api/context", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["phase"], "loaded");
        assert_eq!(body["data"]["companies"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["current_company"]["id"], "A");
        assert_eq!(body["data"]["user_role"], "user");
    }

    #[tokio::test]
    async fn switch_applies_known_and_ignores_unknown() {
        let state = state();
        state.context.load(Some(user("u1"))).await;
        let router = app(state, &server_config());

        let (status, body) = send(router.clone(), "POST", "/api/context/switch/B", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["current_company"]["id"], "B");
        assert_eq!(body["data"]["user_role"], "admin");

        let (status, body) = send(router, "POST", "/api/context/switch/zzz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["current_company"]["id"], "B");
    }

    #[tokio::test]
    async fn session_put_drives_followed_context() {
        let state = state();
        let _subscription = state.context.follow(&state.identities);
        let router = app(state.clone(), &server_config());

        let (status, body) = send(
            router.clone(),
            "PUT",
            "/api/session",
            Some(json!({"id": "u2", "email": "u2@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["identity"]["id"], "u2");

        let mut rx = state.context.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.borrow_and_update().current_company_id() != Some("C") {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let (status, body) = send(router, "DELETE", "/api/session", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["phase"], "empty");
        assert!(body["data"]["identity"].is_null());
        assert_eq!(body["data"]["companies"], json!([]));
        assert!(body["data"]["current_company"].is_null());
        assert_eq!(body["data"]["loading"], false);
        assert!(state.identities.current().is_none());
    }

    #[tokio::test]
    async fn session_put_rejects_bad_bodies() {
        let router = app(state(), &server_config());

        let (status, body) = send(router.clone(), "PUT", "/api/session", Some(json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "BAD_REQUEST");

        let (status, _) = send(
            router.clone(),
            "PUT",
            "/api/session",
            Some(json!({"id": " ", "email": "x@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // no JWT secret configured
        let (status, _) = send(router, "PUT", "/api/session", Some(json!({"access_token": "abc"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = send(app(state(), &server_config()), "GET", "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "NOT_FOUND");
    }
}
