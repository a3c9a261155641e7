//! The service shell: routing, health, and error containment.

use std::any::Any;
use std::sync::Arc;

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;

use labeld_auth::{EmitAuthorizer, KeyResolver};
use labeld_store::Store;

use crate::broadcast::Broadcaster;
use crate::config::LabelerConfig;
use crate::emit::emit_event;
use crate::error::ApiError;
use crate::query::query_labels;
use crate::sequencer::Sequencer;
use crate::subscribe::subscribe_labels;

/// Service version reported by the health probe.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LabelerConfig>,
    pub store: Arc<dyn Store>,
    pub sequencer: Arc<Sequencer>,
    pub broadcaster: Arc<Broadcaster>,
    pub resolver: Arc<dyn KeyResolver>,
    pub authorizer: Arc<dyn EmitAuthorizer>,
}

impl AppState {
    /// Wire up the pipeline around an initialized store.
    pub fn new(
        config: LabelerConfig,
        store: Arc<dyn Store>,
        resolver: Arc<dyn KeyResolver>,
        authorizer: Arc<dyn EmitAuthorizer>,
    ) -> Self {
        let config = Arc::new(config);
        let broadcaster = Arc::new(Broadcaster::new());
        let sequencer = Arc::new(Sequencer::new(&config, store.clone(), broadcaster.clone()));
        Self {
            config,
            store,
            sequencer,
            broadcaster,
            resolver,
            authorizer,
        }
    }
}

/// Build the xrpc router. Callers must have run `Store::init` first; the
/// router assumes a working schema.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/xrpc/com.atproto.label.queryLabels", get(query_labels))
        .route("/xrpc/tools.ozone.moderation.emitEvent", post(emit_event))
        .route("/xrpc/com.atproto.label.subscribeLabels", get(subscribe_labels))
        .route("/xrpc/_health", get(health))
        .fallback(fallback)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// GET /xrpc/_health — version plus a store probe.
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Response {
    match state.store.max_id().await {
        Ok(_) => Json(serde_json::json!({ "version": VERSION })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "version": VERSION, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Unknown xrpc methods are 501; anything else is a plain 404.
async fn fallback(uri: Uri) -> Response {
    if uri.path().starts_with("/xrpc/") {
        ApiError::MethodNotImplemented.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Panics escaping a handler become wire-shaped 500s instead of hangups.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");
    ApiError::Internal("internal server error".into()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use labeld_auth::{HttpDidResolver, LabelerOnly};
    use labeld_store::MemoryStore;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = LabelerConfig::from_strings(
            "did:plc:aaa",
            "1111111111111111111111111111111111111111111111111111111111111111",
        )
        .unwrap();
        AppState::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(HttpDidResolver::new()),
            Arc::new(LabelerOnly::new("did:plc:aaa")),
        )
    }

    async fn get_json(
        router: Router,
        path: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (status, json) = get_json(build_router(test_state()), "/xrpc/_health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["version"], VERSION);
    }

    #[tokio::test]
    async fn unknown_xrpc_method_is_501() {
        let (status, json) =
            get_json(build_router(test_state()), "/xrpc/com.example.noSuchMethod").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(json["error"], "MethodNotImplemented");
    }

    #[tokio::test]
    async fn non_xrpc_path_is_404() {
        let (status, _) = get_json(build_router(test_state()), "/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_store_query_returns_zero_cursor() {
        let (status, json) = get_json(
            build_router(test_state()),
            "/xrpc/com.atproto.label.queryLabels",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cursor"], "0");
        assert_eq!(json["labels"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn invalid_limit_is_invalid_request() {
        let (status, json) = get_json(
            build_router(test_state()),
            "/xrpc/com.atproto.label.queryLabels?limit=9999",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "InvalidRequest");
    }

    #[tokio::test]
    async fn emit_without_authorization_is_401() {
        let router = build_router(test_state());
        let request = Request::post("/xrpc/tools.ozone.moderation.emitEvent")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "AuthRequired");
    }
}
