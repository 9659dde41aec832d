//! Web application router and middleware setup.

use crate::web::{handlers, websocket, AppState, WebConfig};
use axum::{
    extract::{Request, State},
    http::{
        header::{CONTENT_TYPE, HOST, ORIGIN},
        HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Create the axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    let mut app = Router::new()
        .route("/", get(handlers::default_index))
        .route("/api/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))
        .route("/api/mode", post(handlers::switch_mode))
        .route("/api/settings/:key", put(handlers::set_setting))
        .route("/api/timers/:kind/start", post(handlers::start_timer))
        .route("/api/timers/:kind/cancel", post(handlers::cancel_timer))
        .route("/api/monitoring", post(handlers::set_monitoring))
        .route("/ws", get(websocket::websocket_handler))
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .with_state(state);

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// CORS for the configured origins, or `None` when none are configured.
/// Origins that are not valid header values are skipped.
pub fn build_cors_layer(config: &WebConfig) -> Option<CorsLayer> {
    if !config.cors_enabled() {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.trim_end_matches('/').parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([CONTENT_TYPE]),
    )
}

/// Refuse state-changing requests sent by pages from foreign origins.
/// Requests without an `Origin` header (command-line clients) pass.
async fn origin_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !request.method().is_safe() {
        if let Some(origin) = request.headers().get(ORIGIN) {
            let host = request.headers().get(HOST).and_then(|h| h.to_str().ok());
            let allowed = origin
                .to_str()
                .map(|origin| state.config.allows_origin(origin, host))
                .unwrap_or(false);
            if !allowed {
                warn!(?origin, path = %request.uri().path(), "Rejected cross-origin command");
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": "cross-origin request refused" })),
                )
                    .into_response();
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::control::{ControlHandle, LogOnlyShutdown, ModeController, ThresholdMonitor};
    use crate::web::WebConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app_without_controller(dir: &TempDir) -> Router {
        app_with_config(dir, WebConfig::default())
    }

    fn app_with_config(dir: &TempDir, config: WebConfig) -> Router {
        let store = ConfigStore::open(dir.path().join("config.json"));
        let controller =
            ModeController::new(store, Arc::new(LogOnlyShutdown), ThresholdMonitor::new());
        let (handle, _commands) = ControlHandle::channel(controller.subscribe());
        create_app(AppState::new(handle, config))
    }

    fn cancel_from(origin: &str) -> Request<Body> {
        Request::post("/api/timers/shutdown/cancel")
            .header("host", "127.0.0.1:8080")
            .header("origin", origin)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_route_reads_published_snapshot() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_command_without_controller_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(
                Request::post("/api/timers/shutdown/cancel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_timer_is_unprocessable() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(
                Request::post("/api/timers/nap/cancel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_foreign_origin_command_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(cancel_from("https://evil.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_same_origin_command_passes_guard() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(cancel_from("http://127.0.0.1:8080"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_foreign_origin_may_read_status() {
        let dir = TempDir::new().unwrap();
        let response = app_without_controller(&dir)
            .oneshot(
                Request::get("/api/status")
                    .header("origin", "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_configured_origin_gets_cors() {
        let dir = TempDir::new().unwrap();
        let config = WebConfig::default().with_cors_origins(["http://dashboard.lan:3000"]);

        let response = app_with_config(&dir, config.clone())
            .oneshot(cancel_from("http://dashboard.lan:3000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://dashboard.lan:3000"
        );

        let response = app_with_config(&dir, config)
            .oneshot(cancel_from("https://evil.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
