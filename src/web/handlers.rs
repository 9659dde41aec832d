//! HTTP handlers for the control API.

use crate::config::{Mode, SettingKey, Settings};
use crate::control::{StatusSnapshot, TimerKind};
use crate::error::GuardError;
use crate::web::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

/// A [`GuardError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GuardError);

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            GuardError::TimerInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GuardError::ChannelClosed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub minutes: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MonitoringRequest {
    pub enabled: bool,
}

/// Accept both `"12"` and `12` for user-entered numbers.
fn entered_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "thermal-guard",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.control.status())
}

pub async fn switch_mode(
    State(state): State<AppState>,
    Json(request): Json<ModeRequest>,
) -> ApiResult<StatusSnapshot> {
    let mode: Mode = request.mode.parse()?;
    Ok(Json(state.control.switch_mode(mode).await?))
}

pub async fn set_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<ValueRequest>,
) -> ApiResult<Settings> {
    let key: SettingKey = key.parse()?;
    let settings = state
        .control
        .set_value(key, entered_text(&request.value))
        .await?;
    Ok(Json(settings))
}

pub async fn start_timer(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    request: Option<Json<StartRequest>>,
) -> ApiResult<Value> {
    let kind: TimerKind = kind.parse()?;
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let entered = request.minutes.as_ref().map(entered_text);
    let started = state.control.start_timer(kind, entered).await?;
    Ok(Json(json!({ "timer": kind, "started": started })))
}

pub async fn cancel_timer(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Value> {
    let kind: TimerKind = kind.parse()?;
    let cancelled = state.control.cancel_timer(kind).await?;
    Ok(Json(json!({ "timer": kind, "cancelled": cancelled })))
}

pub async fn set_monitoring(
    State(state): State<AppState>,
    Json(request): Json<MonitoringRequest>,
) -> ApiResult<Value> {
    let enabled = state.control.set_monitoring(request.enabled).await?;
    Ok(Json(json!({ "monitoring_enabled": enabled })))
}

/// Built-in index page listing the endpoints.
pub async fn default_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Thermal Guard</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; color: #333; }
        h1 { color: #c0392b; }
        code { background: #f4f4f4; padding: 2px 6px; border-radius: 4px; }
        li { margin-bottom: 6px; }
        #status { background: #f9f9f9; padding: 16px; border-radius: 8px; white-space: pre; }
    </style>
</head>
<body>
    <h1>Thermal Guard</h1>
    <ul>
        <li><code>GET /api/health</code></li>
        <li><code>GET /api/status</code></li>
        <li><code>POST /api/mode</code> <code>{"mode": "monitor" | "timer_shutdown" | "timer_check"}</code></li>
        <li><code>PUT /api/settings/:key</code> <code>{"value": "..."}</code></li>
        <li><code>POST /api/timers/:kind/start</code> <code>{"minutes": "..."}</code></li>
        <li><code>POST /api/timers/:kind/cancel</code></li>
        <li><code>POST /api/monitoring</code> <code>{"enabled": true}</code></li>
        <li><code>GET /ws</code> live status</li>
    </ul>
    <div id="status">connecting...</div>
    <script>
        const ws = new WebSocket(`ws://${location.host}/ws`);
        ws.onmessage = (event) => {
            document.getElementById('status').textContent =
                JSON.stringify(JSON.parse(event.data), null, 2);
        };
        ws.onclose = () => { document.getElementById('status').textContent = 'disconnected'; };
    </script>
</body>
</html>
"#;
