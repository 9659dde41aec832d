//! HTTP and WebSocket adapter over a [`ControlHandle`].
//!
//! The web layer owns no business logic: each endpoint forwards to the
//! controller task and renders the reply.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

pub use config::WebConfig;
pub use router::create_app;

use crate::control::ControlHandle;
use crate::error::{GuardError, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::info;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub control: ControlHandle,
    pub config: WebConfig,
    pub clients: Arc<RwLock<HashMap<String, websocket::Client>>>,
}

impl AppState {
    pub fn new(control: ControlHandle, config: WebConfig) -> Self {
        Self {
            control,
            config,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Serve the control API until `stop` turns `true`.
pub async fn start_web_server(
    config: WebConfig,
    control: ControlHandle,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| GuardError::config_error(format!("Invalid bind address: {}", e)))?;

    let app = create_app(AppState::new(control, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GuardError::web_server_error(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Control API on http://{}/", addr);
    info!("Status stream on ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|stopped| *stopped).await;
        })
        .await
        .map_err(|e| GuardError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
