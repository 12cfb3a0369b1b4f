//! HTTP router and handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::warn;

use super::auth::{AuthGate, auth_middleware};
use super::forward::RequestForwarder;
use super::health::health_handler;
use crate::Error;
use crate::backend::BackendRegistry;

/// Shared application state
pub struct AppState {
    /// Backend registry reported by `/health`
    pub backends: BackendRegistry,
    /// Token check for the mounted service
    pub auth_gate: Arc<AuthGate>,
    /// Downstream service for allowed requests
    pub forwarder: Arc<dyn RequestForwarder>,
    /// Path prefix delegated to the forwarder
    pub mount_path: String,
    /// Time allowed for the forwarder to produce a response head
    pub request_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

/// Create the router
///
/// `/health` sits outside the auth layer; everything under the mount path
/// goes through [`auth_middleware`] before reaching the forwarder.
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_gate = Arc::clone(&state.auth_gate);
    let mount = state.mount_path.clone();

    let mounted = Router::new()
        .route(&mount, any(forward_handler))
        .route(&format!("{mount}/{{*path}}"), any(forward_handler))
        // route_layer: unmatched paths fall through to 404 without an auth check
        .route_layer(middleware::from_fn_with_state(auth_gate, auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .merge(mounted)
        .layer(DefaultBodyLimit::max(state.max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for every method and path under the mount path
async fn forward_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_owned();

    let result = match tokio::time::timeout(
        state.request_timeout,
        state.forwarder.forward(request),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(Error::UpstreamTimeout(format!(
            "no response within {}s",
            state.request_timeout.as_secs()
        ))),
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            warn!(path = %path, error = %e, "Forwarding failed");
            e.into_response()
        }
    }
}
