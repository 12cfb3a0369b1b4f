//! Liveness endpoint

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::router::AppState;
use crate::backend::BackendRegistry;

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `healthy` while the process is serving
    pub status: String,
    /// Configured backend servers, in configuration order
    pub servers: Vec<String>,
}

impl HealthReport {
    /// Snapshot the registry
    #[must_use]
    pub fn from_registry(registry: &BackendRegistry) -> Self {
        Self {
            status: "healthy".to_string(),
            servers: registry.servers().to_vec(),
        }
    }
}

/// GET /health handler - unauthenticated
pub(super) async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport::from_registry(&state.backends))
}
