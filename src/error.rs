//! Error types for the AI gateway

use std::io;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for the AI gateway
pub type Result<T> = std::result::Result<T, Error>;

/// AI gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream service unreachable or returned an unusable response
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream service did not answer in time
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Request body exceeds the configured limit (bytes)
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status reported to the client when this error ends a proxied request
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    ///
    /// Upstream and internal details (addresses, client error text) stay in
    /// the logs.
    #[must_use]
    pub fn client_detail(&self) -> String {
        match self {
            Self::Upstream(_) => "Upstream service unavailable".to_string(),
            Self::UpstreamTimeout(_) => "Upstream service timed out".to_string(),
            Self::PayloadTooLarge(_) => self.to_string(),
            _ => "Internal error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(json!({
                "status": status.canonical_reason().unwrap_or("error").to_lowercase(),
                "detail": self.client_detail(),
            })),
        )
            .into_response()
    }
}
