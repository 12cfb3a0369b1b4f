//! Authentication middleware for the AI gateway
//!
//! Requests under the mount path must carry one of the configured tokens,
//! verbatim, in the auth header (`Authorization` by default). There is no
//! scheme parsing: `Authorization: Bearer abc` only matches a token that is
//! literally `Bearer abc`.
//!
//! With no tokens configured the gate runs in [`AuthMode::Disabled`] and lets
//! everything through.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::credentials::{AuthMode, CredentialStore};
use crate::{Error, Result};

/// Detail message returned with every rejection
pub const REJECTION_DETAIL: &str = "Invalid gateway token";

/// Per-request token check against the credential store
#[derive(Debug)]
pub struct AuthGate {
    credentials: CredentialStore,
    header: HeaderName,
}

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Header absent (or not valid UTF-8)
    MissingToken,
    /// Header present but not a configured token
    InvalidToken,
}

impl AuthGate {
    /// Create a gate reading the token from `header`
    #[must_use]
    pub fn new(credentials: CredentialStore, header: HeaderName) -> Self {
        Self {
            credentials,
            header,
        }
    }

    /// Create a gate from the auth section of the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured header name is invalid.
    pub fn from_config(config: &AuthConfig, credentials: CredentialStore) -> Result<Self> {
        let header = HeaderName::try_from(config.header.as_str())
            .map_err(|e| Error::Config(format!("Invalid auth.header '{}': {e}", config.header)))?;
        Ok(Self::new(credentials, header))
    }

    /// Current authentication mode
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    /// Header the token is read from
    #[must_use]
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Decide whether a request with these headers may proceed
    pub fn check(&self, headers: &HeaderMap) -> std::result::Result<(), AuthRejection> {
        if self.mode() == AuthMode::Disabled {
            return Ok(());
        }

        let token = headers.get(&self.header).and_then(|v| v.to_str().ok());
        match token {
            None => Err(AuthRejection::MissingToken),
            Some(token) if self.credentials.contains(token) => Ok(()),
            Some(_) => Err(AuthRejection::InvalidToken),
        }
    }
}

impl AuthRejection {
    /// Short label used in logs
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingToken => "missing token",
            Self::InvalidToken => "invalid token",
        }
    }
}

// Both variants look the same to the client.
impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "status": "forbidden",
                "detail": REJECTION_DETAIL,
            })),
        )
            .into_response()
    }
}

/// Authentication middleware
///
/// Allowed requests are passed on untouched, auth header included.
pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match gate.check(request.headers()) {
        Ok(()) => {
            debug!(path = %request.uri().path(), mode = %gate.mode(), "Request allowed");
            next.run(request).await
        }
        Err(rejection) => {
            warn!(
                path = %request.uri().path(),
                method = %request.method(),
                reason = rejection.reason(),
                "Rejected request"
            );
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    fn gate(tokens: Option<&str>) -> AuthGate {
        AuthGate::new(CredentialStore::from_value(tokens), AUTHORIZATION)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_disabled_allows_everything() {
        let gate = gate(None);
        assert_eq!(gate.mode(), AuthMode::Disabled);
        assert!(gate.check(&HeaderMap::new()).is_ok());
        assert!(gate.check(&headers_with("anything")).is_ok());
    }

    #[test]
    fn test_lone_comma_is_disabled_not_empty_token() {
        let gate = gate(Some(","));
        assert_eq!(gate.mode(), AuthMode::Disabled);
        assert!(gate.check(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_enforced_accepts_configured_token() {
        let gate = gate(Some("secret-abc,secret-def"));
        assert!(gate.check(&headers_with("secret-abc")).is_ok());
        assert!(gate.check(&headers_with("secret-def")).is_ok());
    }

    #[test]
    fn test_enforced_rejects_missing_header() {
        let gate = gate(Some("secret-abc"));
        assert_eq!(
            gate.check(&HeaderMap::new()),
            Err(AuthRejection::MissingToken)
        );
    }

    #[test]
    fn test_enforced_rejects_unknown_token() {
        let gate = gate(Some("secret-abc"));
        assert_eq!(
            gate.check(&headers_with("secret-xyz")),
            Err(AuthRejection::InvalidToken)
        );
        assert_eq!(
            gate.check(&headers_with("")),
            Err(AuthRejection::InvalidToken)
        );
    }

    #[test]
    fn test_bearer_prefix_not_stripped() {
        let gate = gate(Some("secret-abc"));
        assert_eq!(
            gate.check(&headers_with("Bearer secret-abc")),
            Err(AuthRejection::InvalidToken)
        );
    }

    #[test]
    fn test_custom_header() {
        let config = AuthConfig {
            header: "x-api-key".to_string(),
            ..AuthConfig::default()
        };
        let gate =
            AuthGate::from_config(&config, CredentialStore::from_value(Some("k1"))).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k1"));
        assert!(gate.check(&headers).is_ok());

        // Token in the default header is not looked at
        assert_eq!(
            gate.check(&headers_with("k1")),
            Err(AuthRejection::MissingToken)
        );
    }

    #[test]
    fn test_from_config_rejects_bad_header() {
        let config = AuthConfig {
            header: "not a header".to_string(),
            ..AuthConfig::default()
        };
        assert!(AuthGate::from_config(&config, CredentialStore::default()).is_err());
    }

    #[test]
    fn test_decision_is_repeatable() {
        let gate = gate(Some("secret-abc"));
        let good = headers_with("secret-abc");
        let bad = headers_with("nope");
        for _ in 0..100 {
            assert!(gate.check(&good).is_ok());
            assert!(gate.check(&bad).is_err());
        }
    }

    #[test]
    fn test_rejection_response_is_forbidden() {
        let response = AuthRejection::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
