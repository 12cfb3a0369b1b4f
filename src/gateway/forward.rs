//! Delegation of authenticated requests to the mounted proxy service

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, Uri, header},
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::{Error, Result};

/// Headers that describe a single connection and must not be relayed
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Downstream service that handles requests the gateway has let through
#[async_trait]
pub trait RequestForwarder: Send + Sync {
    /// Service one request and return its response unmodified
    async fn forward(&self, request: Request<Body>) -> Result<Response>;
}

/// Forwards requests over HTTP to a single upstream base URL
///
/// The mount path is stripped before joining, so with mount `/v1` and
/// upstream `http://litellm:4000`, `POST /v1/chat/completions` goes to
/// `http://litellm:4000/chat/completions`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    upstream: Url,
    mount_path: String,
    max_body_size: usize,
}

impl HttpForwarder {
    /// Create a forwarder from the proxy configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ProxyConfig, max_body_size: usize) -> Result<Self> {
        let upstream = Url::parse(&config.upstream_url)
            .map_err(|e| Error::Config(format!("Invalid proxy.upstream_url: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            // Redirects go back to the client untouched
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            upstream,
            mount_path: config.mount_path.clone(),
            max_body_size,
        })
    }

    /// Upstream URL for an inbound request URI
    #[must_use]
    pub fn target_url(&self, uri: &Uri) -> Url {
        let path = uri.path();
        let rest = path.strip_prefix(self.mount_path.as_str()).unwrap_or(path);

        let base = self.upstream.path().trim_end_matches('/');
        let joined = format!("{base}{rest}");

        let mut url = self.upstream.clone();
        url.set_path(if joined.is_empty() { "/" } else { &joined });
        url.set_query(uri.query());
        url
    }
}

#[async_trait]
impl RequestForwarder for HttpForwarder {
    async fn forward(&self, request: Request<Body>) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(&parts.uri);

        let body = Limited::new(body, self.max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    Error::PayloadTooLarge(self.max_body_size)
                } else {
                    Error::Internal(format!("Failed to read request body: {e}"))
                }
            })?
            .to_bytes();

        let mut headers = relay_headers(&parts.headers);
        // Set by the client from the target URL and the buffered body
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        debug!(method = %parts.method, url = %url, "Forwarding request");

        let upstream = self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Upstream request failed");
                if e.is_timeout() {
                    Error::UpstreamTimeout(e.to_string())
                } else {
                    Error::Upstream(e.to_string())
                }
            })?;

        let status = upstream.status();
        let response_headers = relay_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Copy headers, dropping hop-by-hop ones and any named in `Connection`
fn relay_headers(source: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = source
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut headers = source.clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    for name in &listed {
        headers.remove(name.as_str());
    }
    headers
}
