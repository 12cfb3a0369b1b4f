//! AI Gateway Library
//!
//! Token-guarded API gateway in front of one or more Ollama-style inference
//! servers.
//!
//! # Features
//!
//! - **Token authentication**: comma-separated token list read once from the
//!   environment; an empty list leaves the gateway open
//! - **Mounted proxy**: everything under `/v1` is delegated to an upstream
//!   OpenAI-compatible proxy service
//! - **Health check**: unauthenticated `GET /health` listing configured servers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level`.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    }
    .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
