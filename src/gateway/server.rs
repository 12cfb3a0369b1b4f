//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::AuthGate;
use super::forward::{HttpForwarder, RequestForwarder};
use super::router::{AppState, create_router};
use crate::backend::BackendRegistry;
use crate::config::Config;
use crate::credentials::{AuthMode, CredentialStore};
use crate::{Error, Result};

/// AI gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared request state
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a gateway forwarding over HTTP to `proxy.upstream_url`.
    ///
    /// Reads the token list from the environment variable named by
    /// `auth.token_env`, once.
    pub fn new(config: Config) -> Result<Self> {
        let credentials = CredentialStore::from_env(&config.auth.token_env);
        let forwarder = Arc::new(HttpForwarder::new(
            &config.proxy,
            config.gateway.max_body_size,
        )?);
        Self::with_parts(config, credentials, forwarder)
    }

    /// Create a gateway from explicit parts
    pub fn with_parts(
        config: Config,
        credentials: CredentialStore,
        forwarder: Arc<dyn RequestForwarder>,
    ) -> Result<Self> {
        let backends = BackendRegistry::from_config(&config.backends)?;
        let auth_gate = Arc::new(AuthGate::from_config(&config.auth, credentials)?);

        for server in backends.servers() {
            info!(server = %server, "Registered backend");
        }

        let state = Arc::new(AppState {
            backends,
            auth_gate,
            forwarder,
            mount_path: config.proxy.mount_path.clone(),
            request_timeout: config.gateway.request_timeout,
            max_body_size: config.gateway.max_body_size,
        });

        Ok(Self { config, state })
    }

    /// Authentication mode in effect
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.state.auth_gate.mode()
    }

    /// Build the HTTP router
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .gateway
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.gateway.port,
        );

        let listener = TcpListener::bind(addr).await?;
        let app = self.router();

        let host = &self.config.gateway.host;
        let port = self.config.gateway.port;
        info!("============================================================");
        info!("AI GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %host, port = %port, "Listening");
        info!(backends = self.state.backends.len(), "Backends registered");

        let auth_gate = &self.state.auth_gate;
        match auth_gate.mode() {
            AuthMode::Enforced => info!(
                "AUTHENTICATION enforced (header={}, env={})",
                auth_gate.header(),
                self.config.auth.token_env
            ),
            AuthMode::Disabled => warn!(
                "AUTHENTICATION disabled - {} is unset or empty, gateway is open to all requests",
                self.config.auth.token_env
            ),
        }

        info!(
            "  ANY  http://{host}:{port}{}/*  -> {}",
            self.config.proxy.mount_path, self.config.proxy.upstream_url
        );
        info!("  GET  http://{host}:{port}/health  (unauthenticated)");
        info!("============================================================");

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel(1);
        let mut server = Box::pin(
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown_tx))
                .into_future(),
        );

        tokio::select! {
            result = &mut server => result?,
            _ = shutdown_rx.recv() => {
                // Drain in-flight requests, bounded by the shutdown timeout
                let drain = self.config.gateway.shutdown_timeout;
                match tokio::time::timeout(drain, &mut server).await {
                    Ok(result) => result?,
                    Err(_) => warn!(timeout_secs = drain.as_secs(), "Shutdown timeout elapsed, dropping open connections"),
                }
            }
        }

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
