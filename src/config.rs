//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order; variables already set win.
    /// Useful for keeping the token list out of the shell environment.
    pub env_files: Vec<String>,
    /// Listener and logging settings
    pub gateway: GatewayConfig,
    /// Inference backends reported by `/health`
    #[serde(alias = "ollama")]
    pub backends: BackendsConfig,
    /// Token authentication
    pub auth: AuthConfig,
    /// Mounted proxy service
    pub proxy: ProxyConfig,
}

/// Listener and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (text, json)
    pub log_format: Option<String>,
    /// Request timeout (covers the upstream response head, not streamed bodies)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_format: None,
            request_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Backend registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Ordered backend server URLs
    pub servers: Vec<String>,
}

/// Authentication configuration for gateway access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the comma-separated token list.
    /// Unset or empty means the gateway runs open.
    pub token_env: String,
    /// Request header carrying the raw token
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: "OLLAMA_TOKEN".to_string(),
            header: "authorization".to_string(),
        }
    }
}

/// Proxy (mounted service) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path prefix delegated wholesale to the upstream service
    pub mount_path: String,
    /// Base URL of the upstream proxy service
    pub upstream_url: String,
    /// Upstream request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mount_path: "/v1".to_string(),
            upstream_url: "http://127.0.0.1:4000".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Load configuration from file and environment, then validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (AI_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("AI_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files first so ${VAR} expansion and token lookup can see them
        config.load_env_files();
        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Check the invariants the gateway relies on at runtime
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.backends.servers.is_empty() {
            return Err(Error::Config(
                "backends.servers must list at least one server".to_string(),
            ));
        }
        for server in &self.backends.servers {
            validate_http_url(server)
                .map_err(|e| Error::Config(format!("Invalid backend server '{server}': {e}")))?;
        }

        let mount = &self.proxy.mount_path;
        if !mount.starts_with('/') || mount == "/" || mount.ends_with('/') {
            return Err(Error::Config(format!(
                "proxy.mount_path must be a non-root path without trailing slash, got '{mount}'"
            )));
        }
        if mount.contains(['{', '}', '*']) {
            return Err(Error::Config(format!(
                "proxy.mount_path must be a literal path without '{{', '}}' or '*', got '{mount}'"
            )));
        }
        if mount == "/health" {
            return Err(Error::Config(
                "proxy.mount_path must not shadow /health".to_string(),
            ));
        }
        validate_http_url(&self.proxy.upstream_url).map_err(|e| {
            Error::Config(format!(
                "Invalid proxy.upstream_url '{}': {e}",
                self.proxy.upstream_url
            ))
        })?;

        if self.auth.header.is_empty() {
            return Err(Error::Config("auth.header must not be empty".to_string()));
        }
        axum::http::HeaderName::try_from(self.auth.header.as_str())
            .map_err(|e| Error::Config(format!("Invalid auth.header: {e}")))?;

        Ok(())
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in server and upstream URLs
    fn expand_env_vars(&mut self) {
        let re = env_pattern();

        for server in &mut self.backends.servers {
            *server = Self::expand_string(&re, server);
        }
        self.proxy.upstream_url = Self::expand_string(&re, &self.proxy.upstream_url);
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}

/// Pattern: ${VAR} or ${VAR:-default}
fn env_pattern() -> Regex {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap()
}

fn validate_http_url(value: &str) -> std::result::Result<(), String> {
    let url = Url::parse(value).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" first: it also ends with 's'
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
