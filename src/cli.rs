//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Token-guarded API gateway for Ollama-style inference servers
#[derive(Parser, Debug)]
#[command(name = "ai-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(
        short,
        long,
        default_value = "config.yaml",
        env = "AI_GATEWAY_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Port to listen on (overrides gateway.port)
    #[arg(short, long, env = "AI_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to (overrides gateway.host)
    #[arg(long, env = "AI_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides gateway.log_level
    #[arg(long, env = "AI_GATEWAY_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json); overrides gateway.log_format
    #[arg(long, env = "AI_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Load and validate the configuration, then print a summary
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve_mode() {
        let cli = Cli::try_parse_from(["ai-gateway"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_overrides_and_subcommand() {
        let cli = Cli::try_parse_from([
            "ai-gateway",
            "--config",
            "/etc/ai-gateway.yaml",
            "--port",
            "9000",
            "--log-level",
            "debug",
            "check-config",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ai-gateway.yaml"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::CheckConfig)));
    }
}
