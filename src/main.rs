//! AI Gateway - token-guarded front door for inference servers

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use ai_gateway::{
    cli::{Cli, Command},
    config::Config,
    credentials::CredentialStore,
    gateway::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Tracing needs the configured level, so config errors go to stderr
    let config = match Config::load(Some(&cli.config)) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.gateway.port = port;
            }
            if let Some(ref host) = cli.host {
                config.gateway.host.clone_from(host);
            }
            if let Some(ref level) = cli.log_level {
                config.gateway.log_level.clone_from(level);
            }
            if cli.log_format.is_some() {
                config.gateway.log_format.clone_from(&cli.log_format);
            }
            config
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = setup_tracing(
        &config.gateway.log_level,
        config.gateway.log_format.as_deref(),
    ) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::CheckConfig) => check_config(&config),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Print what the gateway would run with
fn check_config(config: &Config) -> ExitCode {
    let credentials = CredentialStore::from_env(&config.auth.token_env);

    println!("✅ Configuration valid\n");
    println!(
        "   Listen:  {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!(
        "   Mount:   {} -> {}",
        config.proxy.mount_path, config.proxy.upstream_url
    );
    println!(
        "   Auth:    {} ({} token(s) from {}, header {})",
        credentials.mode(),
        credentials.len(),
        config.auth.token_env,
        config.auth.header
    );
    println!("   Servers:");
    for server in &config.backends.servers {
        println!("     - {server}");
    }

    ExitCode::SUCCESS
}

/// Run the gateway server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.gateway.port,
        backends = config.backends.servers.len(),
        "Starting AI Gateway"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Run with graceful shutdown
    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
