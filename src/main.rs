//! HTTP sandbox server.
//!
//! Serves a fixed table of diagnostic endpoints (hello, echo, request and
//! upload dumps, Basic and Digest protected hello) under the root namespace
//! and a `/playground/` copy of it.
//!
//! ```text
//!     Client ──▶ middleware stack ──▶ Router::resolve ──▶ handlers::invoke
//!                (request id, trace,     (first anchored      (hello, echo,
//!                 timeout, limits)        prefix match)        dumps, auth)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sandbox_server::config::{self, LogFormat, SandboxConfig};
use sandbox_server::lifecycle::{signals, Shutdown};
use sandbox_server::observability::{init_logging, metrics};
use sandbox_server::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "sandbox-server")]
#[command(about = "HTTP sandbox with diagnostic endpoints", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override observability.log_format (pretty or json)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn resolve_config(args: &Args) -> Result<SandboxConfig, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => SandboxConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(format) = args.log_format {
        config.observability.log_format = format;
    }

    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    init_logging(&config.observability)?;
    tracing::info!("sandbox-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        mount_prefix = %config.routing.mount_prefix,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
