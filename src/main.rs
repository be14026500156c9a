//! LLM Gateway
//!
//! Bearer-token gateway in front of one or more LLM backends (Ollama and
//! compatible servers), built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ auth gate ──▶ path router ──▶ request pump ──▶ Backend
//!                 │               │                              │
//!                401       registry lookup                       │
//!                                                                ▼
//!   Client ◀──────────────────────────── response pump ◀──── streamed body
//! ```
//!
//! `/{backend}/...` selects a named backend and strips the prefix; any other
//! path goes to the default backend unchanged.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use llm_gateway::config::{self, ConfigOverrides};
use llm_gateway::lifecycle::{wait_for_signal, Shutdown};
use llm_gateway::observability::{logging, metrics};
use llm_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "llm-gateway")]
#[command(about = "Authenticating streaming gateway for LLM backends", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bearer token clients must present.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Serve without authentication.
    #[arg(long)]
    no_auth: bool,

    /// Backend instances: "name:host:port,name2:host:port".
    #[arg(long, env = "OLLAMA_INSTANCES")]
    instances: Option<String>,

    /// Bind host.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Bind port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Debug logging (true/false, yes/no, on/off, 1/0).
    #[arg(long, env = "DEBUG", value_parser = clap::builder::BoolishValueParser::new())]
    debug: Option<bool>,

    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, env = "CONNECT_TIMEOUT_SECS")]
    connect_timeout: Option<u64>,

    #[arg(long, env = "RESPONSE_TIMEOUT_SECS")]
    response_timeout: Option<u64>,

    #[arg(long, env = "IDLE_TIMEOUT_SECS")]
    idle_timeout: Option<u64>,

    /// Expose Prometheus metrics on this address.
    #[arg(long, env = "METRICS_ADDRESS")]
    metrics_address: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            token: self.token.clone().filter(|t| !t.is_empty()),
            disable_auth: self.no_auth,
            instances: self.instances.clone(),
            host: self.host.clone(),
            port: self.port,
            debug: self.debug,
            log_level: self.log_level.clone(),
            connect_timeout_secs: self.connect_timeout,
            response_timeout_secs: self.response_timeout,
            idle_timeout_secs: self.idle_timeout,
            metrics_address: self.metrics_address.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.overrides())?;
    logging::init(&config.observability);

    tracing::info!("llm-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = config.resolve()?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let server = GatewayServer::new(settings);

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        res = &mut server_task => {
            res??;
            return Ok(());
        }
        _ = wait_for_signal() => {}
    }

    shutdown.drain(server_task).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
