use clap::Parser;
use exec_gateway::{spawn_sweeper, ExecutionGateway, GatewayConfig};
use exec_gateway_server::{create_app, run_server};
use std::{net::SocketAddr, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, env = "EXEC_GATEWAY_ADDR", default_value = "0.0.0.0:5001")]
    addr: SocketAddr,

    /// Base URL of the Piston execution service
    #[arg(long, env = "PISTON_API_URL", default_value = "http://localhost:2000")]
    piston_url: String,

    /// Timeout for each execution attempt in milliseconds
    #[arg(long, env = "PISTON_TIMEOUT", default_value = "10000")]
    attempt_timeout_ms: u64,

    /// Maximum attempts per execution
    #[arg(long, env = "PISTON_MAX_RETRIES", default_value = "3")]
    max_retries: u32,

    /// Timeout for the health probe in milliseconds
    #[arg(long, env = "PISTON_HEALTH_TIMEOUT", default_value = "5000")]
    health_timeout_ms: u64,

    /// Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value = "900000")]
    rate_limit_window_ms: u64,

    /// Executions allowed per identity per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value = "100")]
    rate_limit_max: u32,

    /// Maximum source size in bytes
    #[arg(long, env = "MAX_CODE_BYTES", default_value = "50000")]
    max_code_bytes: usize,

    /// Maximum stdin size in bytes
    #[arg(long, env = "MAX_INPUT_BYTES", default_value = "10000")]
    max_input_bytes: usize,

    /// Comma-separated CORS origins; empty allows any origin
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.piston_url.clone())
            .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
            .with_max_retries(self.max_retries)
            .with_health_timeout(Duration::from_millis(self.health_timeout_ms))
            .with_rate_limit(
                Duration::from_millis(self.rate_limit_window_ms),
                self.rate_limit_max,
            )
            .with_limits(self.max_code_bytes, self.max_input_bytes)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.gateway_config();
    let sweep_interval = config.sweep_interval;

    info!(
        piston_url = %config.piston_url,
        max_retries = config.max_retries,
        rate_limit_max = config.rate_limit.max_requests,
        "configured execution gateway"
    );

    let gateway = ExecutionGateway::new(config)?;
    let shutdown = gateway.shutdown_token();

    let sweeper = spawn_sweeper(gateway.rate_limiter(), sweep_interval, shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("shutdown signal received");
        signal_token.cancel();
    });

    let origins: Vec<String> = args
        .allowed_origins
        .iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    let app = create_app(gateway, &origins)?;
    run_server(app, args.addr, shutdown).await?;
    sweeper.await?;

    Ok(())
}
