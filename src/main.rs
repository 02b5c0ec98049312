use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber;

use portcullis::config::{PortcullisConfig, RateLimitingConfig};
use portcullis::http::HttpServer;
use portcullis::ratelimit::{RateLimiter, RedisCounterStore};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "portcullis")]
#[command(about = "Web API template service with sliding-window rate limiting")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address override
    #[arg(short, long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Portcullis API Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load configuration: file if given, then environment overrides
    let mut config = match &args.config {
        Some(path) => PortcullisConfig::from_file(path)?,
        None => PortcullisConfig::default(),
    };
    config.apply_env()?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    info!(bind_addr = %config.server.bind_addr, "Configuration loaded");

    // Bring up the rate limiter, degrading to pass-through if the counter
    // store is unreachable
    let limiter = Arc::new(build_limiter(&config.rate_limiting).await);

    // Create and start the HTTP server
    let server = HttpServer::new(config.server.bind_addr, limiter);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Portcullis API Service stopped");
    Ok(())
}

/// Construct the rate limiter from configuration.
///
/// An absent or unreachable counter store yields a disabled limiter; the
/// service always comes up.
async fn build_limiter(config: &RateLimitingConfig) -> RateLimiter {
    let window = Duration::from_secs(config.window_seconds);

    let Some(url) = config.redis_url.as_deref() else {
        warn!("No counter store configured, rate limiting disabled");
        return RateLimiter::disabled(config.max_requests_per_window, window);
    };

    let op_timeout = Duration::from_millis(config.store_timeout_ms);
    match RedisCounterStore::connect(url, op_timeout).await {
        Ok(store) => {
            info!(
                max_requests = config.max_requests_per_window,
                window_seconds = config.window_seconds,
                "Rate limiter initialized"
            );
            RateLimiter::new(Arc::new(store), config.max_requests_per_window, window)
        }
        Err(e) => {
            warn!(error = %e, "Counter store unreachable, rate limiting disabled");
            RateLimiter::disabled(config.max_requests_per_window, window)
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
