//! lifelog HTTP API server
//!
//! Serves the activity history pipeline over /api/v1:
//! - read models: activities, tags, insights, system health
//! - commands: processing jobs, tag cleanup, provider imports

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lifelog_api::{app, AppState};
use lifelog_runtime::{Config, ServiceContext};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lifelog-api")]
#[command(about = "HTTP API for the lifelog activity history")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8000, env = "LIFELOG_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", env = "LIFELOG_BIND")]
    bind: String,

    /// Path to the configuration file (defaults to <data_dir>/config.toml)
    #[arg(long, env = "LIFELOG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lifelog={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing or unmigratable database is fatal here; degraded
    // providers are not
    let context = ServiceContext::initialize(config)?;
    let state = Arc::new(AppState::new(context));
    let app = app::build_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    tracing::info!("starting lifelog-api on {}", addr);
    tracing::info!(
        "api prefix: {}, environment: {:?}",
        state.context.config.api_v1_prefix,
        state.context.config.environment
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lifelog-api shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
