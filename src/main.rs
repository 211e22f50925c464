use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskmanager_plv::auth::GoTrueClient;
use taskmanager_plv::config::AppConfig;
use taskmanager_plv::database::PostgrestClient;
use taskmanager_plv::{app, AppState};

#[derive(Parser)]
#[command(name = "taskmanager-plv")]
#[command(about = "Role-based access gateway and dashboards for PLV order management")]
#[command(version)]
struct Args {
    /// Address to bind (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides SERVER_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    tracing::info!("Starting taskmanager-plv in {:?} mode", config.environment);

    let store = PostgrestClient::new(&config.backend).context("failed to build data store client")?;
    let identity = GoTrueClient::new(&config.backend).context("failed to build auth client")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, Arc::new(store), Arc::new(identity));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
