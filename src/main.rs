//! Warehouse gateway - a minimal HTTP gateway in front of a Snowflake warehouse.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};
use warehouse_gateway::cli::Cli;
use warehouse_gateway::config::{Config, WarehouseSettings};
use warehouse_gateway::db::{MockWarehouse, SnowflakeWarehouse, Warehouse};
use warehouse_gateway::gateway::QueryGateway;
use warehouse_gateway::logging;
use warehouse_gateway::routes::create_router;
use warehouse_gateway::state::ServerState;

#[tokio::main]
async fn main() {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    cli.apply_server_overrides(&mut config.server);
    config.server.apply_env_defaults();

    let warehouse: Arc<dyn Warehouse> = if cli.mock_db {
        warn!("Serving from the in-memory mock warehouse");
        Arc::new(MockWarehouse::demo())
    } else {
        let settings = resolve_warehouse_settings(&cli, &config);
        let warehouse_config = settings.resolve()?;
        info!("Warehouse: {}", warehouse_config.display_string());
        Arc::new(SnowflakeWarehouse::new(Arc::new(warehouse_config))?)
    };

    let state = ServerState::new(QueryGateway::new(warehouse));
    let router = create_router(state, &config.server.cors);

    let address = config.server.bind_address();
    let socket_addr = tokio::net::lookup_host(&address)
        .await
        .with_context(|| format!("Invalid bind address {address}"))?
        .next()
        .with_context(|| format!("Bind address {address} did not resolve"))?;

    info!("Endpoints: GET /health, POST /consultar-cedula, POST /query-custom");
    info!("Starting server on http://{socket_addr}");

    axum::Server::try_bind(&socket_addr)
        .with_context(|| format!("Failed to bind {socket_addr}"))?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves warehouse settings with precedence:
/// 1. CLI arguments (highest)
/// 2. Config file
/// 3. Environment variables
fn resolve_warehouse_settings(cli: &Cli, config: &Config) -> WarehouseSettings {
    let mut settings = config.warehouse.clone();
    settings.merge(&cli.to_warehouse_settings());
    settings.apply_env_defaults();
    settings
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
