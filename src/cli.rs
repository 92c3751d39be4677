//! Command-line argument parsing for the gateway.

use crate::config::{Config, ServerConfig, WarehouseSettings};
use clap::Parser;
use std::path::PathBuf;

/// HTTP gateway that runs JSON-described queries against a Snowflake warehouse.
#[derive(Parser, Debug)]
#[command(name = "warehouse-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind (default 0.0.0.0)
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (default 5001)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Snowflake account identifier (e.g., HG45590.us-west-2)
    #[arg(long, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Snowflake user
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Snowflake warehouse
    #[arg(short = 'w', long, value_name = "WAREHOUSE")]
    pub warehouse: Option<String>,

    /// Snowflake database
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub database: Option<String>,

    /// Snowflake schema
    #[arg(short = 's', long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Snowflake role
    #[arg(long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Disable TLS certificate validation towards the warehouse. Insecure.
    #[arg(long)]
    pub insecure: bool,

    /// Serve from an in-memory mock warehouse instead of Snowflake
    #[arg(long)]
    pub mock_db: bool,

    /// Log filter used when RUST_LOG is unset (e.g., "debug", "warehouse_gateway=trace")
    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Warehouse settings given on the command line. The password is never
    /// accepted here; use `SNOWFLAKE_PASSWORD` or the config file.
    pub fn to_warehouse_settings(&self) -> WarehouseSettings {
        WarehouseSettings {
            account: self.account.clone(),
            user: self.user.clone(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            role: self.role.clone(),
            insecure_mode: self.insecure.then_some(true),
            ..Default::default()
        }
    }

    /// Applies `--host` / `--port` on top of the server config.
    pub fn apply_server_overrides(&self, server: &mut ServerConfig) {
        if self.host.is_some() {
            server.host.clone_from(&self.host);
        }
        if self.port.is_some() {
            server.port = self.port;
        }
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
