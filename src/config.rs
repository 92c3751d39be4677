//! Configuration management for the gateway.
//!
//! Handles loading configuration from TOML files and environment variables.
//! The resolved [`WarehouseConfig`] is built once at startup and never
//! mutated afterwards.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default bind host: all interfaces.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default login and network timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Main configuration structure, as read from the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Warehouse connection settings.
    #[serde(default)]
    pub warehouse: WarehouseSettings,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Warehouse connection settings before validation. Every field is optional so
/// the file, the environment and the CLI can each contribute.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct WarehouseSettings {
    /// Account identifier, e.g. `HG45590.us-west-2`.
    pub account: Option<String>,
    pub user: Option<String>,
    /// Password (prefer `SNOWFLAKE_PASSWORD` over storing it in the file).
    pub password: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    /// Overrides `https://<account>.snowflakecomputing.com`.
    pub host: Option<String>,
    pub login_timeout_secs: Option<u64>,
    pub network_timeout_secs: Option<u64>,
    /// Disables TLS certificate validation. Off unless set explicitly.
    pub insecure_mode: Option<bool>,
}

impl fmt::Debug for WarehouseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseSettings")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("host", &self.host)
            .field("login_timeout_secs", &self.login_timeout_secs)
            .field("network_timeout_secs", &self.network_timeout_secs)
            .field("insecure_mode", &self.insecure_mode)
            .finish()
    }
}

impl WarehouseSettings {
    /// Merges another settings value into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &WarehouseSettings) {
        fn take<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }

        take(&mut self.account, &other.account);
        take(&mut self.user, &other.user);
        take(&mut self.password, &other.password);
        take(&mut self.warehouse, &other.warehouse);
        take(&mut self.database, &other.database);
        take(&mut self.schema, &other.schema);
        take(&mut self.role, &other.role);
        take(&mut self.host, &other.host);
        take(&mut self.login_timeout_secs, &other.login_timeout_secs);
        take(&mut self.network_timeout_secs, &other.network_timeout_secs);
        take(&mut self.insecure_mode, &other.insecure_mode);
    }

    /// Applies `SNOWFLAKE_*` environment variables as defaults.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    fn apply_defaults_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |target: &mut Option<String>, key: &str| {
            if target.is_none() {
                *target = lookup(key);
            }
        };

        fill(&mut self.account, "SNOWFLAKE_ACCOUNT");
        fill(&mut self.user, "SNOWFLAKE_USER");
        fill(&mut self.password, "SNOWFLAKE_PASSWORD");
        fill(&mut self.warehouse, "SNOWFLAKE_WAREHOUSE");
        fill(&mut self.database, "SNOWFLAKE_DATABASE");
        fill(&mut self.schema, "SNOWFLAKE_SCHEMA");
        fill(&mut self.role, "SNOWFLAKE_ROLE");
        fill(&mut self.host, "SNOWFLAKE_HOST");

        if self.insecure_mode.is_none() {
            self.insecure_mode = lookup("SNOWFLAKE_INSECURE_MODE").and_then(|v| parse_flag(&v));
        }
    }

    /// Validates the settings into an immutable [`WarehouseConfig`].
    pub fn resolve(&self) -> Result<WarehouseConfig> {
        fn required(value: &Option<String>, name: &str) -> Result<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or_else(|| {
                    GatewayError::config(format!(
                        "missing field '{name}' in [warehouse] (or SNOWFLAKE_{} environment variable)",
                        name.to_uppercase()
                    ))
                })
        }

        let config = WarehouseConfig {
            account: required(&self.account, "account")?,
            user: required(&self.user, "user")?,
            password: required(&self.password, "password")?,
            warehouse: required(&self.warehouse, "warehouse")?,
            database: required(&self.database, "database")?,
            schema: required(&self.schema, "schema")?,
            role: self.role.clone(),
            host: self.host.clone(),
            login_timeout_secs: self.login_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            network_timeout_secs: self.network_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            insecure_mode: self.insecure_mode.unwrap_or(false),
        };

        // fail at startup rather than on the first request
        config.base_url()?;
        Ok(config)
    }
}

/// Validated, immutable warehouse connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    pub host: Option<String>,
    pub login_timeout_secs: u64,
    pub network_timeout_secs: u64,
    pub insecure_mode: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            user: String::new(),
            password: String::new(),
            warehouse: String::new(),
            database: String::new(),
            schema: String::new(),
            role: None,
            host: None,
            login_timeout_secs: DEFAULT_TIMEOUT_SECS,
            network_timeout_secs: DEFAULT_TIMEOUT_SECS,
            insecure_mode: false,
        }
    }
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("host", &self.host)
            .field("login_timeout_secs", &self.login_timeout_secs)
            .field("network_timeout_secs", &self.network_timeout_secs)
            .field("insecure_mode", &self.insecure_mode)
            .finish()
    }
}

impl WarehouseConfig {
    /// Root URL of the account's REST endpoint, always ending in `/`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = match &self.host {
            Some(host) if host.contains("://") => host.clone(),
            Some(host) => format!("https://{host}"),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| GatewayError::config(format!("Invalid warehouse URL '{raw}': {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Account name sent at login: the locator before any region suffix.
    pub fn account_name(&self) -> String {
        self.account
            .split('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        format!(
            "{}@{} ({}.{}, warehouse {})",
            self.user, self.account, self.database, self.schema, self.warehouse
        )
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Bind host, defaults to all interfaces.
    pub host: Option<String>,

    /// Listen port, defaults to 5001.
    pub port: Option<u16>,

    /// Cross-origin policy.
    #[serde(default)]
    pub cors: CorsSettings,
}

impl ServerConfig {
    /// Applies `GATEWAY_HOST` / `GATEWAY_PORT` as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.host.is_none() {
            self.host = std::env::var("GATEWAY_HOST").ok();
        }
        if self.port.is_none() {
            if let Ok(port_str) = std::env::var("GATEWAY_PORT") {
                if let Ok(port) = port_str.parse() {
                    self.port = Some(port);
                }
            }
        }
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or(DEFAULT_HOST),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

/// Cross-origin resource sharing settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsSettings {
    /// Allowed origins. Empty or containing `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsSettings {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warehouse-gateway")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GatewayError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
