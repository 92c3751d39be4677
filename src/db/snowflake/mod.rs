//! Snowflake warehouse client implementation.
//!
//! Provides `SnowflakeWarehouse`, which implements the `Warehouse` trait on top
//! of Snowflake's session REST protocol using reqwest. Each session logs in
//! with user and password and logs out again on close.

mod convert;
mod wire;

use crate::config::WarehouseConfig;
use crate::db::{ColumnInfo, QueryResult, Row, Session, Value, Warehouse};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use wire::{Envelope, LoginResponseData, QueryResponseData};

const CLIENT_APP_ID: &str = "warehouse-gateway";
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Accept type Snowflake expects on query requests.
const SNOWFLAKE_ACCEPT: &str = "application/snowflake";

/// Delay between polls while a long-running statement is still executing.
const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Snowflake warehouse connector.
///
/// Holds the immutable connection parameters and a shared HTTP client; every
/// [`Warehouse::connect`] call performs a fresh login.
#[derive(Debug, Clone)]
pub struct SnowflakeWarehouse {
    config: Arc<WarehouseConfig>,
    http: Client,
    base_url: Url,
}

impl SnowflakeWarehouse {
    /// Builds the connector. No network traffic happens here.
    pub fn new(config: Arc<WarehouseConfig>) -> Result<Self> {
        if config.insecure_mode {
            warn!(
                "TLS certificate validation is DISABLED for {} (insecure_mode = true)",
                config.display_string()
            );
        }

        let http = Client::builder()
            .connect_timeout(config.login_timeout())
            .timeout(config.network_timeout())
            .danger_accept_invalid_certs(config.insecure_mode)
            .gzip(true)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {e}")))?;
        let base_url = config.base_url()?;

        Ok(Self {
            config,
            http,
            base_url,
        })
    }

    fn login_url(&self) -> Result<Url> {
        let mut url = join(&self.base_url, "session/v1/login-request")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("warehouse", &self.config.warehouse);
            query.append_pair("databaseName", &self.config.database);
            query.append_pair("schemaName", &self.config.schema);
            if let Some(role) = &self.config.role {
                query.append_pair("roleName", role);
            }
        }
        Ok(url)
    }

    async fn login(&self) -> Result<String> {
        let account_name = self.config.account_name();
        let body = wire::LoginRequest {
            data: wire::LoginData {
                account_name: &account_name,
                login_name: &self.config.user,
                password: &self.config.password,
                client_app_id: CLIENT_APP_ID,
                client_app_version: CLIENT_APP_VERSION,
            },
        };

        let response = self
            .http
            .post(self.login_url()?)
            .timeout(self.config.login_timeout())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::connection(format!("Login request failed: {e}")))?;

        let status = response.status();
        let envelope: Envelope<LoginResponseData> = response.json().await.map_err(|e| {
            GatewayError::connection(format!("Unexpected login response (HTTP {status}): {e}"))
        })?;

        if !envelope.success {
            return Err(GatewayError::connection(envelope.failure_message()));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::connection("Login response carried no session data"))?;
        if let Some(version) = &data.server_version {
            debug!("Snowflake server version {version}");
        }
        data.token
            .ok_or_else(|| GatewayError::connection("Login response carried no session token"))
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        info!("Connecting to Snowflake: {}", self.config.display_string());
        if self.config.insecure_mode {
            warn!("Opening session with TLS certificate validation disabled");
        }

        let token = self.login().await?;

        info!("Snowflake session established");
        Ok(Box::new(SnowflakeSession {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            sequence_id: 0,
            network_timeout: self.config.network_timeout(),
        }))
    }
}

/// One logged-in Snowflake session.
///
/// Dropping a session that was never closed schedules a logout on the current
/// tokio runtime so an aborted request does not leak the server-side session.
pub struct SnowflakeSession {
    http: Client,
    base_url: Url,
    token: Option<String>,
    sequence_id: u64,
    network_timeout: Duration,
}

impl SnowflakeSession {
    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| GatewayError::internal("Snowflake session is already closed"))
    }

    async fn post_query(&self, sql: &str, params: &[Value]) -> Result<Envelope<QueryResponseData>> {
        let mut url = join(&self.base_url, "queries/v1/query-request")?;
        url.query_pairs_mut()
            .append_pair("requestId", &Uuid::new_v4().to_string());

        let body = wire::QueryRequest {
            sql_text: sql,
            sequence_id: self.sequence_id,
            async_exec: false,
            bindings: wire::bindings(params),
        };

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, auth_header(self.token()?))
            .header(ACCEPT, SNOWFLAKE_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::query(format!("Query request failed: {e}")))?;

        decode_query_response(response).await
    }

    async fn get_result(&self, path: &str) -> Result<Envelope<QueryResponseData>> {
        let response = self
            .http
            .get(join(&self.base_url, path)?)
            .header(AUTHORIZATION, auth_header(self.token()?))
            .header(ACCEPT, SNOWFLAKE_ACCEPT)
            .send()
            .await
            .map_err(|e| GatewayError::query(format!("Result request failed: {e}")))?;

        decode_query_response(response).await
    }

    /// Waits for a statement Snowflake reported as still running.
    async fn await_completion(
        &self,
        mut envelope: Envelope<QueryResponseData>,
    ) -> Result<Envelope<QueryResponseData>> {
        let deadline = Instant::now() + self.network_timeout;

        while envelope.is_in_progress() {
            let path = envelope
                .data
                .as_ref()
                .and_then(|data| data.get_result_url.clone())
                .ok_or_else(|| {
                    GatewayError::query("Statement still running but no result URL was provided")
                })?;
            if Instant::now() >= deadline {
                return Err(GatewayError::query(format!(
                    "Statement did not finish within {:?}",
                    self.network_timeout
                )));
            }

            debug!("Statement still running, polling {path}");
            tokio::time::sleep(RESULT_POLL_INTERVAL).await;
            envelope = self.get_result(&path).await?;
        }

        Ok(envelope)
    }

    /// Downloads the remaining result partitions in order.
    async fn fetch_chunks(&self, data: &QueryResponseData) -> Result<Vec<Vec<Option<String>>>> {
        if data.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let headers = chunk_headers(data)?;
        let mut rows = Vec::with_capacity(data.chunks.iter().map(|c| c.row_count).sum());

        for (index, chunk) in data.chunks.iter().enumerate() {
            debug!("Downloading result chunk {} of {}", index + 1, data.chunks.len());
            let body = self
                .http
                .get(&chunk.url)
                .headers(headers.clone())
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| GatewayError::query(format!("Chunk download failed: {e}")))?
                .text()
                .await
                .map_err(|e| GatewayError::query(format!("Chunk download failed: {e}")))?;

            // chunk bodies are comma-separated row arrays without the enclosing brackets
            let chunk_rows: Vec<Vec<Option<String>>> =
                serde_json::from_str(&format!("[{body}]")).map_err(|e| {
                    GatewayError::query(format!("Malformed result chunk {}: {e}", index + 1))
                })?;
            rows.extend(chunk_rows);
        }

        Ok(rows)
    }
}

#[async_trait]
impl Session for SnowflakeSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.sequence_id += 1;
        let start = Instant::now();

        let envelope = self.post_query(sql, params).await?;
        let envelope = self.await_completion(envelope).await?;
        if !envelope.success {
            return Err(GatewayError::query(envelope.failure_message()));
        }

        let mut data = envelope
            .data
            .ok_or_else(|| GatewayError::query("Query response carried no result data"))?;
        if let Some(query_id) = &data.query_id {
            debug!("Snowflake query id {query_id}");
        }

        let mut raw_rows = match data.rowset.take() {
            Some(rowset) => rowset,
            None if data.rowset_base64.is_some() => {
                return Err(GatewayError::query(
                    "Snowflake returned an Arrow result, only the JSON result format is supported",
                ))
            }
            None => Vec::new(),
        };
        raw_rows.extend(self.fetch_chunks(&data).await?);

        let columns: Vec<ColumnInfo> = data
            .rowtype
            .iter()
            .map(|col| ColumnInfo::new(&col.name, &col.kind))
            .collect();
        let rows: Vec<Row> = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .map(|(i, cell)| convert::convert_cell(cell, data.rowtype.get(i)))
                    .collect()
            })
            .collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        match self.token.take() {
            Some(token) => {
                let result = logout(&self.http, &self.base_url, &token).await;
                debug!("Snowflake session closed");
                result
            }
            None => Ok(()),
        }
    }
}

impl Drop for SnowflakeSession {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        warn!("Snowflake session dropped without close, scheduling logout");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let http = self.http.clone();
                let base_url = self.base_url.clone();
                handle.spawn(async move {
                    if let Err(e) = logout(&http, &base_url, &token).await {
                        warn!("Deferred Snowflake logout failed: {e}");
                    }
                });
            }
            Err(_) => warn!("No runtime available, Snowflake session left to expire"),
        }
    }
}

async fn logout(http: &Client, base_url: &Url, token: &str) -> Result<()> {
    let mut url = join(base_url, "session")?;
    url.query_pairs_mut().append_pair("delete", "true");

    let response = http
        .post(url)
        .header(AUTHORIZATION, auth_header(token))
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| GatewayError::connection(format!("Logout request failed: {e}")))?;

    let envelope: Envelope<serde_json::Value> = response
        .json()
        .await
        .map_err(|e| GatewayError::connection(format!("Unexpected logout response: {e}")))?;
    if envelope.success {
        Ok(())
    } else {
        Err(GatewayError::connection(format!(
            "Logout failed: {}",
            envelope.failure_message()
        )))
    }
}

async fn decode_query_response(response: reqwest::Response) -> Result<Envelope<QueryResponseData>> {
    let status = response.status();
    response.json().await.map_err(|e| {
        GatewayError::query(format!("Unexpected query response (HTTP {status}): {e}"))
    })
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| GatewayError::internal(format!("Invalid Snowflake URL path '{path}': {e}")))
}

fn auth_header(token: &str) -> String {
    format!("Snowflake Token=\"{token}\"")
}

/// Headers required to download result chunks from cloud storage.
fn chunk_headers(data: &QueryResponseData) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(chunk_headers) = &data.chunk_headers {
        for (name, value) in chunk_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| GatewayError::query(format!("Invalid chunk header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| GatewayError::query(format!("Invalid chunk header value: {e}")))?;
            headers.insert(name, value);
        }
    } else if let Some(qrmk) = &data.qrmk {
        let key = HeaderValue::from_str(qrmk)
            .map_err(|e| GatewayError::query(format!("Invalid result encryption key: {e}")))?;
        headers.insert(
            "x-amz-server-side-encryption-customer-algorithm",
            HeaderValue::from_static("AES256"),
        );
        headers.insert("x-amz-server-side-encryption-customer-key", key);
    }

    Ok(headers)
}
