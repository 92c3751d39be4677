//! The query gateway.
//!
//! Runs a single statement per call against a freshly opened warehouse
//! session and shapes the tabular result into keyed records. The session is
//! closed on every exit path before the outcome is returned.

use crate::db::{QueryResult, Record, Session, Value, Warehouse};
use crate::error::{GatewayError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Statement used by the health check.
pub const VERSION_QUERY: &str = "SELECT CURRENT_VERSION()";

/// Executes queries against a [`Warehouse`], one session per call.
#[derive(Clone)]
pub struct QueryGateway {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryGateway {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// Opens a new warehouse session. Not retried.
    pub async fn connect(&self) -> Result<Box<dyn Session>> {
        self.warehouse.connect().await.map_err(|e| {
            error!("Error connecting to warehouse: {e}");
            match e {
                GatewayError::Connection(_) => e,
                other => GatewayError::connection(other.message()),
            }
        })
    }

    /// Runs `query` with optional positional `params` and returns one record
    /// per row, in the order the warehouse returned them.
    pub async fn execute_query(&self, query: &str, params: &[Value]) -> Result<Vec<Record>> {
        let result = self.run(query, params).await?;
        shape_records(result)
    }

    /// Returns the warehouse version string.
    pub async fn server_version(&self) -> Result<String> {
        let result = self.run(VERSION_QUERY, &[]).await?;
        result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|value| !value.is_null())
            .map(|value| value.to_display_string())
            .ok_or_else(|| GatewayError::shaping("CURRENT_VERSION() returned no value"))
    }

    /// Scoped execution: connect, execute, and always close.
    async fn run(&self, query: &str, params: &[Value]) -> Result<QueryResult> {
        let mut session = self.connect().await?;

        info!("Executing query: {}", query.trim());
        debug!("Bind parameters: {params:?}");

        let outcome = session.execute(query, params).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close warehouse session: {e}");
        } else {
            debug!("Warehouse session closed");
        }

        if let Ok(result) = &outcome {
            info!(
                "Query returned {} rows in {:?}",
                result.row_count, result.execution_time
            );
        }

        outcome.map_err(|e| {
            error!("Error executing query: {e}");
            match e {
                GatewayError::Connection(_) | GatewayError::Query(_) | GatewayError::Shaping(_) => e,
                other => GatewayError::query(other.message()),
            }
        })
    }
}

/// Zips column names with each row's values positionally.
pub fn shape_records(result: QueryResult) -> Result<Vec<Record>> {
    let names: Vec<String> = result.column_names().map(String::from).collect();

    result
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != names.len() {
                return Err(GatewayError::shaping(format!(
                    "row {index} has {} values for {} columns",
                    row.len(),
                    names.len()
                )));
            }
            Ok(names.iter().cloned().zip(row).collect())
        })
        .collect()
}
