//! Warehouse abstraction layer for the gateway.
//!
//! Provides a trait-based interface for opening sessions and running queries,
//! allowing the Snowflake backend and the in-memory mock to be used
//! interchangeably.

mod mock;
mod snowflake;
mod types;

pub use mock::{MockWarehouse, SessionProbe, MOCK_VERSION};
pub use snowflake::SnowflakeWarehouse;
pub use types::{ColumnInfo, QueryResult, Record, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Opens sessions against a warehouse.
///
/// Implementations hold only immutable connection parameters; every call to
/// [`Warehouse::connect`] yields a fresh, unshared session.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Establishes a new session. Failures are reported as connection errors.
    async fn connect(&self) -> Result<Box<dyn Session>>;
}

/// A single open warehouse session.
#[async_trait]
pub trait Session: Send {
    /// Executes a SQL statement, binding `params` positionally when non-empty,
    /// and returns the full result set.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> Result<()>;
}
