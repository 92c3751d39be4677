//! Mock warehouse for testing.
//!
//! Provides an in-memory warehouse whose answers are scripted per SQL
//! fragment, plus a probe that counts opened and closed sessions.

use super::{ColumnInfo, QueryResult, Session, Value, Warehouse};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Version string reported by the mock for `CURRENT_VERSION()`.
pub const MOCK_VERSION: &str = "8.40.1-mock";

type Responder = Arc<dyn Fn(&[Value]) -> Result<QueryResult> + Send + Sync>;

#[derive(Clone)]
struct Rule {
    pattern: String,
    responder: Responder,
}

/// Session accounting shared between a [`MockWarehouse`] and its sessions.
#[derive(Debug, Default)]
pub struct SessionProbe {
    connect_attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl SessionProbe {
    /// Number of times `connect` was called, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions successfully opened.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened() - self.closed.load(Ordering::SeqCst)
    }

    /// Every statement executed so far with its bind parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// A mock warehouse that returns predefined results.
pub struct MockWarehouse {
    rules: Arc<Vec<Rule>>,
    connect_error: Option<String>,
    probe: Arc<SessionProbe>,
}

impl MockWarehouse {
    /// Creates a mock that only knows `SELECT CURRENT_VERSION()`.
    pub fn new() -> Self {
        let version = Rule {
            pattern: "CURRENT_VERSION()".to_string(),
            responder: Arc::new(|_| {
                Ok(QueryResult::with_data(
                    vec![ColumnInfo::new("CURRENT_VERSION()", "text")],
                    vec![vec![Value::from(MOCK_VERSION)]],
                ))
            }),
        };
        Self {
            rules: Arc::new(vec![version]),
            connect_error: None,
            probe: Arc::new(SessionProbe::default()),
        }
    }

    /// Creates a mock with a small `KNA1` table, used by `--mock-db`.
    pub fn demo() -> Self {
        const CEDULAS: [&str; 3] = ["1020304050", "79865432", "52123456"];

        Self::new()
            .with_result(
                "SELECT 1 AS X",
                QueryResult::with_data(
                    vec![ColumnInfo::new("X", "fixed")],
                    vec![vec![Value::Int(1)]],
                ),
            )
            .with_responder("FROM KNA1", |params| {
                let wanted = params.first().map(Value::to_display_string);
                let rows = CEDULAS
                    .iter()
                    .filter(|c| wanted.as_deref() == Some(**c))
                    .map(|c| vec![Value::from(*c)])
                    .collect();
                Ok(QueryResult::with_data(
                    vec![ColumnInfo::new("CEDULA", "text")],
                    rows,
                ))
            })
    }

    /// Answers any SQL containing `pattern` (case-insensitive) with `result`.
    ///
    /// Rules added later take precedence over earlier ones.
    pub fn with_result(self, pattern: &str, result: QueryResult) -> Self {
        self.with_responder(pattern, move |_| Ok(result.clone()))
    }

    /// Answers any SQL containing `pattern` by calling `f` with the bind params.
    pub fn with_responder<F>(mut self, pattern: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<QueryResult> + Send + Sync + 'static,
    {
        let mut rules = self.rules.as_ref().clone();
        rules.insert(
            0,
            Rule {
                pattern: pattern.to_uppercase(),
                responder: Arc::new(f),
            },
        );
        self.rules = Arc::new(rules);
        self
    }

    /// Fails any SQL containing `pattern` with a query error.
    pub fn with_query_error(self, pattern: &str, message: &str) -> Self {
        let message = message.to_string();
        self.with_responder(pattern, move |_| Err(GatewayError::query(message.clone())))
    }

    /// Makes every `connect` call fail with the given message.
    pub fn with_connect_error(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    /// Returns the shared session probe.
    pub fn probe(&self) -> Arc<SessionProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        self.probe.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.connect_error {
            return Err(GatewayError::connection(message.clone()));
        }

        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            rules: Arc::clone(&self.rules),
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// Session handed out by [`MockWarehouse`]. Only `close` releases it; dropping
/// it unclosed leaves the probe's open count raised.
struct MockSession {
    rules: Arc<Vec<Rule>>,
    probe: Arc<SessionProbe>,
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        if let Ok(mut executed) = self.probe.executed.lock() {
            executed.push((sql.to_string(), params.to_vec()));
        }

        let sql_upper = sql.to_uppercase();
        let rule = self
            .rules
            .iter()
            .find(|rule| sql_upper.contains(&rule.pattern))
            .ok_or_else(|| {
                GatewayError::query(format!(
                    "SQL compilation error: no mock result for '{}'",
                    sql.trim()
                ))
            })?;

        let result = (rule.responder)(params)?;
        Ok(result.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
