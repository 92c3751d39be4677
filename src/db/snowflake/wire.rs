//! Request and response bodies of the Snowflake session REST protocol.

use crate::db::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response codes meaning the statement is still running and the result must
/// be fetched from `getResultUrl`.
const QUERY_IN_PROGRESS_CODES: [&str; 2] = ["333333", "333334"];

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub data: LoginData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoginData<'a> {
    pub account_name: &'a str,
    pub login_name: &'a str,
    pub password: &'a str,
    pub client_app_id: &'a str,
    pub client_app_version: &'a str,
}

/// Envelope wrapping every Snowflake response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub success: bool,
}

impl<T> Envelope<T> {
    /// Failure message, falling back to the response code.
    pub fn failure_message(&self) -> String {
        match (&self.message, &self.code) {
            (Some(message), Some(code)) => format!("{message} (code {code})"),
            (Some(message), None) => message.clone(),
            (None, Some(code)) => format!("request failed with code {code}"),
            (None, None) => "request failed without a message".to_string(),
        }
    }

    /// True while the statement is still executing server-side.
    pub fn is_in_progress(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| QUERY_IN_PROGRESS_CODES.contains(&code))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResponseData {
    pub token: Option<String>,
    pub server_version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub sql_text: &'a str,
    pub sequence_id: u64,
    pub async_exec: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<IndexMap<String, Binding>>,
}

/// A positional bind value. Snowflake expects every value as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: Option<String>,
}

impl From<&Value> for Binding {
    fn from(value: &Value) -> Self {
        let (kind, value) = match value {
            Value::Null => ("ANY", None),
            Value::Bool(b) => ("BOOLEAN", Some(b.to_string())),
            Value::Int(i) => ("FIXED", Some(i.to_string())),
            Value::Float(f) => ("REAL", Some(f.to_string())),
            Value::String(s) | Value::Timestamp(s) => ("TEXT", Some(s.clone())),
        };
        Binding { kind, value }
    }
}

/// Builds the `bindings` object keyed `"1"..="N"`, or `None` without params.
pub fn bindings(params: &[Value]) -> Option<IndexMap<String, Binding>> {
    if params.is_empty() {
        return None;
    }
    Some(
        params
            .iter()
            .enumerate()
            .map(|(i, value)| ((i + 1).to_string(), Binding::from(value)))
            .collect(),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResponseData {
    pub rowtype: Vec<RowType>,
    pub rowset: Option<Vec<Vec<Option<String>>>>,
    pub rowset_base64: Option<String>,
    pub chunks: Vec<ChunkInfo>,
    pub chunk_headers: Option<HashMap<String, String>>,
    pub qrmk: Option<String>,
    pub query_id: Option<String>,
    pub get_result_url: Option<String>,
}

/// Column description from the result schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub scale: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub url: String,
    #[serde(default)]
    pub row_count: usize,
}
