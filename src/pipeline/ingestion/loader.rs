use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexSet;
use polars::prelude::{DataType, Field, JsonFormat, JsonReader, Schema, SerReader};
use reqwest::Url;
use tracing::{debug, error, info};

use crate::app::ports::HttpClientPort;
use crate::constants::SOCRATA_LIMIT_PARAM;
use crate::domain::Table;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;

/// Fetches a remote JSON dataset (an array of flat objects) into a [`Table`].
///
/// One blocking GET per load, no retries.
pub struct RemoteSourceLoader {
    http: Box<dyn HttpClientPort>,
    row_limit: Option<u64>,
}

impl RemoteSourceLoader {
    pub fn new(http: Box<dyn HttpClientPort>) -> Self {
        Self {
            http,
            row_limit: None,
        }
    }

    /// Ask Socrata-style endpoints for up to `limit` rows instead of their default page.
    pub fn with_row_limit(mut self, limit: Option<u64>) -> Self {
        self.row_limit = limit;
        self
    }

    pub fn load(&self, endpoint: &str) -> Result<Table> {
        let url = self.request_url(endpoint)?;
        let started = Instant::now();
        let response = self.http.get(&url).map_err(|e| {
            metrics::source::request_error();
            PipelineError::Transport(e)
        })?;
        metrics::source::request_duration(started.elapsed().as_secs_f64());

        if !response.is_success() {
            metrics::source::request_error();
            return Err(PipelineError::Status {
                status: response.status,
                url,
            });
        }
        debug!(
            content_type = %response.content_type,
            bytes = response.content_length,
            "Response received"
        );

        let table = parse_payload(&response.bytes).inspect_err(|_| {
            metrics::source::request_error();
        })?;
        metrics::source::request_success();
        metrics::source::rows_loaded(table.n_rows());
        Ok(table)
    }

    /// Best-effort variant of [`load`](Self::load): failures are logged and yield `None`.
    pub fn try_load(&self, endpoint: &str) -> Option<Table> {
        match self.load(endpoint) {
            Ok(table) => {
                info!(
                    endpoint,
                    rows = table.n_rows(),
                    columns = table.n_columns(),
                    "Data loaded successfully"
                );
                Some(table)
            }
            Err(e) => {
                error!(endpoint, "Error loading data: {}", e);
                None
            }
        }
    }

    fn request_url(&self, endpoint: &str) -> Result<String> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| PipelineError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if let Some(limit) = self.row_limit {
            let already_set = url.query_pairs().any(|(k, _)| k == SOCRATA_LIMIT_PARAM);
            if !already_set {
                url.query_pairs_mut()
                    .append_pair(SOCRATA_LIMIT_PARAM, &limit.to_string());
            }
        }
        Ok(url.to_string())
    }
}

/// Decode a JSON array of objects into a table, one row per element.
///
/// The column set is the union of keys in first-seen order. Scalars are read
/// as text and numeric-looking columns are coerced afterwards, so quoted
/// numbers end up numeric like plain ones.
pub fn parse_payload(body: &[u8]) -> Result<Table> {
    let payload: serde_json::Value = serde_json::from_slice(body)?;
    let serde_json::Value::Array(items) = payload else {
        return Err(PipelineError::UnexpectedPayload(
            "expected a JSON array of objects".to_string(),
        ));
    };

    let mut columns: IndexSet<String> = IndexSet::new();
    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = item else {
            return Err(PipelineError::UnexpectedPayload(format!(
                "element {} is not an object",
                i
            )));
        };
        let record: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|(key, value)| {
                columns.insert(key.clone());
                (key, text_cell(value))
            })
            .collect();
        records.push(serde_json::Value::Object(record));
    }
    if records.is_empty() || columns.is_empty() {
        return Ok(Table::default());
    }

    let schema: Schema = columns
        .iter()
        .map(|name| Field::new(name, DataType::String))
        .collect();
    let text = serde_json::to_vec(&records)?;
    let frame = JsonReader::new(Cursor::new(text))
        .with_json_format(JsonFormat::Json)
        .with_schema(Arc::new(schema))
        .finish()?;
    Table::from_frame(frame)
}

fn text_cell(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Null | serde_json::Value::String(_) => value,
        serde_json::Value::Number(n) => serde_json::Value::String(n.to_string()),
        serde_json::Value::Bool(b) => serde_json::Value::String(b.to_string()),
        nested => serde_json::Value::String(nested.to_string()),
    }
}
