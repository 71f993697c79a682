//! Hosted serverless `SQLite` store.
//!
//! Talks to a Cloudflare D1 database through its HTTP query endpoint:
//!
//! ```text
//! POST {base_url}/accounts/{account_id}/d1/database/{database_id}/query
//! Authorization: Bearer {api_token}
//! {"sql": "...", "params": [...]}
//! ```
//!
//! Every store operation is exactly one request carrying one statement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{record_params, schema, timestamp_param, RecordStore, SqlParam};
use crate::config::{Backend, HostedConfig};
use crate::error::{Error, Result};
use crate::record::{CalculatedRecord, ProductionRecord};

/// Request timeout for a single query.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Record store backed by a hosted D1 database.
pub struct HostedStore {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for HostedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedStore")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Body of a query request.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
    params: &'a [SqlParam],
}

/// Response envelope returned by the API.
#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<Vec<QueryResult>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Outcome of one statement.
#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    results: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    meta: QueryMeta,
}

#[derive(Debug, Default, Deserialize)]
struct QueryMeta {
    #[serde(default)]
    last_row_id: i64,
    #[serde(default)]
    changes: i64,
}

impl QueryEnvelope {
    /// Unwrap the first statement result, turning API failures into errors.
    fn into_result(self) -> Result<QueryResult> {
        if !self.success {
            let message = if self.errors.is_empty() {
                "query was not successful".to_string()
            } else {
                self.errors
                    .iter()
                    .map(|e| format!("{} (code {})", e.message, e.code))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(Error::hosted_query(message));
        }
        Ok(self
            .result
            .and_then(|results| results.into_iter().next())
            .unwrap_or_default())
    }
}

impl QueryResult {
    /// Decode result rows into records.
    ///
    /// `NULL` columns are dropped first so they fall back to zero.
    fn into_records(self) -> Result<Vec<ProductionRecord>> {
        self.results
            .into_iter()
            .map(|mut row| {
                row.retain(|_, value| !value.is_null());
                serde_json::from_value(serde_json::Value::Object(row)).map_err(Error::from)
            })
            .collect()
    }
}

impl HostedStore {
    /// Connect to the hosted database and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete, the HTTP client
    /// cannot be built, or schema creation fails.
    pub async fn connect(config: &HostedConfig) -> Result<Self> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::config_validation("storage.hosted.api_token is required"))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let endpoint = format!(
            "{}/accounts/{}/d1/database/{}/query",
            config.base_url.trim_end_matches('/'),
            config.account_id,
            config.database_id
        );

        let store = Self {
            client,
            endpoint,
            api_token,
            closed: AtomicBool::new(false),
        };

        for statement in schema::SCHEMA_STATEMENTS {
            store.query(statement, &[]).await?;
        }

        info!("Connected to hosted database {}", config.database_id);
        Ok(store)
    }

    /// Get the query endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one statement.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreClosed);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&QueryRequest { sql, params })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice::<QueryEnvelope>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(Error::hosted_query(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RecordStore for HostedStore {
    fn backend(&self) -> Backend {
        Backend::Hosted
    }

    async fn list(&self) -> Result<Vec<ProductionRecord>> {
        self.query(schema::SELECT_ALL, &[]).await?.into_records()
    }

    async fn get(&self, id: i64) -> Result<Option<ProductionRecord>> {
        let records = self
            .query(schema::SELECT_BY_ID, &[SqlParam::Integer(id)])
            .await?
            .into_records()?;
        Ok(records.into_iter().next())
    }

    async fn create(&self, record: &CalculatedRecord) -> Result<i64> {
        let now = timestamp_param(Utc::now());
        let mut params = record_params(record);
        params.push(now.clone());
        params.push(now);

        let result = self.query(&schema::insert_sql(), &params).await?;
        let id = result.meta.last_row_id;
        debug!("Inserted record {} for {}", id, record.inputs.date);
        Ok(id)
    }

    async fn update(&self, id: i64, record: &CalculatedRecord) -> Result<()> {
        let mut params = record_params(record);
        params.push(timestamp_param(Utc::now()));
        params.push(SqlParam::Integer(id));

        let result = self.query(&schema::update_sql(), &params).await?;
        if result.meta.changes == 0 {
            debug!("Update of record {} matched no rows", id);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = self
            .query(schema::DELETE_BY_ID, &[SqlParam::Integer(id)])
            .await?;
        debug!("Deleted {} row(s) for record {}", result.meta.changes, id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Hosted database connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> QueryEnvelope {
        serde_json::from_str(json).expect("valid envelope")
    }

    #[test]
    fn test_envelope_success() {
        let result = envelope(
            r#"{
                "success": true,
                "errors": [],
                "messages": [],
                "result": [{
                    "success": true,
                    "results": [],
                    "meta": {"last_row_id": 12, "changes": 1, "duration": 0.2}
                }]
            }"#,
        )
        .into_result()
        .unwrap();

        assert_eq!(result.meta.last_row_id, 12);
        assert_eq!(result.meta.changes, 1);
        assert!(result.results.is_empty());
    }

    #[test]
    fn test_envelope_failure_carries_messages() {
        let err = envelope(
            r#"{
                "success": false,
                "errors": [{"code": 7500, "message": "UNIQUE constraint failed: daily_production_records.date"}],
                "result": null
            }"#,
        )
        .into_result()
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("UNIQUE constraint failed"));
        assert!(msg.contains("7500"));
    }

    #[test]
    fn test_envelope_failure_without_messages() {
        let err = envelope(r#"{"success": false}"#).into_result().unwrap_err();
        assert!(err.to_string().contains("not successful"));
    }

    #[test]
    fn test_rows_decode_into_records() {
        let result = envelope(
            r#"{
                "success": true,
                "result": [{
                    "results": [{
                        "id": 3,
                        "date": "2024-03-15",
                        "production": 10000,
                        "outdone": 9500,
                        "paper_quantity_kg": 250,
                        "paper_rate": 45.5,
                        "paper_cost": 11375,
                        "paper_cost_per_tube": 1.14,
                        "paste_cost": null,
                        "grand_total_cost_per_tube": 2.09,
                        "created_at": "2024-03-15T10:00:00.000Z",
                        "updated_at": "2024-03-15T10:00:00.000Z"
                    }]
                }]
            }"#,
        )
        .into_result()
        .unwrap();

        let records = result.into_records().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, 3);
        assert_eq!(record.inputs().paper_rate, 45.5);
        assert_eq!(record.costs().paper_cost, 11375.0);
        assert_eq!(record.costs().paste_cost, 0.0);
        assert_eq!(record.costs().grand_total_cost_per_tube, 2.09);
    }

    #[test]
    fn test_query_request_shape() {
        let params = [SqlParam::Integer(5)];
        let body = serde_json::to_value(QueryRequest {
            sql: schema::SELECT_BY_ID,
            params: &params,
        })
        .unwrap();
        assert_eq!(body["params"][0], 5);
        assert_eq!(body["sql"], schema::SELECT_BY_ID);
    }

    #[tokio::test]
    async fn test_connect_requires_token() {
        let config = HostedConfig {
            account_id: "acct".to_string(),
            database_id: "db".to_string(),
            ..HostedConfig::default()
        };
        let err = HostedStore::connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("api_token"));
    }
}
