//! Storage layer for tubecost.
//!
//! Records live in a single `SQLite` table reached through one of two
//! engines: a local file ([`EmbeddedStore`]) or a hosted serverless database
//! over HTTP ([`HostedStore`]). Callers only see the [`RecordStore`] trait;
//! [`open`] picks the engine from configuration once at startup.

pub mod embedded;
pub mod hosted;
pub mod migrations;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::record::{CalculatedRecord, ProductionRecord};

pub use embedded::EmbeddedStore;
pub use hosted::HostedStore;

/// Persistence for production records.
///
/// Every write carries a full [`CalculatedRecord`]; stores never merge with
/// previously stored values.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Short name of the engine, for logs and health output.
    fn backend(&self) -> Backend;

    /// All records, newest day first.
    async fn list(&self) -> Result<Vec<ProductionRecord>>;

    /// One record by id, or `None` if there is no such record.
    async fn get(&self, id: i64) -> Result<Option<ProductionRecord>>;

    /// Insert a record and return its assigned id.
    async fn create(&self, record: &CalculatedRecord) -> Result<i64>;

    /// Overwrite every field of the record with the given id.
    ///
    /// Succeeds without effect when the id does not exist.
    async fn update(&self, id: i64, record: &CalculatedRecord) -> Result<()>;

    /// Remove the record with the given id if present.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Release the underlying handle. Later calls fail with
    /// [`crate::Error::StoreClosed`].
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Open the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or its schema prepared.
pub async fn open(config: &Config) -> Result<Box<dyn RecordStore>> {
    let store: Box<dyn RecordStore> = match config.storage.backend {
        Backend::Embedded => Box::new(EmbeddedStore::open(config.database_path())?),
        Backend::Hosted => Box::new(HostedStore::connect(&config.storage.hosted).await?),
    };
    info!("Record store ready ({})", store.backend());
    Ok(store)
}

/// A value bound to a statement parameter.
///
/// Serializes to the bare JSON value the hosted API expects and converts to
/// a `rusqlite` value for the embedded store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// Text value.
    Text(String),
    /// Floating point value.
    Real(f64),
    /// Integer value.
    Integer(i64),
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Real(r) => r.to_sql(),
            Self::Integer(i) => i.to_sql(),
        }
    }
}

/// Parameters for [`schema::WRITE_COLUMNS`], in the same order.
#[must_use]
pub fn record_params(record: &CalculatedRecord) -> Vec<SqlParam> {
    let i = &record.inputs;
    let c = &record.costs;
    let mut params = vec![SqlParam::Text(i.date.format("%Y-%m-%d").to_string())];
    params.extend(
        [
            i.production,
            i.outdone,
            i.paper_quantity_kg,
            i.paper_rate,
            c.paper_cost,
            c.paper_cost_per_tube,
            i.paste_quantity,
            i.paste_rate,
            c.paste_cost,
            c.paste_cost_per_tube,
            i.outer_paste_quantity,
            i.outer_paste_rate,
            c.outer_paste_cost,
            c.outer_paste_cost_per_tube,
            i.packing_quantity,
            i.packing_rate,
            c.packing_cost,
            c.packing_cost_per_tube,
            i.labour_count,
            i.labour_wage,
            c.labour_cost,
            c.labour_cost_per_tube,
            i.eb_units,
            i.eb_amount,
            c.eb_cost_per_tube,
            i.overheads_amount,
            c.overheads_cost_per_tube,
            i.food_amount,
            c.food_cost_per_tube,
            c.grand_total_cost_per_tube,
        ]
        .into_iter()
        .map(SqlParam::Real),
    );
    params
}

/// Format a write timestamp the way both stores persist it.
#[must_use]
pub fn timestamp_param(at: DateTime<Utc>) -> SqlParam {
    SqlParam::Text(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
