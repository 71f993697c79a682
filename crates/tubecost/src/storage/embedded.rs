//! Local `SQLite` file store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{migrations, record_params, schema, timestamp_param, RecordStore, SqlParam};
use crate::config::Backend;
use crate::error::{Error, Result};
use crate::record::{
    parse_timestamp, CalculatedRecord, CostBreakdown, ProductionInputs, ProductionRecord,
};

/// Record store backed by a local `SQLite` file.
///
/// The single connection is guarded by a mutex, so writes are serialized.
/// Statements run on tokio's blocking pool so a slow disk never stalls the
/// async workers. Each operation is one statement; there are no
/// multi-record transactions.
#[derive(Debug)]
pub struct EmbeddedStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, `None` once closed.
    conn: Arc<Mutex<Option<Connection>>>,
}

impl EmbeddedStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the open connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::internal("database connection lock poisoned"))?;
            let conn = guard.as_ref().ok_or(Error::StoreClosed)?;
            f(conn)
        })
        .await
        .map_err(|e| Error::internal(format!("database task failed: {e}")))?
    }

    /// Convert a database row to a record.
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProductionRecord> {
        let real = |column: &str| -> rusqlite::Result<f64> {
            Ok(row.get::<_, Option<f64>>(column)?.unwrap_or(0.0))
        };

        let id: i64 = row.get("id")?;
        let date_str: String = row.get("date")?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let inputs = ProductionInputs {
            date,
            production: real("production")?,
            outdone: real("outdone")?,
            paper_quantity_kg: real("paper_quantity_kg")?,
            paper_rate: real("paper_rate")?,
            paste_quantity: real("paste_quantity")?,
            paste_rate: real("paste_rate")?,
            outer_paste_quantity: real("outer_paste_quantity")?,
            outer_paste_rate: real("outer_paste_rate")?,
            packing_quantity: real("packing_quantity")?,
            packing_rate: real("packing_rate")?,
            labour_count: real("labour_count")?,
            labour_wage: real("labour_wage")?,
            eb_units: real("eb_units")?,
            eb_amount: real("eb_amount")?,
            overheads_amount: real("overheads_amount")?,
            food_amount: real("food_amount")?,
        };

        let costs = CostBreakdown {
            paper_cost: real("paper_cost")?,
            paper_cost_per_tube: real("paper_cost_per_tube")?,
            paste_cost: real("paste_cost")?,
            paste_cost_per_tube: real("paste_cost_per_tube")?,
            outer_paste_cost: real("outer_paste_cost")?,
            outer_paste_cost_per_tube: real("outer_paste_cost_per_tube")?,
            packing_cost: real("packing_cost")?,
            packing_cost_per_tube: real("packing_cost_per_tube")?,
            labour_cost: real("labour_cost")?,
            labour_cost_per_tube: real("labour_cost_per_tube")?,
            eb_cost_per_tube: real("eb_cost_per_tube")?,
            overheads_cost_per_tube: real("overheads_cost_per_tube")?,
            food_cost_per_tube: real("food_cost_per_tube")?,
            grand_total_cost_per_tube: real("grand_total_cost_per_tube")?,
        };

        let created_at: Option<String> = row.get("created_at")?;
        let updated_at: Option<String> = row.get("updated_at")?;

        Ok(ProductionRecord {
            id,
            record: CalculatedRecord { inputs, costs },
            created_at: created_at.as_deref().and_then(parse_timestamp),
            updated_at: updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

#[async_trait]
impl RecordStore for EmbeddedStore {
    fn backend(&self) -> Backend {
        Backend::Embedded
    }

    async fn list(&self) -> Result<Vec<ProductionRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(schema::SELECT_ALL)?;
            let records = stmt
                .query_map([], Self::row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<ProductionRecord>> {
        self.with_conn(move |conn| {
            let record = conn
                .query_row(schema::SELECT_BY_ID, [id], Self::row_to_record)
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn create(&self, record: &CalculatedRecord) -> Result<i64> {
        let now = timestamp_param(Utc::now());
        let mut params = record_params(record);
        params.push(now.clone());
        params.push(now);
        let date = record.inputs.date;

        self.with_conn(move |conn| {
            conn.execute(&schema::insert_sql(), params_from_iter(params.iter()))?;
            let id = conn.last_insert_rowid();
            debug!("Inserted record {} for {}", id, date);
            Ok(id)
        })
        .await
    }

    async fn update(&self, id: i64, record: &CalculatedRecord) -> Result<()> {
        let mut params = record_params(record);
        params.push(timestamp_param(Utc::now()));
        params.push(SqlParam::Integer(id));

        self.with_conn(move |conn| {
            let changed = conn.execute(&schema::update_sql(), params_from_iter(params.iter()))?;
            if changed == 0 {
                debug!("Update of record {} matched no rows", id);
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(schema::DELETE_BY_ID, [id])?;
            debug!("Deleted {} row(s) for record {}", changed, id);
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let closed = tokio::task::spawn_blocking(move || -> Result<bool> {
            let taken = conn
                .lock()
                .map_err(|_| Error::internal("database connection lock poisoned"))?
                .take();
            match taken {
                Some(conn) => {
                    conn.close().map_err(|(_, e)| Error::DatabaseQuery(e))?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
        .map_err(|e| Error::internal(format!("database task failed: {e}")))??;

        if closed {
            info!("Database closed at {}", self.path.display());
        } else {
            warn!("Database at {} already closed", self.path.display());
        }
        Ok(())
    }
}
