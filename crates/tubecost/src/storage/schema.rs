//! `SQLite` schema definitions for tubecost.
//!
//! Both storage engines speak `SQLite`, so the table definition and the
//! statements that read and write it are shared here.

/// Name of the records table.
pub const RECORDS_TABLE: &str = "daily_production_records";

/// SQL statement to create the records table.
///
/// `date` is unique: one record per calendar day.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS daily_production_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    production REAL NOT NULL,
    outdone REAL NOT NULL,
    paper_quantity_kg REAL,
    paper_rate REAL,
    paper_cost REAL,
    paper_cost_per_tube REAL,
    paste_quantity REAL,
    paste_rate REAL,
    paste_cost REAL,
    paste_cost_per_tube REAL,
    outer_paste_quantity REAL,
    outer_paste_rate REAL,
    outer_paste_cost REAL,
    outer_paste_cost_per_tube REAL,
    packing_quantity REAL,
    packing_rate REAL,
    packing_cost REAL,
    packing_cost_per_tube REAL,
    labour_count REAL,
    labour_wage REAL,
    labour_cost REAL,
    labour_cost_per_tube REAL,
    eb_units REAL,
    eb_amount REAL,
    eb_cost_per_tube REAL,
    overheads_amount REAL,
    overheads_cost_per_tube REAL,
    food_amount REAL,
    food_cost_per_tube REAL,
    grand_total_cost_per_tube REAL NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on date for the newest-first listing.
pub const CREATE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_date ON daily_production_records(date DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RECORDS_TABLE,
    CREATE_DATE_INDEX,
    CREATE_METADATA_TABLE,
];

/// Columns written on every create and update, in bind order.
///
/// Matches the order of [`crate::storage::record_params`].
pub const WRITE_COLUMNS: &[&str] = &[
    "date",
    "production",
    "outdone",
    "paper_quantity_kg",
    "paper_rate",
    "paper_cost",
    "paper_cost_per_tube",
    "paste_quantity",
    "paste_rate",
    "paste_cost",
    "paste_cost_per_tube",
    "outer_paste_quantity",
    "outer_paste_rate",
    "outer_paste_cost",
    "outer_paste_cost_per_tube",
    "packing_quantity",
    "packing_rate",
    "packing_cost",
    "packing_cost_per_tube",
    "labour_count",
    "labour_wage",
    "labour_cost",
    "labour_cost_per_tube",
    "eb_units",
    "eb_amount",
    "eb_cost_per_tube",
    "overheads_amount",
    "overheads_cost_per_tube",
    "food_amount",
    "food_cost_per_tube",
    "grand_total_cost_per_tube",
];

/// Select every record, newest day first.
pub const SELECT_ALL: &str =
    "SELECT * FROM daily_production_records ORDER BY date DESC, id DESC";

/// Select one record by id.
pub const SELECT_BY_ID: &str = "SELECT * FROM daily_production_records WHERE id = ?1";

/// Delete one record by id.
pub const DELETE_BY_ID: &str = "DELETE FROM daily_production_records WHERE id = ?1";

/// Build the INSERT statement.
///
/// Binds [`WRITE_COLUMNS`] followed by `created_at` and `updated_at`.
#[must_use]
pub fn insert_sql() -> String {
    let columns = WRITE_COLUMNS.join(", ");
    let placeholders = (1..=WRITE_COLUMNS.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {RECORDS_TABLE} ({columns}, created_at, updated_at) VALUES ({placeholders})"
    )
}

/// Build the UPDATE statement.
///
/// Binds [`WRITE_COLUMNS`], then `updated_at`, then the id.
#[must_use]
pub fn update_sql() -> String {
    let assignments = WRITE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let updated_at = WRITE_COLUMNS.len() + 1;
    let id = WRITE_COLUMNS.len() + 2;
    format!("UPDATE {RECORDS_TABLE} SET {assignments}, updated_at = ?{updated_at} WHERE id = ?{id}")
}
