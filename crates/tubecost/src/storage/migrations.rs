//! Versioned schema for the embedded store.
//!
//! Each [`Migration`] is a batch of DDL applied once, inside a transaction,
//! when a database file older than it is opened. The applied version is kept
//! in the `metadata` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_DATE_INDEX, CREATE_METADATA_TABLE, CREATE_RECORDS_TABLE};

/// One step of schema history.
#[derive(Debug)]
pub struct Migration {
    /// Version the database is at after this step.
    pub version: i32,
    /// What the step changes.
    pub description: &'static str,
    /// Statements run in order.
    pub statements: &'static [&'static str],
}

/// Schema history, oldest first. Versions are consecutive from 1.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "daily production records with newest-first date index",
    statements: &[CREATE_RECORDS_TABLE, CREATE_DATE_INDEX],
}];

/// The schema version this build writes.
pub const CURRENT_VERSION: i32 = 1;

const VERSION_KEY: &str = "schema_version";

/// Bring the schema at `conn` up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if the stored version is unreadable or newer than this
/// build, or if a migration fails. A failed migration leaves the database at
/// its previous version.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration)?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in migration.statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        "Applied schema migration {}: {}",
        migration.version, migration.description
    );
    Ok(())
}

/// Stored schema version, 0 for a database that has never been migrated.
fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                [kind, name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    fn set_version(conn: &Connection, value: &str) {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            [VERSION_KEY, value],
        )
        .unwrap();
    }

    #[test]
    fn test_history_is_consecutive_and_ends_at_current() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(usize::try_from(migration.version).unwrap(), idx + 1);
            assert!(!migration.statements.is_empty());
        }
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(CURRENT_VERSION));
    }

    #[test]
    fn test_fresh_database_gets_table_index_and_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert!(object_exists(&conn, "table", "daily_production_records"));
        assert!(object_exists(&conn, "table", "metadata"));
        assert!(object_exists(&conn, "index", "idx_records_date"));
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_twice_is_harmless() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO daily_production_records (date, production, outdone, grand_total_cost_per_tube)
             VALUES ('2024-03-15', 10, 9, 1)",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM daily_production_records", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_unversioned_table_is_adopted() {
        // A file written before versioning has the table but no index or version
        let conn = create_test_db();
        conn.execute(CREATE_RECORDS_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO daily_production_records (date, production, outdone, grand_total_cost_per_tube)
             VALUES ('2024-03-15', 10, 9, 1)",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        assert!(object_exists(&conn, "index", "idx_records_date"));
        assert_eq!(schema_version(&conn).unwrap(), 1);
        let date: String = conn
            .query_row("SELECT date FROM daily_production_records", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(date, "2024-03-15");
    }

    #[test]
    fn test_version_is_zero_without_entry() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        set_version(&conn, &(CURRENT_VERSION + 1).to_string());

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_invalid_schema_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        set_version(&conn, "one");

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        // Occupy the index name with a table so migration 1 fails partway
        conn.execute("CREATE TABLE idx_records_date (x)", []).unwrap();

        assert!(initialize_schema(&conn).is_err());
        assert!(!object_exists(&conn, "table", "daily_production_records"));
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }
}
