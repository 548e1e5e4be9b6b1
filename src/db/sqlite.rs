use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use super::DatabaseError;

/// Tables of the snapshot schema, in load order.
pub const SCHEMA_TABLES: [&str; 5] = ["patients", "units", "bed_capacity", "staff", "admissions"];

/// Open (or create) a SQLite database at the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an existing database for queries only. Migrations are not applied.
pub fn open_read_only(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

// Snapshot tables carry orphan keys; referential integrity is not enforced.
fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=OFF;",
    )?;
    Ok(())
}

/// Run all pending migrations.
///
/// The version lives in `PRAGMA user_version` so that databases produced by
/// other tools keep exactly the five snapshot tables.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn)?;

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_filter_indexes.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 for a fresh or externally created file)
pub fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))?;
    Ok(version)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Row count of one snapshot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

/// Row counts for every snapshot table, in load order.
pub fn table_counts(conn: &Connection) -> Result<Vec<TableCount>, DatabaseError> {
    SCHEMA_TABLES
        .iter()
        .map(|table| {
            // Table names come from the fixed SCHEMA_TABLES list, never from input.
            let rows = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(TableCount {
                table: (*table).to_string(),
                rows,
            })
        })
        .collect()
}
