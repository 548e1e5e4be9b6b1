use std::fs::File;
use std::io::Read;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;

use crate::config::AppConfig;
use crate::db::{open_database, SCHEMA_TABLES};
use crate::models::*;
use super::tables::TableRecord;
use super::LoadError;

/// Outcome of loading one CSV into its table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableLoadReport {
    pub table: String,
    pub rows_read: u64,
    pub inserted: u64,
    /// Rows whose primary key was already present.
    pub duplicates: u64,
    /// Rows that could not be parsed or lacked their key.
    pub malformed: u64,
    /// The table already held rows, so the CSV was not read.
    pub skipped_existing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableLoadReport>,
}

impl LoadReport {
    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.tables.iter().map(|t| t.duplicates + t.malformed).sum()
    }
}

/// Make sure the snapshot database exists.
///
/// An existing file only gets the idempotent migrations. A missing file is
/// created and populated from the CSVs in `config.data_dir`; the returned
/// report is `Some` only in that case. If the first load fails the partial
/// file is removed so the next run starts clean.
pub fn ensure_database(config: &AppConfig) -> Result<Option<LoadReport>, LoadError> {
    if config.db_path.exists() {
        open_database(&config.db_path)?;
        tracing::debug!(path = %config.db_path.display(), "Database present, skipping bootstrap");
        return Ok(None);
    }

    if !config.data_dir.is_dir() {
        return Err(LoadError::DataDirMissing(config.data_dir.clone()));
    }
    for table in SCHEMA_TABLES {
        let csv_path = config.csv_path(table);
        if !csv_path.is_file() {
            return Err(LoadError::MissingFile(csv_path));
        }
    }

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(
        path = %config.db_path.display(),
        data_dir = %config.data_dir.display(),
        "Bootstrapping database from CSV snapshot"
    );

    match create_and_load(config) {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(&config.db_path) {
                tracing::warn!(error = %remove_err, "Failed to remove partial database");
            }
            Err(e)
        }
    }
}

fn create_and_load(config: &AppConfig) -> Result<LoadReport, LoadError> {
    let conn = open_database(&config.db_path)?;
    load_all(&conn, &config.data_dir)
}

/// Load every snapshot table from `<data_dir>/<table>.csv`, in schema order.
///
/// Tables that already hold rows are left untouched, so re-running against a
/// populated database changes nothing.
pub fn load_all(conn: &Connection, data_dir: &Path) -> Result<LoadReport, LoadError> {
    let tables = vec![
        load_table_file::<Patient>(conn, data_dir)?,
        load_table_file::<Unit>(conn, data_dir)?,
        load_table_file::<BedCapacity>(conn, data_dir)?,
        load_table_file::<StaffShift>(conn, data_dir)?,
        load_table_file::<Admission>(conn, data_dir)?,
    ];
    let report = LoadReport { tables };

    tracing::info!(
        inserted = report.total_inserted(),
        rejected = report.total_rejected(),
        "CSV snapshot load complete"
    );
    Ok(report)
}

/// Load one table from its CSV file inside `data_dir`.
pub fn load_table_file<T: TableRecord>(
    conn: &Connection,
    data_dir: &Path,
) -> Result<TableLoadReport, LoadError> {
    if table_has_rows(conn, T::TABLE)? {
        return Ok(skipped::<T>());
    }
    let csv_path = data_dir.join(format!("{}.csv", T::TABLE));
    if !csv_path.is_file() {
        return Err(LoadError::MissingFile(csv_path));
    }
    load_table::<T, _>(conn, File::open(&csv_path)?)
}

/// Load one table from any CSV source.
///
/// Malformed rows and duplicate keys are counted and skipped; a missing
/// required header fails the whole table.
pub fn load_table<T: TableRecord, R: Read>(
    conn: &Connection,
    source: R,
) -> Result<TableLoadReport, LoadError> {
    if table_has_rows(conn, T::TABLE)? {
        return Ok(skipped::<T>());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    for column in T::COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn {
                table: T::TABLE.to_string(),
                column: (*column).to_string(),
            });
        }
    }

    let mut report = TableLoadReport {
        table: T::TABLE.to_string(),
        ..Default::default()
    };

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(T::INSERT_SQL)?;
        for result in reader.deserialize::<T>() {
            report.rows_read += 1;
            let record = match result {
                Ok(record) if record.has_key() => record,
                Ok(_) => {
                    report.malformed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::debug!(table = T::TABLE, error = %e, "Skipping malformed CSV row");
                    report.malformed += 1;
                    continue;
                }
            };
            match record.insert(&mut stmt)? {
                0 => report.duplicates += 1,
                _ => report.inserted += 1,
            }
        }
    }
    tx.commit()?;

    tracing::info!(
        table = T::TABLE,
        rows = report.rows_read,
        inserted = report.inserted,
        duplicates = report.duplicates,
        malformed = report.malformed,
        "Loaded table"
    );
    Ok(report)
}

fn skipped<T: TableRecord>() -> TableLoadReport {
    tracing::info!(table = T::TABLE, "Table already populated, skipping load");
    TableLoadReport {
        table: T::TABLE.to_string(),
        skipped_existing: true,
        ..Default::default()
    }
}

fn table_has_rows(conn: &Connection, table: &str) -> Result<bool, LoadError> {
    // Table names only come from TableRecord::TABLE constants.
    let exists = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table})"),
        [],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}
