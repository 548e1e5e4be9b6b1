use std::fs::File;
use std::io::Write;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::drilldown::drilldown_rows;
use super::types::DrillDownRow;

/// Marker written in the `data_quality` column for rows without flags.
pub const CLEAN_MARKER: &str = "ok";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    encounter_id: Option<&'a str>,
    patient_id: Option<&'a str>,
    mrn: Option<&'a str>,
    age: Option<i64>,
    gender: Option<&'a str>,
    primary_condition: Option<&'a str>,
    hospital: Option<&'a str>,
    unit_id: Option<&'a str>,
    unit_name: &'a str,
    triage_level: Option<&'a str>,
    admit_ts: Option<&'a str>,
    discharge_ts: Option<&'a str>,
    wait_minutes: Option<f64>,
    los_hours: Option<f64>,
    data_quality: String,
}

impl<'a> From<&'a DrillDownRow> for ExportRecord<'a> {
    fn from(row: &'a DrillDownRow) -> Self {
        let data_quality = if row.quality_flags.is_empty() {
            CLEAN_MARKER.to_string()
        } else {
            row.quality_flags
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(";")
        };

        Self {
            encounter_id: row.encounter_id.as_deref(),
            patient_id: row.patient_id.as_deref(),
            mrn: row.mrn.as_deref(),
            age: row.age,
            gender: row.gender.as_deref(),
            primary_condition: row.primary_condition.as_deref(),
            hospital: row.hospital.as_deref(),
            unit_id: row.unit_id.as_deref(),
            unit_name: &row.unit_name,
            triage_level: row.triage_level.as_deref(),
            admit_ts: row.admit_ts.as_deref(),
            discharge_ts: row.discharge_ts.as_deref(),
            wait_minutes: row.wait_minutes,
            los_hours: row.los_hours,
            data_quality,
        }
    }
}

/// Write drill-down rows as CSV: one header row, then one line per row.
///
/// Returns the number of data rows written.
pub fn write_drilldown_csv<W: Write>(
    rows: &[DrillDownRow],
    writer: W,
) -> Result<usize, ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(ExportRecord::from(row))?;
    }
    out.flush()?;
    Ok(rows.len())
}

/// Export the filtered drill-down table to a CSV file at `path`.
pub fn export_drilldown(
    conn: &Connection,
    filter: &AdmissionFilter,
    path: &Path,
) -> Result<usize, ExportError> {
    let rows = drilldown_rows(conn, filter)?;
    let written = write_drilldown_csv(&rows, File::create(path)?)?;
    tracing::info!(path = %path.display(), rows = written, "Drill-down exported");
    Ok(written)
}
