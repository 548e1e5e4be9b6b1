use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::filter_sql::*;
use super::types::{DataQualityReport, UnitKey};

/// Count data-quality problems among the filtered admissions.
///
/// Detects:
/// - missing or unparseable admit/discharge timestamps (open stays included)
/// - discharge before admit
/// - null, non-numeric or negative waits, and missing triage levels
/// - unit and patient ids with no reference row
/// - (hospital, unit) pairs with admissions but no positive bed baseline
pub fn data_quality_report(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<DataQualityReport, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN a.encounter_id IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {MISSING_TIMESTAMP} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {DISCHARGE_BEFORE_ADMIT} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {WAIT_MINUTES} IS NULL OR {WAIT_MINUTES} < 0
                                  THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN a.triage_level IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN u.unit_id IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.patient_id IS NULL THEN 1 ELSE 0 END), 0)
         FROM admissions a
         LEFT JOIN units u ON u.unit_id = a.unit_id
         LEFT JOIN patients p ON p.patient_id = a.patient_id
         WHERE 1=1{}{}",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut report = conn.query_row(&sql, query.params().as_slice(), |row| {
        Ok(DataQualityReport {
            encounters: row.get(0)?,
            missing_encounter_id: row.get(1)?,
            missing_timestamp: row.get(2)?,
            discharge_before_admit: row.get(3)?,
            invalid_wait: row.get(4)?,
            missing_triage: row.get(5)?,
            unknown_unit: row.get(6)?,
            unknown_patient: row.get(7)?,
            units_without_capacity: Vec::new(),
        })
    })?;

    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT DISTINCT CAST(a.hospital AS TEXT), CAST(a.unit_id AS TEXT)
         FROM admissions a
         LEFT JOIN bed_capacity c ON c.hospital = a.hospital AND c.unit_id = a.unit_id
         WHERE a.hospital IS NOT NULL AND a.unit_id IS NOT NULL
           AND (typeof(c.baseline_staffed_beds) NOT IN ('integer', 'real')
                OR c.baseline_staffed_beds <= 0){}{}
         ORDER BY 1, 2",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );
    let mut stmt = conn.prepare(&sql)?;
    report.units_without_capacity = stmt
        .query_map(query.params().as_slice(), |row| {
            Ok(UnitKey {
                hospital: row.get(0)?,
                unit_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if !report.is_clean() {
        tracing::info!(
            encounters = report.encounters,
            missing_timestamp = report.missing_timestamp,
            discharge_before_admit = report.discharge_before_admit,
            unknown_unit = report.unknown_unit,
            "Data-quality issues in filtered admissions"
        );
    }
    Ok(report)
}
