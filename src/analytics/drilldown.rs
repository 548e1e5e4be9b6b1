use rusqlite::Connection;

use crate::config::UNKNOWN_UNIT_LABEL;
use crate::db::DatabaseError;
use crate::models::{AdmissionFilter, QualityFlag};
use super::filter_sql::*;
use super::types::DrillDownRow;

/// Raw filtered admissions joined with patient and unit reference data.
///
/// Nothing is dropped for data-quality reasons: orphan unit ids get the
/// unknown-unit sentinel, and every problem is listed in `quality_flags`.
pub fn drilldown_rows(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<DrillDownRow>, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT CAST(a.encounter_id AS TEXT), CAST(a.patient_id AS TEXT), p.patient_id IS NOT NULL,
                CAST(p.mrn AS TEXT),
                CASE WHEN typeof(p.age) IN ('integer', 'real') THEN CAST(p.age AS INTEGER) END,
                CAST(p.gender AS TEXT), CAST(p.primary_condition AS TEXT),
                CAST(a.hospital AS TEXT), CAST(a.unit_id AS TEXT), u.unit_id IS NOT NULL,
                CAST(u.unit_name AS TEXT), CAST(a.triage_level AS TEXT),
                CAST(a.admit_ts AS TEXT), CAST(a.discharge_ts AS TEXT), {WAIT_MINUTES},
                CASE WHEN {VALID_STAY} THEN {LOS_HOURS} END,
                {MISSING_TIMESTAMP}, COALESCE({DISCHARGE_BEFORE_ADMIT}, 0)
         FROM admissions a
         LEFT JOIN patients p ON p.patient_id = a.patient_id
         LEFT JOIN units u ON u.unit_id = a.unit_id
         WHERE 1=1{}{}
         ORDER BY a.admit_ts, a.encounter_id",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.params().as_slice(), |row| {
        let encounter_id: Option<String> = row.get(0)?;
        let patient_known: bool = row.get(2)?;
        let unit_known: bool = row.get(9)?;
        let unit_name: Option<String> = row.get(10)?;
        let wait_minutes: Option<f64> = row.get(14)?;
        let missing_timestamp: bool = row.get(16)?;
        let discharge_before_admit: bool = row.get(17)?;

        let mut quality_flags = Vec::new();
        if encounter_id.is_none() {
            quality_flags.push(QualityFlag::MissingEncounterId);
        }
        if missing_timestamp {
            quality_flags.push(QualityFlag::MissingTimestamp);
        }
        if discharge_before_admit {
            quality_flags.push(QualityFlag::DischargeBeforeAdmit);
        }
        if wait_minutes.map_or(true, |w| w < 0.0) {
            quality_flags.push(QualityFlag::InvalidWait);
        }
        if !unit_known {
            quality_flags.push(QualityFlag::UnknownUnit);
        }
        if !patient_known {
            quality_flags.push(QualityFlag::UnknownPatient);
        }

        Ok(DrillDownRow {
            encounter_id,
            patient_id: row.get(1)?,
            mrn: row.get(3)?,
            age: row.get(4)?,
            gender: row.get(5)?,
            primary_condition: row.get(6)?,
            hospital: row.get(7)?,
            unit_id: row.get(8)?,
            unit_name: match (unit_known, unit_name) {
                (true, Some(name)) => name,
                (true, None) => row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                (false, _) => UNKNOWN_UNIT_LABEL.to_string(),
            },
            triage_level: row.get(11)?,
            admit_ts: row.get(12)?,
            discharge_ts: row.get(13)?,
            wait_minutes,
            los_hours: row.get(15)?,
            quality_flags,
        })
    })?;

    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(rows = rows.len(), "Drill-down rows fetched");
    Ok(rows)
}
