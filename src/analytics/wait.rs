use rusqlite::Connection;

use crate::config::ED_UNIT_ID;
use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::filter_sql::{FilterQuery, WAIT_MINUTES};
use super::types::{TriageWait, WaitTimeReport};

/// Mean wait in minutes per triage level, over every unit the filter admits.
///
/// Null, non-numeric and negative waits are excluded, as are rows without a
/// triage level. Ward waits measure transfer lag; see [`ed_wait_by_triage`]
/// for the triage-to-provider view.
pub fn wait_by_triage(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<WaitTimeReport, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT CAST(a.triage_level AS TEXT) AS level, AVG({WAIT_MINUTES}), COUNT(*)
         FROM admissions a
         WHERE a.triage_level IS NOT NULL AND {WAIT_MINUTES} >= 0{}{}
         GROUP BY level
         ORDER BY MIN(CAST(a.triage_level AS REAL)), level",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let levels = stmt
        .query_map(query.params().as_slice(), |row| {
            Ok(TriageWait {
                triage_level: row.get(0)?,
                avg_wait_minutes: row.get(1)?,
                encounters: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN {WAIT_MINUTES} IS NULL OR {WAIT_MINUTES} < 0
                                  THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {WAIT_MINUTES} >= 0 AND a.triage_level IS NULL
                                  THEN 1 ELSE 0 END), 0)
         FROM admissions a
         WHERE 1=1{}{}",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );
    let (encounters, excluded_invalid_wait, excluded_missing_triage): (i64, i64, i64) =
        conn.query_row(&sql, query.params().as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

    Ok(WaitTimeReport {
        included: levels.iter().map(|l| l.encounters).sum(),
        levels,
        encounters,
        excluded_invalid_wait,
        excluded_missing_triage,
    })
}

/// Emergency-department wait per triage level.
///
/// The filter's unit is pinned to the ED. A filter that names a different
/// unit has no ED admissions in scope and yields an empty report.
pub fn ed_wait_by_triage(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<WaitTimeReport, DatabaseError> {
    match filter.unit() {
        Some(unit) if unit != ED_UNIT_ID => Ok(WaitTimeReport::default()),
        _ => wait_by_triage(conn, &filter.clone().with_unit(Some(ED_UNIT_ID))),
    }
}
