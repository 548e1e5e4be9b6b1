use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::filter_sql::*;
use super::types::{LosSummary, UnitLos};

/// Average length of stay over admissions with a valid stay.
///
/// Missing/unparseable timestamps and discharge-before-admit rows are left out
/// of the mean and reported as exclusions.
pub fn average_los(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<LosSummary, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN {VALID_STAY} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {MISSING_TIMESTAMP} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {DISCHARGE_BEFORE_ADMIT} THEN 1 ELSE 0 END), 0),
                AVG(CASE WHEN {VALID_STAY} THEN {LOS_HOURS} END)
         FROM admissions a
         WHERE 1=1{}{}",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let summary = conn.query_row(&sql, query.params().as_slice(), |row| {
        let avg_hours: Option<f64> = row.get(4)?;
        Ok(LosSummary {
            encounters: row.get(0)?,
            valid: row.get(1)?,
            missing_timestamp: row.get(2)?,
            discharge_before_admit: row.get(3)?,
            avg_hours,
            avg_days: avg_hours.map(|h| h / 24.0),
        })
    })?;

    if summary.excluded() > 0 {
        tracing::debug!(
            excluded = summary.excluded(),
            valid = summary.valid,
            "Admissions excluded from LOS"
        );
    }
    Ok(summary)
}

/// Average valid LOS per unit, ordered by unit id (unknown units first).
pub fn los_by_unit(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<UnitLos>, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT CAST(a.unit_id AS TEXT) AS unit,
                COALESCE(SUM(CASE WHEN {VALID_STAY} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN {VALID_STAY} THEN 0 ELSE 1 END), 0),
                AVG(CASE WHEN {VALID_STAY} THEN {LOS_HOURS} END)
         FROM admissions a
         WHERE 1=1{}{}
         GROUP BY unit
         ORDER BY unit",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.params().as_slice(), |row| {
        Ok(UnitLos {
            unit_id: row.get(0)?,
            valid: row.get(1)?,
            excluded: row.get(2)?,
            avg_hours: row.get(3)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;

    fn seed(conn: &Connection) {
        // 24h and 48h valid stays in ICU, one reversed, one still open.
        insert_stay(conn, "E1", "H1", "ICU", "2024-01-01 08:00:00", Some("2024-01-02 08:00:00"));
        insert_stay(conn, "E2", "H1", "ICU", "2024-01-03 08:00:00", Some("2024-01-05 08:00:00"));
        insert_stay(conn, "E3", "H1", "ICU", "2024-01-02 10:00:00", Some("2024-01-01 09:00:00"));
        insert_stay(conn, "E4", "H1", "ED", "2024-01-04 08:00:00", None);
        insert_stay(conn, "E5", "H2", "ED", "2024-01-04 08:00:00", Some("2024-01-04 14:00:00"));
    }

    #[test]
    fn average_excludes_invalid_rows_and_reports_them() {
        let conn = setup_db();
        seed(&conn);

        let los = average_los(&conn, &window(d(2024, 1, 1), d(2024, 1, 31))).unwrap();
        assert_eq!(los.encounters, 5);
        assert_eq!(los.valid, 3);
        assert_eq!(los.discharge_before_admit, 1);
        assert_eq!(los.missing_timestamp, 1);
        let avg = los.avg_hours.unwrap();
        assert!((avg - (24.0 + 48.0 + 6.0) / 3.0).abs() < 1e-6, "got {avg}");
        assert!((los.avg_days.unwrap() - avg / 24.0).abs() < 1e-9);
    }

    #[test]
    fn discharge_before_admit_example_is_excluded() {
        let conn = setup_db();
        insert_stay(&conn, "E3", "H1", "ICU", "2024-01-02T10:00", Some("2024-01-01T09:00"));

        let los = average_los(&conn, &window(d(2024, 1, 1), d(2024, 1, 3))).unwrap();
        assert_eq!(los.encounters, 1);
        assert_eq!(los.valid, 0);
        assert_eq!(los.discharge_before_admit, 1);
        assert_eq!(los.avg_hours, None, "no valid rows means no average, not zero");
    }

    #[test]
    fn hospital_and_unit_filters_apply() {
        let conn = setup_db();
        seed(&conn);

        let filter = window(d(2024, 1, 1), d(2024, 1, 31))
            .with_hospital(Some("H1"))
            .with_unit(Some("ICU"));
        let los = average_los(&conn, &filter).unwrap();
        assert_eq!(los.encounters, 3);
        assert_eq!(los.valid, 2);
        assert!((los.avg_hours.unwrap() - 36.0).abs() < 1e-6);
    }

    #[test]
    fn incremental_mean_matches_batch_mean() {
        let conn = setup_db();
        seed(&conn);
        insert_stay(&conn, "E6", "H2", "ICU", "2024-01-20 00:00:00", Some("2024-01-20 05:30:00"));

        let batch = average_los(&conn, &window(d(2024, 1, 1), d(2024, 1, 31))).unwrap();
        let first = average_los(&conn, &window(d(2024, 1, 1), d(2024, 1, 3))).unwrap();
        let second = average_los(&conn, &window(d(2024, 1, 4), d(2024, 1, 31))).unwrap();

        assert_eq!(first.valid + second.valid, batch.valid);
        let combined = (first.avg_hours.unwrap() * first.valid as f64
            + second.avg_hours.unwrap() * second.valid as f64)
            / (first.valid + second.valid) as f64;
        assert!((combined - batch.avg_hours.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn los_by_unit_groups_and_counts_exclusions() {
        let conn = setup_db();
        seed(&conn);

        let units = los_by_unit(&conn, &window(d(2024, 1, 1), d(2024, 1, 31))).unwrap();
        assert_eq!(units.len(), 2);

        let ed = &units[0];
        assert_eq!(ed.unit_id.as_deref(), Some("ED"));
        assert_eq!(ed.valid, 1);
        assert_eq!(ed.excluded, 1);
        assert!((ed.avg_hours.unwrap() - 6.0).abs() < 1e-6);

        let icu = &units[1];
        assert_eq!(icu.unit_id.as_deref(), Some("ICU"));
        assert_eq!(icu.valid, 2);
        assert_eq!(icu.excluded, 1);
    }

    #[test]
    fn empty_window_yields_zero_counts() {
        let conn = setup_db();
        seed(&conn);

        let los = average_los(&conn, &window(d(2023, 1, 1), d(2023, 1, 31))).unwrap();
        assert_eq!(los.encounters, 0);
        assert_eq!(los.valid, 0);
        assert_eq!(los.avg_hours, None);
    }
}
