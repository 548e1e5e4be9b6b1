use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::{AdmissionFilter, OccupancyBasis};
use super::filter_sql::FilterQuery;
use super::types::{DailyOccupancyMean, OccupancyRow};

/// True daily census per (hospital, unit, day) in the filter window.
///
/// An encounter counts on day D when it was admitted on or before D and was
/// either discharged after D or is still open. The discharge day itself is not
/// counted. Encounters admitted before the window that are still open inside
/// it are included. Units in scope are every (hospital, unit) pair known to
/// admissions or bed_capacity that passes the location filter.
pub fn daily_true_occupancy(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<OccupancyRow>, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "WITH RECURSIVE {days},
         scope(hospital, unit_id) AS (
             SELECT a.hospital, a.unit_id FROM admissions a
             WHERE a.hospital IS NOT NULL AND a.unit_id IS NOT NULL{admissions_location}
             UNION
             SELECT b.hospital, b.unit_id FROM bed_capacity b
             WHERE b.hospital IS NOT NULL AND b.unit_id IS NOT NULL{beds_location}
         )
         SELECT CAST(s.hospital AS TEXT), CAST(s.unit_id AS TEXT), d.day,
                (SELECT COUNT(*) FROM admissions o
                 WHERE o.hospital = s.hospital AND o.unit_id = s.unit_id
                   AND date(o.admit_ts) <= d.day
                   AND (o.discharge_ts IS NULL OR date(o.discharge_ts) > d.day)) AS census,
                CASE WHEN typeof(c.baseline_staffed_beds) IN ('integer', 'real')
                     THEN CAST(c.baseline_staffed_beds AS INTEGER) END
         FROM scope s
         CROSS JOIN days d
         LEFT JOIN bed_capacity c ON c.hospital = s.hospital AND c.unit_id = s.unit_id
         ORDER BY 1, 2, d.day",
        days = query.census_days(),
        admissions_location = query.location("a"),
        beds_location = query.location("b"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.params().as_slice(), |row| {
        Ok(OccupancyRow::new(
            OccupancyBasis::TrueCensus,
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

/// Proxy occupancy: same-day arrivals per (hospital, unit, day) against staffed beds.
///
/// Only days with at least one arrival produce a row.
pub fn daily_proxy_occupancy(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<OccupancyRow>, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT CAST(a.hospital AS TEXT), CAST(a.unit_id AS TEXT), date(a.admit_ts) AS day,
                COUNT(*) AS arrivals,
                CASE WHEN typeof(c.baseline_staffed_beds) IN ('integer', 'real')
                     THEN CAST(c.baseline_staffed_beds AS INTEGER) END
         FROM admissions a
         LEFT JOIN bed_capacity c ON c.hospital = a.hospital AND c.unit_id = a.unit_id
         WHERE a.hospital IS NOT NULL AND a.unit_id IS NOT NULL{}{}
         GROUP BY a.hospital, a.unit_id, day
         ORDER BY 1, 2, day",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.params().as_slice(), |row| {
        Ok(OccupancyRow::new(
            OccupancyBasis::Proxy,
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::from)
}

/// (hospital, unit, day) tuples whose unclipped true occupancy reaches the threshold.
pub fn bottlenecks(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<OccupancyRow>, DatabaseError> {
    let flagged: Vec<OccupancyRow> = daily_true_occupancy(conn, filter)?
        .into_iter()
        .filter(|row| row.bottleneck)
        .collect();

    if !flagged.is_empty() {
        tracing::info!(count = flagged.len(), "Bottleneck unit-days detected");
    }
    Ok(flagged)
}

/// Mean unclipped true occupancy per day across the units in scope.
///
/// Units without a bed baseline do not contribute; days where no unit has one
/// are omitted.
pub fn daily_true_occupancy_mean(rows: &[OccupancyRow]) -> Vec<DailyOccupancyMean> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.basis == OccupancyBasis::TrueCensus) {
        if let Some(pct) = row.occupancy_pct {
            let entry = by_day.entry(row.date).or_insert((0.0, 0));
            entry.0 += pct;
            entry.1 += 1;
        }
    }

    by_day
        .into_iter()
        .map(|(date, (sum, units))| DailyOccupancyMean {
            date,
            mean_occupancy_pct: sum / units as f64,
            units_reporting: units,
        })
        .collect()
}

/// Mean of the rows' unclipped percentages, skipping rows without a baseline.
pub fn mean_occupancy_pct(rows: &[OccupancyRow]) -> Option<f64> {
    mean(rows.iter().filter_map(|r| r.occupancy_pct))
}

/// Proxy KPI: mean of arrivals/beds ratios capped at the proxy cap, as a percentage.
pub fn mean_capped_proxy_pct(rows: &[OccupancyRow]) -> Option<f64> {
    mean(rows.iter().filter_map(OccupancyRow::capped_ratio)).map(|ratio| ratio * 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;

    fn icu_rows(rows: &[OccupancyRow]) -> Vec<&OccupancyRow> {
        rows.iter().filter(|r| r.hospital == "H1" && r.unit_id == "ICU").collect()
    }

    #[test]
    fn two_open_icu_encounters_on_ten_beds_is_twenty_percent() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_stay(&conn, "E1", "H1", "ICU", "2024-01-01 08:00:00", Some("2024-01-03 08:00:00"));
        insert_stay(&conn, "E2", "H1", "ICU", "2024-01-01 12:00:00", None);

        let rows =
            daily_true_occupancy(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.basis, OccupancyBasis::TrueCensus);
        assert_eq!(row.occupied, 2);
        assert_eq!(row.staffed_beds, Some(10));
        assert_eq!(row.occupancy_pct, Some(20.0));
        assert!(!row.bottleneck);
    }

    #[test]
    fn nine_of_ten_beds_is_a_bottleneck() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        for i in 0..9 {
            insert_stay(&conn, &format!("E{i}"), "H1", "ICU", "2024-01-01 08:00:00", None);
        }

        let filter = AdmissionFilter::single_day(d(2024, 1, 1));
        let rows = daily_true_occupancy(&conn, &filter).unwrap();
        assert_eq!(rows[0].occupancy_pct, Some(90.0));
        assert!(rows[0].bottleneck);

        let flagged = bottlenecks(&conn, &filter).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].date, d(2024, 1, 1));
    }

    #[test]
    fn discharge_day_is_not_counted_and_carry_over_is() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(4));
        // Admitted before the window, discharged on Jan 3.
        insert_stay(&conn, "E1", "H1", "ICU", "2023-12-30 08:00:00", Some("2024-01-03 06:00:00"));

        let rows = daily_true_occupancy(&conn, &window(d(2024, 1, 1), d(2024, 1, 4))).unwrap();
        let census: Vec<i64> = icu_rows(&rows).iter().map(|r| r.occupied).collect();
        assert_eq!(census, vec![1, 1, 0, 0]);
    }

    #[test]
    fn reversed_and_unparseable_discharges_are_not_open() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_stay(&conn, "E1", "H1", "ICU", "2024-01-02 10:00:00", Some("2024-01-01 09:00:00"));
        insert_stay(&conn, "E2", "H1", "ICU", "2024-01-01 10:00:00", Some("soon"));

        let rows = daily_true_occupancy(&conn, &window(d(2024, 1, 1), d(2024, 1, 3))).unwrap();
        assert!(rows.iter().all(|r| r.occupied == 0));
    }

    #[test]
    fn units_without_beds_have_no_percentage() {
        let conn = setup_db();
        insert_stay(&conn, "E1", "H1", "STEPDOWN", "2024-01-01 08:00:00", None);
        insert_beds(&conn, "H1", "ICU", Some(0));

        let rows =
            daily_true_occupancy(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.occupancy_pct, None);
            assert_eq!(row.display_pct, None);
            assert!(!row.bottleneck);
        }
        assert_eq!(mean_occupancy_pct(&rows), None);
    }

    #[test]
    fn location_filter_limits_scope_on_both_sources() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_beds(&conn, "H2", "ICU", Some(10));
        insert_beds(&conn, "H1", "ED", Some(10));
        insert_stay(&conn, "E1", "H2", "ICU", "2024-01-01 08:00:00", None);

        let filter = AdmissionFilter::single_day(d(2024, 1, 1))
            .with_hospital(Some("H2"))
            .with_unit(Some("ICU"));
        let rows = daily_true_occupancy(&conn, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hospital, "H2");
        assert_eq!(rows[0].occupied, 1);
    }

    #[test]
    fn proxy_counts_arrivals_and_stays_distinct_from_census() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_stay(&conn, "E1", "H1", "ICU", "2024-01-01 08:00:00", None);
        insert_stay(&conn, "E2", "H1", "ICU", "2024-01-02 08:00:00", None);

        let filter = window(d(2024, 1, 1), d(2024, 1, 2));
        let proxy = daily_proxy_occupancy(&conn, &filter).unwrap();
        let census = daily_true_occupancy(&conn, &filter).unwrap();

        let arrivals: Vec<i64> = proxy.iter().map(|r| r.occupied).collect();
        let open: Vec<i64> = census.iter().map(|r| r.occupied).collect();
        assert_eq!(arrivals, vec![1, 1]);
        assert_eq!(open, vec![1, 2]);
        assert!(proxy.iter().all(|r| r.basis == OccupancyBasis::Proxy));
    }

    #[test]
    fn proxy_kpi_caps_ratios_before_averaging() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ED", Some(2));
        for i in 0..6 {
            insert_stay(&conn, &format!("A{i}"), "H1", "ED", "2024-01-01 08:00:00", None);
        }
        insert_stay(&conn, "B1", "H1", "ED", "2024-01-02 08:00:00", None);

        let proxy = daily_proxy_occupancy(&conn, &window(d(2024, 1, 1), d(2024, 1, 2))).unwrap();
        assert_eq!(proxy[0].occupancy_pct, Some(300.0));
        assert_eq!(proxy[0].display_pct, Some(100.0));
        // (1.2 + 0.5) / 2
        let kpi = mean_capped_proxy_pct(&proxy).unwrap();
        assert!((kpi - 85.0).abs() < 1e-9, "got {kpi}");
    }

    #[test]
    fn daily_mean_averages_units_with_baselines() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_beds(&conn, "H1", "ED", Some(4));
        insert_stay(&conn, "E1", "H1", "ICU", "2024-01-01 08:00:00", None);
        insert_stay(&conn, "E2", "H1", "ED", "2024-01-01 08:00:00", None);
        insert_stay(&conn, "E3", "H1", "OBS", "2024-01-01 08:00:00", None);

        let rows =
            daily_true_occupancy(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        let means = daily_true_occupancy_mean(&rows);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].units_reporting, 2);
        assert!((means[0].mean_occupancy_pct - 17.5).abs() < 1e-9);
    }
}
