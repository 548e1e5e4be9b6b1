use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::los::average_los;
use super::occupancy::{
    daily_proxy_occupancy, daily_true_occupancy, mean_capped_proxy_pct, mean_occupancy_pct,
};
use super::types::{is_bottleneck, DashboardSummary};
use super::volume::admissions_per_day;

/// Compute the KPI strip for one filter.
///
/// The proxy KPI averages capped arrival ratios; the alert is driven by the
/// true census only.
pub fn dashboard_summary(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<DashboardSummary, DatabaseError> {
    let los = average_los(conn, filter)?;
    let per_day = admissions_per_day(conn, filter)?;
    let proxy = daily_proxy_occupancy(conn, filter)?;
    let census = daily_true_occupancy(conn, filter)?;

    let avg_true_occupancy_pct = mean_occupancy_pct(&census);
    let summary = DashboardSummary {
        filter: filter.clone(),
        filtered_encounters: los.encounters,
        los,
        admissions_per_day: per_day,
        avg_proxy_occupancy_pct: mean_capped_proxy_pct(&proxy),
        avg_true_occupancy_pct,
        bottleneck_alert: avg_true_occupancy_pct.is_some_and(is_bottleneck),
        bottleneck_days: census.iter().filter(|r| r.bottleneck).count(),
    };

    tracing::info!(
        from = %filter.date_from(),
        to = %filter.date_to(),
        encounters = summary.filtered_encounters,
        bottleneck_days = summary.bottleneck_days,
        "Dashboard summary computed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;

    #[test]
    fn empty_window_has_no_averages() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));

        let summary =
            dashboard_summary(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        assert_eq!(summary.filtered_encounters, 0);
        assert_eq!(summary.los.avg_hours, None);
        assert_eq!(summary.admissions_per_day.avg_per_day, 0.0);
        assert_eq!(summary.avg_proxy_occupancy_pct, None);
        assert_eq!(summary.avg_true_occupancy_pct, Some(0.0));
        assert!(!summary.bottleneck_alert);
        assert_eq!(summary.bottleneck_days, 0);
    }

    #[test]
    fn low_census_raises_no_alert() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        insert_stay(&conn, "E1", "H1", "ICU", "2024-01-01 08:00:00", None);
        insert_stay(&conn, "E2", "H1", "ICU", "2024-01-01 09:00:00", None);

        let summary =
            dashboard_summary(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        assert_eq!(summary.filtered_encounters, 2);
        assert_eq!(summary.avg_true_occupancy_pct, Some(20.0));
        assert!((summary.avg_proxy_occupancy_pct.unwrap() - 20.0).abs() < 1e-9);
        assert!(!summary.bottleneck_alert);
        assert_eq!(summary.bottleneck_days, 0);
    }

    #[test]
    fn high_census_raises_alert_and_counts_days() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ICU", Some(10));
        for i in 0..9 {
            insert_stay(&conn, &format!("E{i}"), "H1", "ICU", "2024-01-01 08:00:00", None);
        }

        let summary = dashboard_summary(&conn, &window(d(2024, 1, 1), d(2024, 1, 2))).unwrap();
        assert_eq!(summary.avg_true_occupancy_pct, Some(90.0));
        assert!(summary.bottleneck_alert);
        assert_eq!(summary.bottleneck_days, 2);
        assert_eq!(summary.admissions_per_day.active_days, 1);
        assert_eq!(summary.admissions_per_day.avg_per_day, 9.0);
        assert_eq!(summary.admissions_per_day.avg_per_calendar_day, 4.5);
    }

    #[test]
    fn over_capacity_arrivals_are_capped_in_proxy_kpi() {
        let conn = setup_db();
        insert_beds(&conn, "H1", "ED", Some(2));
        for i in 0..6 {
            insert_stay(
                &conn,
                &format!("E{i}"),
                "H1",
                "ED",
                "2024-01-01 08:00:00",
                Some("2024-01-01 12:00:00"),
            );
        }

        let summary =
            dashboard_summary(&conn, &AdmissionFilter::single_day(d(2024, 1, 1))).unwrap();
        let proxy = summary.avg_proxy_occupancy_pct.unwrap();
        assert!((proxy - 120.0).abs() < 1e-9, "{proxy}");
        assert_eq!(summary.avg_true_occupancy_pct, Some(0.0));
        assert!(!summary.bottleneck_alert);
    }
}
