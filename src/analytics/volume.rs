use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::AdmissionFilter;
use super::filter_sql::FilterQuery;
use super::types::{AdmissionsPerDay, DailyAdmissions, DateBounds, FilterOptions};

/// Matching admissions divided by the distinct admit dates among them.
///
/// The per-calendar-day rate over the whole window is reported alongside.
pub fn admissions_per_day(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<AdmissionsPerDay, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT COUNT(*), COUNT(DISTINCT date(a.admit_ts))
         FROM admissions a
         WHERE 1=1{}{}",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let (admissions, active_days): (i64, i64) =
        conn.query_row(&sql, query.params().as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?;

    let days_in_range = filter.days_in_range();
    Ok(AdmissionsPerDay {
        admissions,
        days_in_range,
        active_days,
        avg_per_day: if active_days > 0 {
            admissions as f64 / active_days as f64
        } else {
            0.0
        },
        avg_per_calendar_day: admissions as f64 / days_in_range as f64,
    })
}

/// Admissions per calendar day across the whole window; days without
/// admissions are reported as zero.
pub fn admissions_over_time(
    conn: &Connection,
    filter: &AdmissionFilter,
) -> Result<Vec<DailyAdmissions>, DatabaseError> {
    let mut query = FilterQuery::new(filter);
    let sql = format!(
        "SELECT date(a.admit_ts) AS day, COUNT(*)
         FROM admissions a
         WHERE 1=1{}{}
         GROUP BY day",
        query.admit_window("a.admit_ts"),
        query.location("a"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(query.params().as_slice(), |row| {
            Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(filter
        .days()
        .map(|date| DailyAdmissions {
            date,
            admissions: counts.get(&date).copied().unwrap_or(0),
        })
        .collect())
}

/// Earliest and latest admission date in the snapshot; `None` when there is
/// no admission with a parseable admit timestamp.
pub fn date_bounds(conn: &Connection) -> Result<Option<DateBounds>, DatabaseError> {
    let (min, max): (Option<NaiveDate>, Option<NaiveDate>) = conn.query_row(
        "SELECT MIN(date(admit_ts)), MAX(date(admit_ts)) FROM admissions",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(min.zip(max).map(|(min, max)| DateBounds { min, max }))
}

/// Distinct hospitals and unit ids present in admissions, sorted.
pub fn filter_options(conn: &Connection) -> Result<FilterOptions, DatabaseError> {
    let distinct = |column: &str| -> Result<Vec<String>, DatabaseError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT CAST({column} AS TEXT) AS value FROM admissions
             WHERE {column} IS NOT NULL ORDER BY value"
        ))?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    };

    Ok(FilterOptions {
        hospitals: distinct("hospital")?,
        units: distinct("unit_id")?,
    })
}
