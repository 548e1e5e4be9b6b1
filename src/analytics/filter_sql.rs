use rusqlite::types::ToSql;

use crate::models::AdmissionFilter;

/// Stay is usable for LOS: both timestamps parse and discharge is not before admit.
pub(super) const VALID_STAY: &str = "(julianday(a.admit_ts) IS NOT NULL
     AND julianday(a.discharge_ts) IS NOT NULL
     AND julianday(a.discharge_ts) >= julianday(a.admit_ts))";

/// Either timestamp is absent or unparseable.
pub(super) const MISSING_TIMESTAMP: &str =
    "(julianday(a.admit_ts) IS NULL OR julianday(a.discharge_ts) IS NULL)";

pub(super) const DISCHARGE_BEFORE_ADMIT: &str =
    "(julianday(a.discharge_ts) < julianday(a.admit_ts))";

pub(super) const LOS_HOURS: &str = "((julianday(a.discharge_ts) - julianday(a.admit_ts)) * 24.0)";

/// `wait_minutes` as a number, NULL when absent or stored as text.
pub(super) const WAIT_MINUTES: &str =
    "(CASE WHEN typeof(a.wait_minutes) IN ('integer', 'real') THEN a.wait_minutes END)";

/// Builds the WHERE fragments for an [`AdmissionFilter`].
///
/// Only a fixed set of predicates exists (admit-date window, hospital, unit).
/// Values are always bound through named parameters; the only text spliced
/// into SQL is column names supplied by this crate. Each statement gets its
/// own builder so the bound parameter set matches what the SQL references.
pub(super) struct FilterQuery {
    date_from: String,
    date_to: String,
    hospital: Option<String>,
    unit: Option<String>,
    used: Vec<&'static str>,
}

impl FilterQuery {
    pub(super) fn new(filter: &AdmissionFilter) -> Self {
        Self {
            date_from: filter.date_from().to_string(),
            date_to: filter.date_to().to_string(),
            hospital: filter.hospital().map(str::to_string),
            unit: filter.unit().map(str::to_string),
            used: Vec::new(),
        }
    }

    fn mark(&mut self, name: &'static str) {
        if !self.used.contains(&name) {
            self.used.push(name);
        }
    }

    /// ` AND date(<column>) >= :date_from AND date(<column>) <= :date_to`
    pub(super) fn admit_window(&mut self, column: &str) -> String {
        self.mark(":date_from");
        self.mark(":date_to");
        format!(" AND date({column}) >= :date_from AND date({column}) <= :date_to")
    }

    /// Hospital/unit equality on the table aliased `alias`; empty when unrestricted.
    pub(super) fn location(&mut self, alias: &str) -> String {
        let mut sql = String::new();
        if self.hospital.is_some() {
            self.mark(":hospital");
            sql.push_str(&format!(" AND {alias}.hospital = :hospital"));
        }
        if self.unit.is_some() {
            self.mark(":unit");
            sql.push_str(&format!(" AND {alias}.unit_id = :unit"));
        }
        sql
    }

    /// Recursive CTE body yielding one `day` row per calendar day in the window.
    pub(super) fn census_days(&mut self) -> String {
        self.mark(":date_from");
        self.mark(":date_to");
        "days(day) AS (
             SELECT :date_from
             UNION ALL
             SELECT date(day, '+1 day') FROM days WHERE day < :date_to
         )"
        .to_string()
    }

    pub(super) fn params(&self) -> Vec<(&str, &dyn ToSql)> {
        self.used
            .iter()
            .filter_map(|name| {
                let value: &dyn ToSql = match *name {
                    ":date_from" => &self.date_from,
                    ":date_to" => &self.date_to,
                    ":hospital" => self.hospital.as_ref()?,
                    ":unit" => self.unit.as_ref()?,
                    _ => return None,
                };
                Some((*name, value))
            })
            .collect()
    }
}
