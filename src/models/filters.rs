use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::db::DatabaseError;

/// Dropdown value meaning "no restriction".
pub const ALL_CHOICE: &str = "All";

/// The one filter shape every aggregation accepts.
///
/// The date window is inclusive on both ends and applies to the calendar date
/// of `admit_ts`. Hospital and unit are optional equality restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionFilter {
    date_from: NaiveDate,
    date_to: NaiveDate,
    hospital: Option<String>,
    unit: Option<String>,
}

impl AdmissionFilter {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self, DatabaseError> {
        if date_to < date_from {
            return Err(DatabaseError::InvalidFilter(format!(
                "date range ends ({date_to}) before it starts ({date_from})"
            )));
        }
        Ok(Self {
            date_from,
            date_to,
            hospital: None,
            unit: None,
        })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            date_from: day,
            date_to: day,
            hospital: None,
            unit: None,
        }
    }

    /// Restrict to one hospital. `"All"` or an empty value clears the restriction.
    pub fn with_hospital(mut self, hospital: Option<&str>) -> Self {
        self.hospital = normalize_choice(hospital);
        self
    }

    /// Restrict to one unit. `"All"` or an empty value clears the restriction.
    pub fn with_unit(mut self, unit: Option<&str>) -> Self {
        self.unit = normalize_choice(unit);
        self
    }

    pub fn date_from(&self) -> NaiveDate {
        self.date_from
    }

    pub fn date_to(&self) -> NaiveDate {
        self.date_to
    }

    pub fn hospital(&self) -> Option<&str> {
        self.hospital.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Number of calendar days in the window, both ends included.
    pub fn days_in_range(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }

    /// Every calendar day in the window, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut next = Some(self.date_from);
        std::iter::from_fn(move || {
            let day = next?;
            next = day
                .checked_add_days(Days::new(1))
                .filter(|d| *d <= self.date_to);
            Some(day)
        })
    }
}

fn normalize_choice(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL_CHOICE) {
        None
    } else {
        Some(value.to_string())
    }
}
