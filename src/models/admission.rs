use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Storage format for normalized timestamps. SQLite date functions accept it as-is.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One hospital encounter. Core fact row of the snapshot.
///
/// Timestamps stay as text: values that cannot be parsed are kept verbatim so
/// they remain visible in drill-down views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub encounter_id: String,
    pub patient_id: Option<String>,
    pub hospital: Option<String>,
    pub unit_id: Option<String>,
    pub triage_level: Option<String>,
    pub admit_ts: Option<String>,
    pub discharge_ts: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub wait_minutes: Option<f64>,
}

/// Parse a timestamp in any of the accepted CSV layouts.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ACCEPTED_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Normalize a raw timestamp for storage. Unparseable input is returned unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => raw.trim().to_string(),
    }
}
