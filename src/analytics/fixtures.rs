//! Shared setup for the aggregation tests.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::db::open_memory_database;
use crate::models::AdmissionFilter;

pub(crate) fn setup_db() -> Connection {
    open_memory_database().expect("Failed to open test DB")
}

pub(crate) fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub(crate) fn window(from: NaiveDate, to: NaiveDate) -> AdmissionFilter {
    AdmissionFilter::new(from, to).unwrap()
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_admission(
    conn: &Connection,
    id: &str,
    patient_id: Option<&str>,
    hospital: &str,
    unit_id: &str,
    triage: Option<&str>,
    admit: Option<&str>,
    discharge: Option<&str>,
    wait: Option<f64>,
) {
    conn.execute(
        "INSERT INTO admissions (encounter_id, patient_id, hospital, unit_id, triage_level,
         admit_ts, discharge_ts, wait_minutes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, patient_id, hospital, unit_id, triage, admit, discharge, wait],
    )
    .unwrap();
}

/// Admission with only the fields occupancy and LOS care about.
pub(crate) fn insert_stay(
    conn: &Connection,
    id: &str,
    hospital: &str,
    unit_id: &str,
    admit: &str,
    discharge: Option<&str>,
) {
    insert_admission(conn, id, None, hospital, unit_id, None, Some(admit), discharge, None);
}

pub(crate) fn insert_beds(conn: &Connection, hospital: &str, unit_id: &str, beds: Option<i64>) {
    conn.execute(
        "INSERT INTO bed_capacity (hospital, unit_id, baseline_staffed_beds) VALUES (?1, ?2, ?3)",
        params![hospital, unit_id, beds],
    )
    .unwrap();
}

pub(crate) fn insert_unit(conn: &Connection, unit_id: &str, name: &str) {
    conn.execute(
        "INSERT INTO units (unit_id, unit_name) VALUES (?1, ?2)",
        params![unit_id, name],
    )
    .unwrap();
}

pub(crate) fn insert_patient(conn: &Connection, patient_id: &str, age: i64, condition: &str) {
    conn.execute(
        "INSERT INTO patients (patient_id, mrn, age, gender, primary_condition)
         VALUES (?1, ?2, ?3, 'F', ?4)",
        params![patient_id, format!("MRN-{patient_id}"), age, condition],
    )
    .unwrap();
}
