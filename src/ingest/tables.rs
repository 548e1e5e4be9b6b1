use rusqlite::{params, Statement};
use serde::de::DeserializeOwned;

use crate::models::*;

/// A snapshot table that can be populated from its CSV file.
///
/// CSV headers must name every column in `COLUMNS`; extra headers are ignored.
pub trait TableRecord: DeserializeOwned {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const INSERT_SQL: &'static str;

    /// Rows without their natural key cannot be stored and count as malformed.
    fn has_key(&self) -> bool;

    /// Bind and execute `INSERT_SQL`. Returns 0 when the key already exists.
    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

impl TableRecord for Patient {
    const TABLE: &'static str = "patients";
    const COLUMNS: &'static [&'static str] =
        &["patient_id", "mrn", "age", "gender", "primary_condition"];
    const INSERT_SQL: &'static str = "INSERT OR IGNORE INTO patients
         (patient_id, mrn, age, gender, primary_condition) VALUES (?1, ?2, ?3, ?4, ?5)";

    fn has_key(&self) -> bool {
        present(&self.patient_id)
    }

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.patient_id.trim(),
            self.mrn,
            self.age,
            self.gender,
            self.primary_condition,
        ])
    }
}

impl TableRecord for Unit {
    const TABLE: &'static str = "units";
    const COLUMNS: &'static [&'static str] = &["unit_id", "unit_name"];
    const INSERT_SQL: &'static str =
        "INSERT OR IGNORE INTO units (unit_id, unit_name) VALUES (?1, ?2)";

    fn has_key(&self) -> bool {
        present(&self.unit_id)
    }

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.unit_id.trim(), self.unit_name])
    }
}

impl TableRecord for BedCapacity {
    const TABLE: &'static str = "bed_capacity";
    const COLUMNS: &'static [&'static str] = &["hospital", "unit_id", "baseline_staffed_beds"];
    const INSERT_SQL: &'static str = "INSERT OR IGNORE INTO bed_capacity
         (hospital, unit_id, baseline_staffed_beds) VALUES (?1, ?2, ?3)";

    fn has_key(&self) -> bool {
        present(&self.hospital) && present(&self.unit_id)
    }

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.hospital.trim(),
            self.unit_id.trim(),
            self.baseline_staffed_beds,
        ])
    }
}

impl TableRecord for StaffShift {
    const TABLE: &'static str = "staff";
    const COLUMNS: &'static [&'static str] =
        &["date", "hospital", "unit_id", "shift", "scheduled_staff"];
    const INSERT_SQL: &'static str = "INSERT OR IGNORE INTO staff
         (date, hospital, unit_id, shift, scheduled_staff) VALUES (?1, ?2, ?3, ?4, ?5)";

    fn has_key(&self) -> bool {
        present(&self.date)
            && present(&self.hospital)
            && present(&self.unit_id)
            && present(&self.shift)
    }

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.date.trim(),
            self.hospital.trim(),
            self.unit_id.trim(),
            self.shift.trim(),
            self.scheduled_staff,
        ])
    }
}

impl TableRecord for Admission {
    const TABLE: &'static str = "admissions";
    const COLUMNS: &'static [&'static str] = &[
        "encounter_id",
        "patient_id",
        "hospital",
        "unit_id",
        "triage_level",
        "admit_ts",
        "discharge_ts",
        "wait_minutes",
    ];
    const INSERT_SQL: &'static str = "INSERT OR IGNORE INTO admissions
         (encounter_id, patient_id, hospital, unit_id, triage_level,
          admit_ts, discharge_ts, wait_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

    fn has_key(&self) -> bool {
        present(&self.encounter_id)
    }

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.encounter_id.trim(),
            self.patient_id,
            self.hospital,
            self.unit_id,
            self.triage_level,
            self.admit_ts.as_deref().map(normalize_timestamp),
            self.discharge_ts.as_deref().map(normalize_timestamp),
            self.wait_minutes,
        ])
    }
}
