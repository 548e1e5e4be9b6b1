use serde::{Deserialize, Serialize};

/// One synthetic patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub mrn: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub primary_condition: Option<String>,
}
