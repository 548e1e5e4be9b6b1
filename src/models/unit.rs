use serde::{Deserialize, Serialize};

/// Reference row for a care unit (ED, ICU, MedSurg, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: String,
    pub unit_name: Option<String>,
}

/// Static staffed-bed baseline for one unit at one hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedCapacity {
    pub hospital: String,
    pub unit_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub baseline_staffed_beds: Option<i64>,
}
