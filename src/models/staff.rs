use serde::{Deserialize, Serialize};

/// Scheduled headcount for one shift of one unit on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffShift {
    pub date: String,
    pub hospital: String,
    pub unit_id: String,
    pub shift: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub scheduled_staff: Option<i64>,
}
