use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{BOTTLENECK_THRESHOLD_PCT, PROXY_RATIO_CAP};
use crate::models::{AdmissionFilter, OccupancyBasis, QualityFlag};

/// Average length of stay with its denominator spelled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LosSummary {
    /// Admissions matching the filter.
    pub encounters: i64,
    /// Admissions that contributed to the mean.
    pub valid: i64,
    pub missing_timestamp: i64,
    pub discharge_before_admit: i64,
    /// `None` when no admission in scope has a valid stay.
    pub avg_hours: Option<f64>,
    pub avg_days: Option<f64>,
}

impl LosSummary {
    pub fn excluded(&self) -> i64 {
        self.missing_timestamp + self.discharge_before_admit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionsPerDay {
    pub admissions: i64,
    /// Calendar days in the filter window, both ends included.
    pub days_in_range: i64,
    /// Distinct admit dates in the window. The KPI denominator.
    pub active_days: i64,
    /// Admissions over active days; 0 when nothing matches.
    pub avg_per_day: f64,
    /// Admissions over every calendar day in the window, quiet days included.
    pub avg_per_calendar_day: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAdmissions {
    pub date: NaiveDate,
    pub admissions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitLos {
    pub unit_id: Option<String>,
    pub valid: i64,
    pub excluded: i64,
    pub avg_hours: Option<f64>,
}

/// One (hospital, unit, day) occupancy reading.
///
/// `occupied` is the point-in-time census for [`OccupancyBasis::TrueCensus`]
/// and same-day arrivals for [`OccupancyBasis::Proxy`]. Bottlenecks are only
/// ever flagged on the true census.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyRow {
    pub basis: OccupancyBasis,
    pub hospital: String,
    pub unit_id: String,
    pub date: NaiveDate,
    pub occupied: i64,
    /// `None` when the unit has no positive bed baseline.
    pub staffed_beds: Option<i64>,
    /// Unclipped percentage. Can exceed 100.
    pub occupancy_pct: Option<f64>,
    /// Percentage clipped to [0, 100] for display.
    pub display_pct: Option<f64>,
    pub bottleneck: bool,
}

impl OccupancyRow {
    pub fn new(
        basis: OccupancyBasis,
        hospital: String,
        unit_id: String,
        date: NaiveDate,
        occupied: i64,
        staffed_beds: Option<i64>,
    ) -> Self {
        let occupancy_pct = occupancy_pct(occupied, staffed_beds);
        let bottleneck =
            basis == OccupancyBasis::TrueCensus && occupancy_pct.is_some_and(is_bottleneck);
        Self {
            basis,
            hospital,
            unit_id,
            date,
            occupied,
            staffed_beds,
            occupancy_pct,
            display_pct: occupancy_pct.map(clip_for_display),
            bottleneck,
        }
    }

    /// Occupied/beds ratio capped at [`PROXY_RATIO_CAP`], as averaged into the proxy KPI.
    pub fn capped_ratio(&self) -> Option<f64> {
        self.occupancy_pct.map(|pct| (pct / 100.0).min(PROXY_RATIO_CAP))
    }
}

/// Raw occupancy percentage; `None` when there is no positive bed baseline.
pub fn occupancy_pct(occupied: i64, staffed_beds: Option<i64>) -> Option<f64> {
    match staffed_beds {
        Some(beds) if beds > 0 => Some(occupied.max(0) as f64 * 100.0 / beds as f64),
        _ => None,
    }
}

pub fn clip_for_display(pct: f64) -> f64 {
    pct.clamp(0.0, 100.0)
}

pub fn is_bottleneck(pct: f64) -> bool {
    pct >= BOTTLENECK_THRESHOLD_PCT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOccupancyMean {
    pub date: NaiveDate,
    pub mean_occupancy_pct: f64,
    /// Units with a bed baseline that contributed to the mean.
    pub units_reporting: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageWait {
    pub triage_level: String,
    pub avg_wait_minutes: f64,
    pub encounters: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaitTimeReport {
    pub levels: Vec<TriageWait>,
    /// Admissions matching the filter.
    pub encounters: i64,
    /// Admissions averaged into some triage level.
    pub included: i64,
    /// Null, non-numeric or negative waits.
    pub excluded_invalid_wait: i64,
    /// Valid wait but no triage level to group by.
    pub excluded_missing_triage: i64,
}

/// Filtered admission joined with patient and unit reference data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDownRow {
    /// `None` only in databases built outside the loader.
    pub encounter_id: Option<String>,
    pub patient_id: Option<String>,
    pub mrn: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub primary_condition: Option<String>,
    pub hospital: Option<String>,
    pub unit_id: Option<String>,
    /// Reference name, or the unknown-unit sentinel for orphan unit ids.
    pub unit_name: String,
    pub triage_level: Option<String>,
    pub admit_ts: Option<String>,
    pub discharge_ts: Option<String>,
    pub wait_minutes: Option<f64>,
    /// `None` whenever the stay is excluded from LOS.
    pub los_hours: Option<f64>,
    pub quality_flags: Vec<QualityFlag>,
}

impl DrillDownRow {
    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.quality_flags.contains(&flag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnitKey {
    pub hospital: String,
    pub unit_id: String,
}

/// Counts of data-quality problems among the filtered admissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub encounters: i64,
    pub missing_encounter_id: i64,
    pub missing_timestamp: i64,
    pub discharge_before_admit: i64,
    pub invalid_wait: i64,
    pub missing_triage: i64,
    pub unknown_unit: i64,
    pub unknown_patient: i64,
    /// (hospital, unit) pairs in scope with no positive bed baseline.
    pub units_without_capacity: Vec<UnitKey>,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.missing_encounter_id == 0
            && self.missing_timestamp == 0
            && self.discharge_before_admit == 0
            && self.invalid_wait == 0
            && self.missing_triage == 0
            && self.unknown_unit == 0
            && self.unknown_patient == 0
            && self.units_without_capacity.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub hospitals: Vec<String>,
    pub units: Vec<String>,
}

/// The dashboard KPI strip for one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub filter: AdmissionFilter,
    pub filtered_encounters: i64,
    pub los: LosSummary,
    pub admissions_per_day: AdmissionsPerDay,
    pub avg_proxy_occupancy_pct: Option<f64>,
    pub avg_true_occupancy_pct: Option<f64>,
    /// Average true occupancy over the period is at or above the bottleneck threshold.
    pub bottleneck_alert: bool,
    /// (hospital, unit, day) tuples flagged as bottlenecks.
    pub bottleneck_days: usize,
}
