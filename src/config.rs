use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "hospital-ops";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the database file location.
pub const DB_PATH_ENV: &str = "HOSPITAL_OPS_DB";
/// Environment variable overriding the CSV directory.
pub const DATA_DIR_ENV: &str = "HOSPITAL_OPS_DATA_DIR";

pub const DEFAULT_DB_FILE: &str = "hospital.db";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_EXPORT_FILE: &str = "filtered_encounters.csv";

/// Unclipped true occupancy at or above this percentage marks a bottleneck.
pub const BOTTLENECK_THRESHOLD_PCT: f64 = 85.0;

/// Proxy (arrivals / beds) ratios are capped here before averaging into the KPI.
pub const PROXY_RATIO_CAP: f64 = 1.2;

/// Unit id of the emergency department; triage waits are only meaningful there.
pub const ED_UNIT_ID: &str = "ED";

/// Sentinel shown for admissions whose unit id has no reference row.
pub const UNKNOWN_UNIT_LABEL: &str = "Unknown unit";

/// Default tracing filter when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "hospital_ops=info,warn"
}

/// Where the snapshot database and its CSV sources live.
///
/// Passed explicitly to everything that touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn new(db_path: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Resolve paths relative to `base`: explicit values first, then the
    /// environment, then `hospital.db` / `data/`.
    pub fn resolve(base: &Path, db_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        let db_path = db_path
            .or_else(|| std::env::var_os(DB_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        let data_dir = data_dir
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self {
            db_path: base.join(db_path),
            data_dir: base.join(data_dir),
        }
    }

    /// CSV source file for one snapshot table.
    pub fn csv_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_win_and_are_joined_to_base() {
        let config = AppConfig::resolve(
            Path::new("/srv/ops"),
            Some(PathBuf::from("snap.db")),
            Some(PathBuf::from("/abs/csv")),
        );
        assert_eq!(config.db_path, PathBuf::from("/srv/ops/snap.db"));
        // Joining an absolute path replaces the base.
        assert_eq!(config.data_dir, PathBuf::from("/abs/csv"));
    }

    #[test]
    fn csv_path_uses_table_name() {
        let config = AppConfig::new("/tmp/h.db", "/tmp/data");
        assert_eq!(config.csv_path("bed_capacity"), PathBuf::from("/tmp/data/bed_capacity.csv"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn bottleneck_threshold_is_85_percent() {
        assert_eq!(BOTTLENECK_THRESHOLD_PCT, 85.0);
    }
}
