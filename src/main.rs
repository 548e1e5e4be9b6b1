use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;

use hospital_ops::analytics;
use hospital_ops::config::{self, AppConfig};
use hospital_ops::db::{open_read_only, table_counts};
use hospital_ops::ingest::ensure_database;
use hospital_ops::models::AdmissionFilter;

#[derive(Debug, Parser)]
#[command(name = "hospital-ops", version, about = "Hospital resource utilization analytics")]
struct Cli {
    /// SQLite snapshot file (falls back to $HOSPITAL_OPS_DB, then hospital.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory holding the five source CSVs (falls back to $HOSPITAL_OPS_DATA_DIR, then data/)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// First admission date, inclusive (defaults to the earliest in the data)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last admission date, inclusive (defaults to the latest in the data)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Hospital to restrict to; "All" means every hospital
    #[arg(long)]
    hospital: Option<String>,
    /// Unit id to restrict to; "All" means every unit
    #[arg(long)]
    unit: Option<String>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    #[command(about = "Create and load the database if it does not exist yet")]
    Bootstrap,
    #[command(about = "Row counts per table")]
    Counts,
    #[command(about = "Earliest and latest admission date")]
    Bounds,
    #[command(about = "Hospitals and units available for filtering")]
    Options,
    #[command(about = "KPI strip: LOS, admissions/day, occupancy and bottleneck alert")]
    Summary(FilterArgs),
    #[command(about = "Average length of stay")]
    Los(FilterArgs),
    #[command(about = "Average length of stay per unit")]
    LosByUnit(FilterArgs),
    #[command(about = "Admissions per day over the window")]
    Admissions(FilterArgs),
    #[command(about = "True daily census occupancy per unit")]
    Occupancy {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the mean across units per day instead of per-unit rows
        #[arg(long)]
        daily_mean: bool,
    },
    #[command(about = "Same-day arrivals against staffed beds per unit")]
    ProxyOccupancy(FilterArgs),
    #[command(about = "Unit-days at or above the bottleneck threshold")]
    Bottlenecks(FilterArgs),
    #[command(about = "Average ED wait per triage level")]
    WaitTimes {
        #[command(flatten)]
        filter: FilterArgs,
        /// Include ward transfer lag from every unit instead of the ED only
        #[arg(long)]
        all_units: bool,
    },
    #[command(about = "Data-quality counts for the filtered admissions")]
    Quality(FilterArgs),
    #[command(about = "Filtered admissions joined with patient and unit data")]
    Drilldown(FilterArgs),
    #[command(about = "Write the drill-down table to a CSV file")]
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, short, default_value = config::DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    hospital_ops::init_tracing();
    let cli = Cli::parse();

    let base = std::env::current_dir().context("Cannot determine working directory")?;
    let app_config = AppConfig::resolve(&base, cli.db, cli.data_dir);
    tracing::debug!(
        "{} v{} using {}",
        config::APP_NAME,
        config::APP_VERSION,
        app_config.db_path.display()
    );

    let report = ensure_database(&app_config).with_context(|| {
        format!("Failed to prepare database at {}", app_config.db_path.display())
    })?;
    if let CliCommand::Bootstrap = cli.command {
        return match report {
            Some(report) => print_json(&report),
            None => {
                let conn = open_read_only(&app_config.db_path)?;
                print_json(&table_counts(&conn)?)
            }
        };
    }

    let conn = open_read_only(&app_config.db_path)
        .with_context(|| format!("Failed to open {}", app_config.db_path.display()))?;

    match cli.command {
        CliCommand::Bootstrap => Ok(()),
        CliCommand::Counts => print_json(&table_counts(&conn)?),
        CliCommand::Bounds => print_json(&analytics::date_bounds(&conn)?),
        CliCommand::Options => print_json(&analytics::filter_options(&conn)?),
        CliCommand::Summary(args) => {
            print_json(&analytics::dashboard_summary(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::Los(args) => {
            print_json(&analytics::average_los(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::LosByUnit(args) => {
            print_json(&analytics::los_by_unit(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::Admissions(args) => {
            let filter = build_filter(&conn, args)?;
            print_json(&AdmissionsOutput {
                per_day: analytics::admissions_per_day(&conn, &filter)?,
                series: analytics::admissions_over_time(&conn, &filter)?,
            })
        }
        CliCommand::Occupancy { filter, daily_mean } => {
            let rows = analytics::daily_true_occupancy(&conn, &build_filter(&conn, filter)?)?;
            if daily_mean {
                print_json(&analytics::daily_true_occupancy_mean(&rows))
            } else {
                print_json(&rows)
            }
        }
        CliCommand::ProxyOccupancy(args) => {
            print_json(&analytics::daily_proxy_occupancy(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::Bottlenecks(args) => {
            print_json(&analytics::bottlenecks(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::WaitTimes { filter, all_units } => {
            let filter = build_filter(&conn, filter)?;
            if all_units {
                print_json(&analytics::wait_by_triage(&conn, &filter)?)
            } else {
                print_json(&analytics::ed_wait_by_triage(&conn, &filter)?)
            }
        }
        CliCommand::Quality(args) => {
            print_json(&analytics::data_quality_report(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::Drilldown(args) => {
            print_json(&analytics::drilldown_rows(&conn, &build_filter(&conn, args)?)?)
        }
        CliCommand::Export { filter, output } => {
            let filter = build_filter(&conn, filter)?;
            let written = analytics::export_drilldown(&conn, &filter, &output)?;
            eprintln!("Wrote {written} rows to {}", output.display());
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct AdmissionsOutput {
    per_day: analytics::AdmissionsPerDay,
    series: Vec<analytics::DailyAdmissions>,
}

/// Missing dates fall back to the snapshot's admission date bounds.
fn build_filter(conn: &Connection, args: FilterArgs) -> Result<AdmissionFilter> {
    let bounds = analytics::date_bounds(conn)?;
    let from = args.from.or(bounds.map(|b| b.min)).or(args.to);
    let to = args.to.or(bounds.map(|b| b.max)).or(from);
    let (Some(from), Some(to)) = (from, to) else {
        bail!("No admissions with a valid admit date; pass --from and --to");
    };

    Ok(AdmissionFilter::new(from, to)?
        .with_hospital(args.hospital.as_deref())
        .with_unit(args.unit.as_deref()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
