// Entry point and CLI flow.
//
// `report` runs one filter selection end to end and exports the tables,
// `options` lists what can be filtered on, and `interactive` keeps the
// dataset in memory behind a small menu so filters can be changed and the
// dashboard regenerated without reloading the file.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use once_cell::sync::OnceCell;
use ride_metrics::output;
use ride_metrics::util::{format_int, parse_date_safe};
use ride_metrics::{
    build_dashboard, load_bookings, Booking, DashboardSettings, FilterOptions, FilterSelection,
    LoadReport,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Loaded once per interactive session and only read afterwards.
static DATASET: OnceCell<Vec<Booking>> = OnceCell::new();

#[derive(Parser)]
#[command(name = "ride_metrics")]
#[command(about = "Operational analytics for ride-booking exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the dashboard for one filter selection and export it
    Report {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Directory to write CSV tables and dashboard.json into
        #[arg(short, long, env = "RIDE_OUTPUT_DIR", default_value = "dashboard")]
        out: PathBuf,

        /// Skip writing files, only print
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// List the date span, vehicle types and statuses in the data file
    Options {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Menu-driven session: load once, change filters, regenerate
    Interactive {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Bookings CSV
    #[arg(short, long, env = "RIDE_DATA_PATH", default_value = "ncr_ride_bookings.csv")]
    data: PathBuf,
}

#[derive(Args)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,

    /// Vehicle type to include; repeat for several (default: all)
    #[arg(long = "vehicle")]
    vehicles: Vec<String>,

    /// Booking status to include; repeat for several (default: all)
    #[arg(long = "status")]
    statuses: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        FilterSelection::all()
            .with_date_range(self.from, self.to)
            .with_vehicle_types(self.vehicles.iter().cloned())
            .with_statuses(self.statuses.iter().cloned())
    }
}

#[derive(Args)]
struct TuningArgs {
    /// Trailing window (days) for the smoothed trend
    #[arg(long, default_value_t = 7)]
    window: usize,

    /// Number of bins in the distance histogram
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(1..=1000))]
    bins: u16,

    /// Rows shown in trend and Pareto previews
    #[arg(long, default_value_t = 8)]
    top: usize,
}

impl TuningArgs {
    fn settings(&self) -> DashboardSettings {
        DashboardSettings {
            rolling_window: self.window,
            distance_bins: usize::from(self.bins),
        }
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date_safe(Some(s)).ok_or_else(|| format!("'{}' is not a date (expected YYYY-MM-DD)", s))
}

fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        );
    tracing_subscriber::registry().with(stderr_layer).init();
}

/// Load the data file and print the load summary. Errors here are fatal for
/// the dashboard: nothing is rendered from a file that failed validation.
fn load_with_summary(path: &Path) -> Result<Vec<Booking>> {
    let (data, report) = load_bookings(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    print_load_report(&report);
    Ok(data)
}

/// Fill `slot` from `path` unless it already holds a dataset. A failed load
/// leaves the slot empty so the user can retry.
fn load_once<'a>(slot: &'a OnceCell<Vec<Booking>>, path: &Path) -> Result<&'a [Booking]> {
    slot.get_or_try_init(|| load_with_summary(path))
        .map(Vec::as_slice)
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows read, {} loaded)",
        format_int(report.total_rows),
        format_int(report.loaded_rows)
    );
    if report.dropped_rows > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            format_int(report.dropped_rows)
        );
    }
    println!(
        "Missing values: time {}, fare {}, arrival {}, distance {}\n",
        format_int(report.missing_time),
        format_int(report.missing_fare),
        format_int(report.missing_arrival),
        format_int(report.missing_distance)
    );
}

fn print_options(opts: Option<&FilterOptions>) {
    let Some(opts) = opts else {
        println!("(dataset is empty)\n");
        return;
    };
    println!("Analysis Period: {} to {}", opts.min_date, opts.max_date);
    println!("Vehicle Segments: {}", opts.vehicle_types.join(", "));
    println!("Status Categories: {}\n", opts.statuses.join(", "));
}

fn run_report(
    data_path: &Path,
    selection: FilterSelection,
    tuning: &TuningArgs,
    out: &Path,
    export: bool,
) -> Result<()> {
    let data = load_with_summary(data_path)?;
    let dash = build_dashboard(&data, &selection, tuning.settings());
    output::print_dashboard(&dash, tuning.top);
    if export {
        let files = output::export_dashboard(out, &dash)?;
        println!("(Full tables exported to {})", out.display());
        for f in files {
            println!("  - {}", f.display());
        }
    }
    Ok(())
}

const EXIT_CHOICE: &str = "5";

/// One trimmed line of input, or `None` once the input is closed.
fn read_answer<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_answer(&mut io::stdin().lock())
}

/// End of input counts as choosing Exit.
fn menu_choice(answer: Option<String>) -> String {
    answer.unwrap_or_else(|| EXIT_CHOICE.to_string())
}

/// Ask whether to go back to the menu after a dashboard was generated.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn prompt_date(label: &str, slot: &mut Option<NaiveDate>) {
    while let Some(answer) = prompt(label) {
        match answer.as_str() {
            "" => return,
            "*" => {
                *slot = None;
                return;
            }
            s => match parse_date_safe(Some(s)) {
                Some(d) => {
                    *slot = Some(d);
                    return;
                }
                None => println!("Not a date, use YYYY-MM-DD."),
            },
        }
    }
}

/// Ask for each filter axis. A blank answer keeps the current value, `*`
/// clears it.
fn prompt_filters(current: &FilterSelection) -> FilterSelection {
    let mut next = current.clone();

    prompt_date("From date (YYYY-MM-DD, blank keeps, * clears): ", &mut next.from);
    prompt_date("To date (YYYY-MM-DD, blank keeps, * clears): ", &mut next.to);

    let vehicles = prompt("Vehicle types (comma separated, blank keeps, * = all): ");
    match vehicles.as_deref().unwrap_or_default() {
        "" => {}
        "*" => next.vehicle_types = None,
        s => next = next.with_vehicle_types(split_list(s)),
    }
    let statuses = prompt("Statuses (comma separated, blank keeps, * = all): ");
    match statuses.as_deref().unwrap_or_default() {
        "" => {}
        "*" => next.statuses = None,
        s => next = next.with_statuses(split_list(s)),
    }
    println!("Filters: {}\n", next.describe());
    next
}

fn run_interactive(data_path: &Path, tuning: &TuningArgs) {
    let mut selection = FilterSelection::all();
    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Show filter options");
        println!("[3] Set filters");
        println!("[4] Generate dashboard");
        println!("[5] Exit\n");
        let choice = menu_choice(prompt("Enter choice: "));
        match choice.as_str() {
            "1" => {
                if DATASET.get().is_some() {
                    println!("Data already loaded.\n");
                    continue;
                }
                match load_once(&DATASET, data_path) {
                    Ok(data) => {
                        if let Some(opts) = FilterOptions::from_bookings(data) {
                            selection = opts.default_selection();
                        }
                    }
                    Err(e) => {
                        error!(error = %format!("{:#}", e), "load failed");
                        eprintln!("Failed to load file: {:#}\n", e);
                    }
                }
            }
            "2" | "3" | "4" => {
                let Some(data) = DATASET.get() else {
                    println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
                    continue;
                };
                match choice.as_str() {
                    "2" => print_options(FilterOptions::from_bookings(data).as_ref()),
                    "3" => selection = prompt_filters(&selection),
                    _ => {
                        println!();
                        let dash = build_dashboard(data, &selection, tuning.settings());
                        output::print_dashboard(&dash, tuning.top);
                        if !prompt_back_to_menu() {
                            println!("Exiting the program.");
                            break;
                        }
                    }
                }
            }
            EXIT_CHOICE => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1-5.\n"),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report {
            data,
            filters,
            tuning,
            out,
            no_export,
        } => {
            let selection = filters.selection();
            info!(selection = %selection.describe(), "building dashboard");
            if let Err(e) = run_report(&data.data, selection, &tuning, &out, !no_export) {
                error!(error = %format!("{:#}", e), "report failed");
                return Err(e);
            }
        }
        Commands::Options { data } => {
            let bookings = load_with_summary(&data.data)?;
            print_options(FilterOptions::from_bookings(&bookings).as_ref());
        }
        Commands::Interactive { data, tuning } => run_interactive(&data.data, &tuning),
    }
    Ok(())
}
