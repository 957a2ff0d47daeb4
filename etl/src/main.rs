//! Shipload CLI - populate the shipments table from shipping extracts
//!
//! # Main Command
//!
//! ```bash
//! shipload run                          # data/*.csv → shipment_database.db
//! shipload run --data-dir extracts --database out.db --table shipments
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! shipload parse data/shipping_data_0.csv          # CSV rows as JSON
//! shipload map data/shipping_data_0.csv            # Direct Mapper output
//! shipload reconcile data/shipping_data_1.csv data/shipping_data_2.csv
//! shipload count                                   # rows in the destination table
//! ```

use clap::{Args, Parser, Subcommand};
use shipload::logs::{log_error, log_success, log_warning, LOG_BROADCASTER};
use shipload::{
    map_direct, populate, reconcile_with_stats, CsvLoader, Loader, RunOptions, ShipmentStore,
    SourceNames,
};
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shipload")]
#[command(about = "Populate a SQLite shipments table from shipping CSV extracts", long_about = None)]
struct Cli {
    /// Only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database file
    #[arg(long, env = "SHIPLOAD_DATABASE", default_value = "shipment_database.db")]
    database: PathBuf,

    /// Destination table
    #[arg(long, env = "SHIPLOAD_TABLE", default_value = "shipments")]
    table: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the three extracts and append them to the destination table
    Run {
        /// Directory holding the CSV extracts
        #[arg(long, env = "SHIPLOAD_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        #[command(flatten)]
        store: StoreArgs,

        /// Self-contained shipments source
        #[arg(long, default_value = "shipping_data_0.csv")]
        self_contained: String,

        /// Route fragment source
        #[arg(long, default_value = "shipping_data_1.csv")]
        routes: String,

        /// Status fragment source
        #[arg(long, default_value = "shipping_data_2.csv")]
        statuses: String,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map a self-contained CSV into shipment records
    Map {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Join and aggregate a route CSV with a status CSV
    Reconcile {
        /// Route fragment CSV
        routes: PathBuf,

        /// Status fragment CSV
        statuses: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count rows in the destination table
    Count {
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOG_BROADCASTER.set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            data_dir,
            store,
            self_contained,
            routes,
            statuses,
            json,
        } => {
            let options = RunOptions {
                data_dir,
                database: store.database,
                table: store.table,
                sources: SourceNames {
                    self_contained,
                    routes,
                    statuses,
                },
            };
            cmd_run(&options, json)
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Map { input, output } => cmd_map(&input, output.as_deref()),

        Commands::Reconcile {
            routes,
            statuses,
            output,
        } => cmd_reconcile(&routes, &statuses, output.as_deref()),

        Commands::Count { store } => cmd_count(&store.database, &store.table),
    };

    if let Err(e) = result {
        LOG_BROADCASTER.set_quiet(false);
        log_error(format!("Error: {}", e));
        let mut source = e.source();
        while let Some(cause) = source {
            log_error(format!("  caused by: {}", cause));
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn cmd_run(options: &RunOptions, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = populate(options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Run {}", summary.run_id);
        println!("  Self-contained records: {}", summary.direct_count);
        println!("  Aggregated records:     {}", summary.aggregated_count);
        println!("  Total inserted:         {}", summary.total);
    }
    Ok(())
}

/// Loads a standalone file through the CSV loader.
fn load_file(path: &Path) -> Result<shipload::TabularData, shipload::LoadError> {
    CsvLoader::new(".").load(&path.to_string_lossy())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_file(input)?;
    log_success(format!(
        "Parsed {} records ({}, delimiter '{}')",
        table.len(),
        table.encoding,
        format_delimiter(table.delimiter)
    ));

    let json = serde_json::to_string_pretty(&table.to_json_records())?;
    write_output(&json, output)
}

fn cmd_map(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_file(input)?;
    let records = map_direct(&table)?;
    log_success(format!("Mapped {} records", records.len()));

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)
}

fn cmd_reconcile(
    routes: &Path,
    statuses: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let routes = load_file(routes)?;
    let statuses = load_file(statuses)?;

    let result = reconcile_with_stats(&routes, &statuses)?;
    log_success(format!(
        "Merged {} records into {} unique shipments",
        result.joined_rows,
        result.records.len()
    ));
    if result.unmatched_routes + result.unmatched_statuses > 0 {
        log_warning(format!(
            "Dropped {} route and {} status record(s) without a match",
            result.unmatched_routes, result.unmatched_statuses
        ));
    }

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

fn cmd_count(database: &Path, table: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ShipmentStore::open(database)?;
    let count = store.count(table)?;
    store.close()?;

    println!("{}", count);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log_success(format!("Output written to: {}", p.display()));
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
