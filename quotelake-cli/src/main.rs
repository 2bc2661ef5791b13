//! quotelake CLI: one subcommand per pipeline invocation, plus inspection.
//!
//! Commands:
//! - `extract`: fetch the latest daily window for `TICKER` into the raw zone
//! - `start-job`: turn a storage notification into one transform run
//! - `transform`: run the transform directly with `--NAME value` job arguments
//! - `catalog`: inspect tables and partitions
//! - `runs`: show the job-run ledger

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quotelake_core::catalog::{Catalog, FileCatalog};
use quotelake_core::config::{env_lookup, ExtractorSettings, JobStarterSettings, PlatformConfig};
use quotelake_core::data::YahooSource;
use quotelake_core::extractor::Extractor;
use quotelake_core::job_starter::{JobStarter, StorageEvent};
use quotelake_core::jobs::{parse_argv, LocalJobRunner, RunLedger, SOURCE_PATH_ARG};
use quotelake_core::storage::LocalObjectStore;
use quotelake_core::transform::{TransformJob, TransformSettings};
use quotelake_core::InvocationResponse;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quotelake", about = "quotelake: daily quote extraction and refinement")]
struct Cli {
    /// Platform config (storage root, catalog root, run ledger, jobs).
    #[arg(
        long,
        global = true,
        env = "QUOTELAKE_CONFIG",
        default_value = "quotelake.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest daily window for TICKER and write it to BUCKET_NAME's raw zone.
    Extract,
    /// Start GLUE_JOB_NAME for the object named in a storage notification.
    StartJob {
        /// Notification JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },
    /// Run the transform with job arguments; all five are required: `--JOB_NAME`,
    /// `--s3_source_path`, `--REFINED_BUCKET_PATH`, `--GLUE_CATALOG_DB_NAME`,
    /// `--GLUE_CATALOG_TABLE_NAME`.
    Transform {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
    /// Catalog inspection commands.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show the latest state of every recorded job run.
    Runs {
        /// Print every state transition instead of the latest per run.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print a table's definition.
    Table {
        #[arg(long)]
        database: String,
        #[arg(long)]
        table: String,
    },
    /// List a table's registered partitions.
    Partitions {
        #[arg(long)]
        database: String,
        #[arg(long)]
        table: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let platform = PlatformConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Extract => run_extract(&platform),
        Commands::StartJob { event } => run_start_job(&platform, &event),
        Commands::Transform { args } => run_transform(&platform, &args),
        Commands::Catalog { action } => run_catalog(&platform, action),
        Commands::Runs { all } => run_runs(&platform, all),
    }
}

fn print_response(response: &InvocationResponse) -> Result<()> {
    println!("{}", serde_json::to_string(response)?);
    Ok(())
}

fn run_extract(platform: &PlatformConfig) -> Result<()> {
    let settings = ExtractorSettings::from_env()?;
    let source = YahooSource::new()?;
    let store = LocalObjectStore::new(&platform.storage_root);

    let outcome = Extractor::new(settings, &source, &store).run()?;
    print_response(&outcome.response())
}

/// Settings first, so a missing `GLUE_JOB_NAME` fails before the event is touched.
fn load_start_job(
    lookup: impl Fn(&str) -> Option<String>,
    event_path: &Path,
) -> Result<(JobStarterSettings, StorageEvent)> {
    let settings = JobStarterSettings::from_lookup(lookup)?;

    let json = if event_path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(event_path)
            .with_context(|| format!("reading {}", event_path.display()))?
    };
    Ok((settings, StorageEvent::from_json(&json)?))
}

fn run_start_job(platform: &PlatformConfig, event_path: &Path) -> Result<()> {
    let (settings, event) = load_start_job(env_lookup, event_path)?;

    let store = LocalObjectStore::new(&platform.storage_root);
    let catalog = FileCatalog::new(&platform.catalog_root);
    let transform = TransformJob::new(&store, &catalog);
    let runner = LocalJobRunner::new(
        platform.jobs.clone(),
        &transform,
        RunLedger::new(&platform.run_ledger),
    );

    let (_, response) = JobStarter::new(settings, &runner).handle(&event)?;
    print_response(&response)
}

fn transform_settings(args: &[String]) -> Result<TransformSettings> {
    Ok(TransformSettings::from_arguments(&parse_argv(args)?)?)
}

fn run_transform(platform: &PlatformConfig, args: &[String]) -> Result<()> {
    let settings = transform_settings(args)?;

    let store = LocalObjectStore::new(&platform.storage_root);
    let catalog = FileCatalog::new(&platform.catalog_root);
    let report = TransformJob::new(&store, &catalog).execute(&settings)?;

    for partition in &report.partitions {
        println!("{}\t{} rows", partition.location, partition.rows);
    }
    println!("{}", report.summary());
    Ok(())
}

fn run_catalog(platform: &PlatformConfig, action: CatalogAction) -> Result<()> {
    let catalog = FileCatalog::new(&platform.catalog_root);

    match action {
        CatalogAction::Table { database, table } => {
            let Some(metadata) = catalog.get_table(&database, &table)? else {
                bail!("table {database}.{table} is not registered");
            };
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        CatalogAction::Partitions { database, table } => {
            let partitions = catalog.list_partitions(&database, &table)?;
            if partitions.is_empty() {
                println!("No partitions registered for {database}.{table}.");
                return Ok(());
            }
            println!("{:<40} {:>6}  LOCATION", "VALUES", "ROWS");
            for p in &partitions {
                println!("{:<40} {:>6}  {}", p.values.join("/"), p.row_count, p.location);
            }
        }
    }
    Ok(())
}

fn run_runs(platform: &PlatformConfig, all: bool) -> Result<()> {
    let ledger = RunLedger::new(&platform.run_ledger);
    let records = if all {
        ledger.records()?
    } else {
        let mut latest: Vec<_> = ledger.latest()?.into_values().collect();
        latest.sort_by_key(|r| r.at);
        latest
    };

    if records.is_empty() {
        println!("No job runs recorded in {}.", ledger.path().display());
        return Ok(());
    }

    for r in &records {
        let source = r
            .arguments
            .get(SOURCE_PATH_ARG)
            .map(String::as_str)
            .unwrap_or("-");
        println!(
            "{}  {:<9}  {}  {}  {}",
            r.at.format("%Y-%m-%d %H:%M:%S"),
            format!("{:?}", r.state).to_uppercase(),
            r.run_id,
            r.job_name,
            source
        );
        if let Some(message) = &r.message {
            println!("    {message}");
        }
    }
    Ok(())
}
