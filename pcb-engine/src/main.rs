//! Benchmark engine CLI
//!
//! Loads a data store fixture, runs one pipeline view and prints it as
//! JSON on stdout. Logs go to stderr, or to `logging.file` when configured.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pcb_common::config::{ConfigResolver, PcbConfig};
use pcb_engine::blend::{self, BlendConfig, BlendMethod, YearConfig};
use pcb_engine::models::{flatten_record, lift_flat_record, AggregatedRecord, RawRow};
use pcb_engine::query::RecordFilter;
use pcb_engine::store::InMemoryDataStore;
use pcb_engine::BenchmarkService;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for pcb-engine
#[derive(Parser, Debug)]
#[command(name = "pcb-engine")]
#[command(about = "Physician compensation survey benchmark engine")]
#[command(version)]
struct Args {
    /// JSON data store fixture
    #[arg(short, long, env = "PCB_DATA")]
    data: PathBuf,

    /// Config file (overrides PCB_CONFIG and the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregated benchmark records
    Aggregate {
        /// Partition records by survey year
        #[arg(long)]
        by_year: bool,
        /// Emit flat-field records (`tcc_p50`, `wrvu_n_incumbents`, ...)
        #[arg(long)]
        flat: bool,
    },
    /// Distinct dimension values of the dataset
    Summary,
    /// Aggregated records matching every given dimension
    Filter {
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        provider_type: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Blend records across survey years
    Blend {
        /// percentage, weighted or equal
        #[arg(long, default_value = "percentage")]
        method: BlendMethod,
        /// YEAR or YEAR:PERCENT, repeatable
        #[arg(long = "year", value_parser = parse_year_spec, required = true)]
        years: Vec<YearConfig>,
        /// Blend previously exported flat-field records instead of the store
        #[arg(long)]
        records: Option<PathBuf>,
    },
}

/// Parse `2024` or `2024:60` into a year config
fn parse_year_spec(spec: &str) -> std::result::Result<YearConfig, String> {
    let (year, percentage) = match spec.split_once(':') {
        Some((year, pct)) => (year, Some(pct)),
        None => (spec, None),
    };
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| format!("invalid year '{}'", year))?;
    let percentage: f64 = match percentage {
        Some(pct) => pct
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| format!("invalid percentage '{}'", pct))?,
        None => 0.0,
    };
    if !percentage.is_finite() {
        return Err(format!("percentage for {} must be a finite number", year));
    }
    Ok(YearConfig::new(year, percentage))
}

fn init_tracing(config: &PcbConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pcb_engine={0},pcb_common={0}", config.logging.level).into());

    let (stderr_layer, file_layer) = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (None, Some(layer))
        }
        None => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Read a JSON array of flat-field records
fn load_flat_records(path: &Path) -> Result<Vec<AggregatedRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let rows: Vec<RawRow> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid flat records in {}", path.display()))?;
    info!(path = %path.display(), records = rows.len(), "Loaded flat records");
    Ok(rows.iter().map(lift_flat_record).collect())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;
    init_tracing(&config)?;

    info!(data = %args.data.display(), "Starting benchmark engine");

    if !args.data.exists() {
        bail!("Data fixture {} not found", args.data.display());
    }
    let store = InMemoryDataStore::from_json_file(&args.data)
        .with_context(|| format!("Failed to load data fixture {}", args.data.display()))?;
    let service = BenchmarkService::try_new(store, config)?;

    let outcome = run(&service, args.command).await;
    service.shutdown();
    outcome
}

async fn run(service: &BenchmarkService<InMemoryDataStore>, command: Command) -> Result<()> {
    match command {
        Command::Aggregate { by_year, flat } => {
            let records = if by_year {
                service.aggregated_by_year().await?
            } else {
                service.aggregated().await?
            };
            if flat {
                let rows: Vec<RawRow> = records.iter().map(flatten_record).collect();
                print_json(&rows)
            } else {
                print_json(records.as_slice())
            }
        }
        Command::Summary => print_json(service.summary().await?.as_ref()),
        Command::Filter {
            specialty,
            source,
            region,
            provider_type,
            year,
        } => {
            let filter = RecordFilter {
                specialty,
                survey_source: source,
                region,
                provider_type,
                year,
            };
            print_json(service.filter(&filter).await?.as_slice())
        }
        Command::Blend {
            method,
            years,
            records,
        } => {
            let config = BlendConfig::new(method, years);
            let result = match records {
                Some(path) => blend::blend(&load_flat_records(&path)?, &config)?,
                None => service.blend(&config).await?,
            };
            print_json(&result)
        }
    }
}
