use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, info_span, warn};

use datagov_pipeline::analysis::{AggregationSpec, MetricsComputer, NamedAggregation, SortOrder};
use datagov_pipeline::app::PipelineUseCase;
use datagov_pipeline::config::Config;
use datagov_pipeline::constants::{DEFAULT_HEAD_ROWS, DEFAULT_TOP_N};
use datagov_pipeline::infra::{read_csv, NominatimGeocoder, RateLimiter, ReqwestHttp};
use datagov_pipeline::pipeline::processing::{GeocodingEnricher, LocationColumns};
use datagov_pipeline::pipeline::RemoteSourceLoader;
use datagov_pipeline::{logging, observability};

#[derive(Parser)]
#[command(name = "datagov_pipeline")]
#[command(about = "Load, clean and geocode open government datasets, then profile them")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults are used when it does not exist)
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Write a Prometheus text snapshot of the run's metrics to this file
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, normalize, geocode and save a dataset
    Run {
        /// JSON endpoint (overrides source.endpoint)
        #[arg(long)]
        endpoint: Option<String>,
        /// CSV output path (overrides output.csv_path)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip the geocoding step
        #[arg(long)]
        skip_geocode: bool,
    },
    /// Load, normalize and save a dataset without geocoding
    Fetch {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print head, info, statistics, duplicates, missing/zero ratios and unique counts
    Profile {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_HEAD_ROWS)]
        head: usize,
    },
    /// Grouped, ranked aggregation
    Group {
        #[arg(long)]
        input: PathBuf,
        /// Group-by columns, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        by: Vec<String>,
        /// Aggregation as output=function:source (repeatable)
        #[arg(long = "agg", required = true)]
        aggregations: Vec<NamedAggregation>,
        /// Output column to rank by
        #[arg(long)]
        sort: String,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        /// Rank lowest first
        #[arg(long)]
        ascending: bool,
    },
    /// Equal-width histogram of a numeric column
    Histogram {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        column: String,
        #[arg(long, default_value_t = 10)]
        bins: usize,
        #[arg(long, requires = "max")]
        min: Option<f64>,
        #[arg(long, requires = "min")]
        max: Option<f64>,
    },
    /// Correlation matrix of the numeric columns
    Correlate {
        #[arg(long)]
        input: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_input(path: &Path) -> anyhow::Result<datagov_pipeline::domain::Table> {
    read_csv(path).with_context(|| format!("reading {}", path.display()))
}

fn run_pipeline(
    config: &Config,
    endpoint: Option<String>,
    output: Option<PathBuf>,
    geocode: bool,
) -> anyhow::Result<()> {
    let endpoint = endpoint
        .or_else(|| config.source.endpoint.clone())
        .ok_or_else(|| anyhow!("no endpoint: pass --endpoint or set source.endpoint"))?;
    let output = output.unwrap_or_else(|| PathBuf::from(&config.output.csv_path));

    let http = ReqwestHttp::new(config.source.timeout(), &config.geocoder.user_agent)?;
    let loader = RemoteSourceLoader::new(Box::new(http)).with_row_limit(config.source.row_limit);
    let enricher = if geocode {
        Some(GeocodingEnricher::new(
            Box::new(NominatimGeocoder::new(&config.geocoder)?),
            RateLimiter::new(config.geocoder.min_delay()),
            LocationColumns::from(&config.geocoder),
        ))
    } else {
        None
    };

    let (_, report) = PipelineUseCase::new(loader, enricher).run(&endpoint, &output);
    if !report.errors.is_empty() {
        warn!("{} errors encountered during pipeline run", report.errors.len());
    }
    print_json(&report)
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env_overrides()?;
    let _log_guard = logging::init_logging(&config.output.log_dir)
        .with_context(|| format!("creating log directory {}", config.output.log_dir))?;

    if cli.metrics_out.is_some() {
        observability::init()?;
    }

    match cli.command {
        Commands::Run {
            endpoint,
            output,
            skip_geocode,
        } => {
            let _span = info_span!("run").entered();
            run_pipeline(&config, endpoint, output, !skip_geocode)?;
        }
        Commands::Fetch { endpoint, output } => {
            let _span = info_span!("fetch").entered();
            run_pipeline(&config, endpoint, output, false)?;
        }
        Commands::Profile { input, head } => {
            let table = load_input(&input)?;
            print_json(&MetricsComputer::new(&table).profile(head)?)?;
        }
        Commands::Group {
            input,
            by,
            aggregations,
            sort,
            top,
            ascending,
        } => {
            let table = load_input(&input)?;
            let order = if ascending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };
            let spec = AggregationSpec::new(by, aggregations, sort)
                .with_top_n(top)
                .with_order(order);
            print_json(&MetricsComputer::new(&table).grouped_table(&spec)?)?;
        }
        Commands::Histogram {
            input,
            column,
            bins,
            min,
            max,
        } => {
            let table = load_input(&input)?;
            let range = min.zip(max);
            print_json(&MetricsComputer::new(&table).histogram(&column, range, bins)?)?;
        }
        Commands::Correlate { input } => {
            let table = load_input(&input)?;
            print_json(&MetricsComputer::new(&table).correlation_matrix()?)?;
        }
    }

    if let Some(path) = cli.metrics_out {
        if let Some(snapshot) = observability::render() {
            std::fs::write(&path, snapshot)
                .with_context(|| format!("writing metrics to {}", path.display()))?;
            info!(path = %path.display(), "Metrics snapshot written");
        }
    }
    Ok(())
}
