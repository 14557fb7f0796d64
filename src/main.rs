// ============================================================================
// CORTEX CLI
// ============================================================================
// Thin command-line front end over the engine. Every analytic command prints
// its payload as JSON on stdout; logs go to stderr.
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tokio::time::interval;
use tracing::{info, warn};

use cortex_engine::engine::PredictionRequest;
use cortex_engine::logging::init_logging;
use cortex_engine::{
    Engine, EngineConfig, MetricSample, MetricSeries, Timestamp, TrackedMetric, ENGINE_FULL_NAME,
    ENGINE_VERSION,
};

// ----------------------------------------------------------------------------
// CLI Argument Parser
// ----------------------------------------------------------------------------

/// Cortex Engine CLI
#[derive(Parser, Debug)]
#[command(
    name = "cortex",
    author = "AIOps Team",
    version,
    about = "Forecasting, anomaly detection and optimization engine for AIOps",
    long_about = "Cortex turns operational telemetry into multi-step forecasts, \
                  anomaly alerts and prioritized optimization recommendations. \
                  It is the analytic core of the Cerebro AIOps platform."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "cortex.toml", env = "CORTEX_CONFIG")]
    config: PathBuf,

    /// Log level override
    #[arg(short, long, env = "CORTEX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, env = "CORTEX_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train models and stream realtime snapshots until Ctrl-C
    Run {
        /// Stop after this many snapshots
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Forecast metrics over the recent history window
    Predict {
        /// Comma-separated metric names
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "response_time,active_users,cpu_usage"
        )]
        metrics: Vec<String>,

        /// Horizon label (5m, 1h, 6h, 24h, 7d)
        #[arg(short, long, default_value = "1h")]
        timeframe: String,
    },

    /// Score a series for anomalies
    Detect {
        /// JSON array of samples; defaults to recent synthetic telemetry
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Analyze one snapshot and recommend optimizations
    Optimize {
        #[arg(long)]
        cpu: Option<f64>,
        #[arg(long)]
        memory: Option<f64>,
        #[arg(long)]
        response_time: Option<f64>,
        #[arg(long)]
        error_rate: Option<f64>,
    },

    /// Trends, usage patterns, opportunities, risks and an action plan
    Insights,

    /// Validate configuration file
    Validate {
        /// Show full parsed configuration
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show engine version and build info
    Version,
}

// ----------------------------------------------------------------------------
// CLI Handler Functions
// ----------------------------------------------------------------------------

fn handle_validate(config_path: &Path, verbose: bool) -> AnyhowResult<()> {
    println!("Validating configuration file: {}", config_path.display());

    let config = EngineConfig::load(config_path)
        .with_context(|| format!("Configuration at {} is invalid", config_path.display()))?;
    println!("Configuration is valid.");

    if verbose {
        println!("\n{}", toml::to_string_pretty(&config)?);
    }

    println!("\nConfiguration Summary:");
    println!("  • Instance name: {}", config.engine.instance_name);
    println!("  • Forecast metrics: {}", config.forecast.models.len());
    println!("  • Isolation trees: {}", config.anomaly.n_trees);
    println!("  • Lazy init: {}", config.engine.lazy_init);
    match config.engine.retrain_interval_secs {
        0 => println!("  • Background retraining: disabled"),
        secs => println!("  • Background retraining: every {secs}s"),
    }
    Ok(())
}

fn handle_generate_config(output: Option<&Path>) -> AnyhowResult<()> {
    let config_str = EngineConfig::generate_default_config();

    match output {
        Some(path) => {
            fs::write(path, &config_str)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Default configuration written to: {}", path.display());
        }
        None => println!("{config_str}"),
    }
    Ok(())
}

fn handle_version() {
    println!("{ENGINE_FULL_NAME} v{ENGINE_VERSION}");
    println!();
    println!("Build Information:");
    println!("  • Target: {}", std::env::consts::ARCH);
    println!("  • OS: {}", std::env::consts::OS);
    println!();
    println!("Models:");
    println!("  • Per-metric regression forecasting (linear, random forest)");
    println!("  • Isolation forest anomaly detection");
    println!("  • Threshold-driven optimization rules");
}

fn print_json<T: Serialize>(payload: &T) -> AnyhowResult<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

fn load_series(path: &Path) -> AnyhowResult<MetricSeries> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let series: MetricSeries =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
    if !series.is_time_ordered() {
        warn!("Input series is not strictly time-ordered");
    }
    Ok(series)
}

async fn run_realtime(engine: Arc<Engine>, limit: Option<u64>) -> AnyhowResult<()> {
    engine.initialize().await?;
    let retrain = engine.spawn_retrain_loop();

    let secs = engine.config().engine.realtime_interval_secs.max(1);
    let mut ticker = interval(Duration::from_secs(secs));
    let mut emitted = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_json(&engine.realtime().await?)?;
                emitted += 1;
                if limit.map_or(false, |n| emitted >= n) {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl-C");
                break;
            }
        }
    }

    engine.shutdown();
    if let Some(handle) = retrain {
        handle.await.context("Retrain task failed")?;
    }
    info!(snapshots = emitted, "Engine stopped");
    Ok(())
}

// ----------------------------------------------------------------------------
// Main Entry Point
// ----------------------------------------------------------------------------

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Version) => {
            handle_version();
            return Ok(());
        }
        Some(Commands::GenerateConfig { output }) => return handle_generate_config(output.as_deref()),
        Some(Commands::Validate { verbose }) => return handle_validate(&cli.config, *verbose),
        _ => {}
    }

    let config_found = cli.config.exists();
    let config = if config_found {
        EngineConfig::load(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        EngineConfig::from_env().context("Failed to load config from environment")?
    };

    let mut logging_config = config.logging.clone();
    if let Some(level) = &cli.log_level {
        logging_config.level = level.clone();
    }
    if cli.debug {
        logging_config.level = "debug".into();
    }
    init_logging(&logging_config)?;

    if !config_found {
        warn!("Config file not found at {}, using defaults", cli.config.display());
    }
    info!("{} v{}", ENGINE_FULL_NAME, ENGINE_VERSION);

    let engine = Arc::new(Engine::with_synthetic(config)?);

    match cli.command {
        Some(Commands::Run { limit }) => run_realtime(engine, limit).await?,
        Some(Commands::Predict { metrics, timeframe }) => {
            engine.initialize().await?;
            let request = PredictionRequest::new(metrics, &timeframe);
            print_json(&engine.predict(&request).await?)?;
        }
        Some(Commands::Detect { input }) => {
            engine.detector().initialize()?;
            let report = match input {
                Some(path) => engine.detect(&load_series(&path)?).await?,
                None => engine.detect_recent().await?,
            };
            print_json(&report)?;
        }
        Some(Commands::Optimize {
            cpu,
            memory,
            response_time,
            error_rate,
        }) => {
            let overrides = [
                (TrackedMetric::CpuUsage, cpu),
                (TrackedMetric::MemoryUsage, memory),
                (TrackedMetric::ResponseTime, response_time),
                (TrackedMetric::ErrorRate, error_rate),
            ];
            let report = if overrides.iter().any(|(_, v)| v.is_some()) {
                let sample = MetricSample::from_pairs(
                    Timestamp::now(),
                    overrides.into_iter().filter_map(|(m, v)| v.map(|v| (m, v))),
                );
                engine.optimize(&sample)
            } else {
                engine.optimize_current().await?
            };
            print_json(&report)?;
        }
        Some(Commands::Insights) => print_json(&engine.insights().await?)?,
        None => run_realtime(engine, None).await?,
        Some(Commands::Version | Commands::GenerateConfig { .. } | Commands::Validate { .. }) => {}
    }

    Ok(())
}
