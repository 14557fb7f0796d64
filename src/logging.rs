// ============================================================================
// SECTION 6: LOGGING & TRACING INFRASTRUCTURE
// ============================================================================
// Structured logging with per-subsystem targets:
//   cortex::forecast, cortex::anomaly, cortex::optimizer, cortex::engine
// ============================================================================

use std::io;
use std::time::Instant;

use tracing::level_filters::LevelFilter;
use tracing::{info, trace, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{CortexError, CortexResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ----------------------------------------------------------------------------
// 6.1 Logger Initialization
// ----------------------------------------------------------------------------

/// Install the global subscriber. Output goes to stderr; stdout carries
/// command payloads.
pub fn init_logging(config: &LoggingConfig) -> CortexResult<()> {
    let level = config.level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(format_layer(config))
        .with(env_filter)
        .try_init()
        .map_err(|e| CortexError::Internal(format!("Failed to set logger: {e}")))?;

    info!(
        target: "cortex::engine",
        level = %config.level,
        format = %config.format,
        "Logging initialized"
    );
    Ok(())
}

fn format_layer(config: &LoggingConfig) -> BoxedLayer {
    let base = fmt::layer().with_writer(io::stderr).with_target(true);
    match config.format.as_str() {
        "json" => base
            .json()
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed(),
        "compact" => base.compact().with_ansi(config.colors).boxed(),
        _ => base
            .pretty()
            .with_ansi(config.colors)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed(),
    }
}

// ----------------------------------------------------------------------------
// 6.2 Logging Macros for Engine Components
// ----------------------------------------------------------------------------

/// Log an alert event
#[macro_export]
macro_rules! log_alert {
    ($severity:expr, $message:expr, $($field:tt)*) => {
        tracing::warn!(
            target: "cortex::anomaly",
            severity = %$severity,
            message = $message,
            $($field)*,
            "Alert raised"
        )
    };
}

/// Log the outcome of a model fit
#[macro_export]
macro_rules! log_training {
    ($component:expr, $rows:expr, $elapsed_ms:expr) => {
        tracing::info!(
            target: "cortex::engine",
            component = $component,
            rows = $rows,
            elapsed_ms = $elapsed_ms,
            "Models trained"
        )
    };
}

// ----------------------------------------------------------------------------
// 6.3 Performance Timer
// ----------------------------------------------------------------------------

/// Wall-clock timer for model fits; warns past an optional threshold
#[derive(Debug)]
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
    threshold_ms: Option<u64>,
}

impl PerfTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            threshold_ms: None,
        }
    }

    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            threshold_ms: Some(threshold_ms),
            ..Self::new(name)
        }
    }

    /// Elapsed milliseconds
    pub fn stop(self) -> u64 {
        let elapsed = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Some(threshold) = self.threshold_ms {
            if elapsed > threshold {
                warn!(
                    target: "cortex::engine",
                    operation = self.name,
                    elapsed_ms = elapsed,
                    threshold_ms = threshold,
                    "Operation exceeded threshold"
                );
            }
        }

        trace!(
            target: "cortex::engine",
            operation = self.name,
            elapsed_ms = elapsed,
            "Operation completed"
        );

        elapsed
    }
}
