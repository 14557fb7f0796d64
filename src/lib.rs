//! # Cortex Engine - The Analytic Core of AIOps
//!
//! Turns operational telemetry (response time, CPU/memory, error rate, user
//! load) into three kinds of derived artifacts: multi-step forecasts,
//! anomaly/alert records, and prioritized optimization recommendations.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           CORTEX ANALYTIC ENGINE                             │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  TELEMETRY → FEATURE WINDOW → FORECASTER ─┐                                  │
//! │                            → ANOMALY DETECTOR ─┼→ OPTIMIZER → PAYLOADS       │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Forecaster**: one regression model + scaler per tracked metric
//! - **Anomaly Detector**: isolation forest ensemble + static baselines
//! - **Optimizer**: pure threshold rule engine
//! - **Model Slots**: trained state is swapped atomically on retrain, never
//!   mutated in place while inference is in flight
//!
//! ## Author
//!
//! AIOps Team

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod patterns;
pub mod stats;
pub mod telemetry;
pub mod types;

pub use anomaly::{Alert, AnomalyDetector, AnomalyRecord, Detection, MetricBaseline, SeverityLevels};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{CortexError, CortexResult, TrainingError};
pub use features::{FeatureVector, FeatureWindow};
pub use forecaster::{Forecaster, Prediction};
pub use optimizer::{Analysis, Optimizer, Recommendation};
pub use telemetry::{SyntheticTelemetry, TelemetryProvider};
pub use types::{MetricSample, MetricSeries, Priority, Severity, Timestamp, TrackedMetric};

// ============================================================================
// SECTION 2: CONSTANTS & VERSION INFORMATION
// ============================================================================
// Defaults for every tunable in the engine. Each one is surfaced through
// `EngineConfig` so deployments can override it without a rebuild.
// ============================================================================

/// Engine version - follows semantic versioning
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_NAME: &str = "cortex-engine";
pub const ENGINE_FULL_NAME: &str = "Cortex Analytics Engine";

// ----------------------------------------------------------------------------
// Feature Engineering
// ----------------------------------------------------------------------------

/// Trailing window size used to build feature vectors
pub const DEFAULT_FEATURE_WINDOW: usize = 5;

/// Length of every feature vector: mean, std, min, max, hour-of-day, hour-of-week
pub const FEATURE_VECTOR_LEN: usize = 6;

pub const HOURS_PER_DAY: usize = 24;
pub const HOURS_PER_WEEK: usize = 24 * 7;

/// Feature vector used when no window is available (hour slots filled at call time)
pub const DEFAULT_WINDOW_STATS: [f64; 4] = [100.0, 10.0, 80.0, 120.0];

// ----------------------------------------------------------------------------
// Forecasting
// ----------------------------------------------------------------------------

/// Step count used for timeframes missing from the steps table (the 1h entry)
pub const DEFAULT_FORECAST_STEPS: usize = 12;

/// Confidence of the first forecast step
pub const DEFAULT_BASE_CONFIDENCE: f64 = 0.85;

/// Linear confidence decay per forecast step
pub const DEFAULT_CONFIDENCE_DECAY: f64 = 0.05;

/// Fixed confidence reported by the quick-predict fast path
pub const QUICK_PREDICT_CONFIDENCE: f64 = 0.8;

/// Multiplicative trend band for quick predictions (±5%)
pub const QUICK_PREDICT_TREND_BAND: f64 = 0.05;

/// Additive noise standard deviation for quick predictions, relative to the base value
pub const QUICK_PREDICT_NOISE_RATIO: f64 = 0.02;

/// Seed for every randomized model so fits are reproducible
pub const DEFAULT_MODEL_SEED: u64 = 42;

/// Minimum number of (feature, target) pairs needed to fit a regressor
pub const MIN_TRAINING_PAIRS: usize = 2;

// ----------------------------------------------------------------------------
// Anomaly Detection
// ----------------------------------------------------------------------------

/// Default number of isolation trees
pub const DEFAULT_ISOLATION_TREES: usize = 100;

/// Default subsample size per isolation tree
pub const DEFAULT_ISOLATION_SAMPLE_SIZE: usize = 256;

/// Expected outlier fraction in the training data
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Rows generated for the synthetic detector baseline
pub const BASELINE_SAMPLE_COUNT: usize = 1000;

/// Decision-score cut points for severity
pub const SEVERITY_CRITICAL_CUTOFF: f64 = -0.5;
pub const SEVERITY_HIGH_CUTOFF: f64 = -0.3;
pub const SEVERITY_MEDIUM_CUTOFF: f64 = -0.1;

/// Deviation (in baseline std units) before a metric counts as affected
pub const ATTRIBUTION_SIGMA: f64 = 2.0;

/// Reference response time for the realtime anomaly score (ms)
pub const REFERENCE_RESPONSE_TIME: f64 = 100.0;

// ----------------------------------------------------------------------------
// Optimization
// ----------------------------------------------------------------------------

pub const DEFAULT_CPU_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 85.0;
pub const DEFAULT_RESPONSE_TIME_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 5.0;

pub const DEFAULT_CPU_PENALTY: f64 = 20.0;
pub const DEFAULT_MEMORY_PENALTY: f64 = 25.0;
pub const DEFAULT_RESPONSE_TIME_PENALTY: f64 = 15.0;
pub const DEFAULT_ERROR_RATE_PENALTY: f64 = 30.0;

/// Placeholder reported by `current_optimization_score` until real aggregation exists
pub const PLACEHOLDER_OPTIMIZATION_SCORE: f64 = 78.5;

// ----------------------------------------------------------------------------
// Engine Scheduling
// ----------------------------------------------------------------------------

/// Days of history requested for training
pub const DEFAULT_TRAINING_DAYS: u32 = 30;

/// Hours of history requested for inference
pub const DEFAULT_RECENT_HOURS: u32 = 24;

/// Interval between realtime snapshots in `cortex run` (seconds)
pub const DEFAULT_REALTIME_INTERVAL_SECS: u64 = 5;
