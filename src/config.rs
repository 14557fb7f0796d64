// ============================================================================
// SECTION 5: CONFIGURATION SYSTEM
// ============================================================================
// Every threshold, decay constant and model hyper-parameter the engine uses,
// loaded from TOML with `CORTEX_` environment overrides and validated before
// anything is built from it.
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::anomaly::MetricBaseline;
use crate::error::ConfigError;
use crate::models::ModelKind;
use crate::types::TrackedMetric;
use crate::*;

// ----------------------------------------------------------------------------
// 5.1 Main Configuration Structure
// ----------------------------------------------------------------------------

/// Root configuration for the Cortex engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// General engine settings
    #[serde(default)]
    pub engine: GeneralConfig,

    /// Forecaster settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Anomaly detector settings
    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Optimizer thresholds and penalties
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from file with environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CORTEX_").split("__"));

        let config: Self = figment.extract().map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
            source: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load defaults with environment overrides only
    pub fn from_env() -> Result<Self, ConfigError> {
        let figment = Figment::from(figment::providers::Serialized::defaults(Self::default()))
            .merge(Env::prefixed("CORTEX_").split("__"));

        let config: Self = figment.extract().map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
            source: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from string (for testing)
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
            source: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forecast.validate()?;
        self.anomaly.validate()?;
        self.optimizer.validate()?;

        if !matches!(self.logging.format.as_str(), "json" | "compact" | "pretty") {
            return Err(ConfigError::invalid_value(
                "logging.format",
                format!("Unknown log format '{}'", self.logging.format),
            ));
        }

        Ok(())
    }

    /// Create a default config file
    pub fn generate_default_config() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// 5.2 General Engine Configuration
// ----------------------------------------------------------------------------

/// General engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Engine instance name (for identification)
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Fit models inline on the first inference call when not yet trained
    #[serde(default)]
    pub lazy_init: bool,

    /// Background retrain interval; 0 disables the job
    #[serde(default)]
    pub retrain_interval_secs: u64,

    /// Interval between realtime snapshots in `cortex run`
    #[serde(default = "default_realtime_interval")]
    pub realtime_interval_secs: u64,

    /// Days of history requested for training
    #[serde(default = "default_training_days")]
    pub training_days: u32,

    /// Hours of history requested for inference
    #[serde(default = "default_recent_hours")]
    pub recent_hours: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            lazy_init: false,
            retrain_interval_secs: 0,
            realtime_interval_secs: default_realtime_interval(),
            training_days: default_training_days(),
            recent_hours: default_recent_hours(),
        }
    }
}

fn default_instance_name() -> String {
    "cortex-engine".into()
}

fn default_realtime_interval() -> u64 {
    DEFAULT_REALTIME_INTERVAL_SECS
}

fn default_training_days() -> u32 {
    DEFAULT_TRAINING_DAYS
}

fn default_recent_hours() -> u32 {
    DEFAULT_RECENT_HOURS
}

// ----------------------------------------------------------------------------
// 5.3 Forecast Configuration
// ----------------------------------------------------------------------------

/// Regressor family assigned to one forecast metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastModelSpec {
    pub metric: TrackedMetric,
    pub model: ModelKind,
}

impl ForecastModelSpec {
    pub const fn new(metric: TrackedMetric, model: ModelKind) -> Self {
        Self { metric, model }
    }
}

/// Forecaster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Trailing window size for feature extraction
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Confidence of the first forecast step
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,

    /// Linear confidence decay per step
    #[serde(default = "default_confidence_decay")]
    pub confidence_decay: f64,

    /// Confidence reported by quick predictions
    #[serde(default = "default_quick_confidence")]
    pub quick_confidence: f64,

    /// Multiplicative trend band for quick predictions
    #[serde(default = "default_quick_trend_band")]
    pub quick_trend_band: f64,

    /// Noise std for quick predictions, relative to the base value
    #[serde(default = "default_quick_noise_ratio")]
    pub quick_noise_ratio: f64,

    /// Step count for timeframes missing from the table
    #[serde(default = "default_steps")]
    pub default_steps: usize,

    /// Timeframe label to step count
    #[serde(default = "default_timeframe_steps")]
    pub timeframe_steps: BTreeMap<String, usize>,

    /// Seed for randomized regressors
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Maximum depth of each regression tree
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum rows required to split a tree node
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    /// Mean response time above which an increase insight is raised
    #[serde(default = "default_insight_rt_high")]
    pub insight_response_time_high: f64,

    /// Mean response time below which an excellence insight is raised
    #[serde(default = "default_insight_rt_low")]
    pub insight_response_time_low: f64,

    /// Peak CPU above which a scaling insight is raised
    #[serde(default = "default_insight_cpu_high")]
    pub insight_cpu_high: f64,

    /// Peak CPU below which a cost insight is raised
    #[serde(default = "default_insight_cpu_low")]
    pub insight_cpu_low: f64,

    /// Per-metric regressor assignment
    #[serde(default = "default_forecast_models")]
    pub models: Vec<ForecastModelSpec>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            base_confidence: default_base_confidence(),
            confidence_decay: default_confidence_decay(),
            quick_confidence: default_quick_confidence(),
            quick_trend_band: default_quick_trend_band(),
            quick_noise_ratio: default_quick_noise_ratio(),
            default_steps: default_steps(),
            timeframe_steps: default_timeframe_steps(),
            seed: default_seed(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            insight_response_time_high: default_insight_rt_high(),
            insight_response_time_low: default_insight_rt_low(),
            insight_cpu_high: default_insight_cpu_high(),
            insight_cpu_low: default_insight_cpu_low(),
            models: default_forecast_models(),
        }
    }
}

impl ForecastConfig {
    /// Forecast metrics in configuration order
    pub fn metrics(&self) -> Vec<TrackedMetric> {
        self.models.iter().map(|spec| spec.metric).collect()
    }

    pub fn model_for(&self, metric: TrackedMetric) -> Option<ModelKind> {
        self.models
            .iter()
            .find(|spec| spec.metric == metric)
            .map(|spec| spec.model)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::invalid_value(
                "forecast.window_size",
                "Window size must be at least 1",
            ));
        }

        for (field, value) in [
            ("forecast.base_confidence", self.base_confidence),
            ("forecast.quick_confidence", self.quick_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("Confidence must be within [0, 1], got {}", value),
                ));
            }
        }

        if self.confidence_decay < 0.0 {
            return Err(ConfigError::invalid_value(
                "forecast.confidence_decay",
                "Confidence decay cannot be negative",
            ));
        }

        if self.quick_trend_band < 0.0 || self.quick_noise_ratio < 0.0 {
            return Err(ConfigError::invalid_value(
                "forecast.quick_trend_band",
                "Quick prediction band and noise ratio cannot be negative",
            ));
        }

        if self.default_steps == 0 || self.timeframe_steps.values().any(|s| *s == 0) {
            return Err(ConfigError::invalid_value(
                "forecast.timeframe_steps",
                "Every timeframe must forecast at least one step",
            ));
        }

        if self.min_samples_split < 2 || self.max_depth == 0 {
            return Err(ConfigError::invalid_value(
                "forecast.min_samples_split",
                "Trees need min_samples_split >= 2 and max_depth >= 1",
            ));
        }

        if self.models.is_empty() {
            return Err(ConfigError::invalid_value(
                "forecast.models",
                "At least one forecast metric must be configured",
            ));
        }

        let mut seen = Vec::with_capacity(self.models.len());
        for spec in &self.models {
            if seen.contains(&spec.metric) {
                return Err(ConfigError::invalid_value(
                    "forecast.models",
                    format!("Metric '{}' is configured twice", spec.metric),
                ));
            }
            if let ModelKind::Forest { trees: 0 } = spec.model {
                return Err(ConfigError::invalid_value(
                    "forecast.models",
                    format!("Forest for '{}' needs at least one tree", spec.metric),
                ));
            }
            seen.push(spec.metric);
        }

        Ok(())
    }
}

fn default_window_size() -> usize {
    DEFAULT_FEATURE_WINDOW
}

fn default_base_confidence() -> f64 {
    DEFAULT_BASE_CONFIDENCE
}

fn default_confidence_decay() -> f64 {
    DEFAULT_CONFIDENCE_DECAY
}

fn default_quick_confidence() -> f64 {
    QUICK_PREDICT_CONFIDENCE
}

fn default_quick_trend_band() -> f64 {
    QUICK_PREDICT_TREND_BAND
}

fn default_quick_noise_ratio() -> f64 {
    QUICK_PREDICT_NOISE_RATIO
}

fn default_steps() -> usize {
    DEFAULT_FORECAST_STEPS
}

fn default_timeframe_steps() -> BTreeMap<String, usize> {
    [("5m", 1), ("1h", 12), ("6h", 72), ("24h", 288), ("7d", 2016)]
        .into_iter()
        .map(|(label, steps)| (label.to_string(), steps))
        .collect()
}

fn default_seed() -> u64 {
    DEFAULT_MODEL_SEED
}

fn default_max_depth() -> usize {
    16
}

fn default_min_samples_split() -> usize {
    2
}

fn default_insight_rt_high() -> f64 {
    200.0
}

fn default_insight_rt_low() -> f64 {
    50.0
}

fn default_insight_cpu_high() -> f64 {
    80.0
}

fn default_insight_cpu_low() -> f64 {
    30.0
}

fn default_forecast_models() -> Vec<ForecastModelSpec> {
    vec![
        ForecastModelSpec::new(TrackedMetric::ResponseTime, ModelKind::Forest { trees: 100 }),
        ForecastModelSpec::new(TrackedMetric::ActiveUsers, ModelKind::Forest { trees: 100 }),
        ForecastModelSpec::new(TrackedMetric::CpuUsage, ModelKind::Linear),
        ForecastModelSpec::new(TrackedMetric::MemoryUsage, ModelKind::Linear),
        ForecastModelSpec::new(TrackedMetric::ErrorRate, ModelKind::Forest { trees: 50 }),
    ]
}

// ----------------------------------------------------------------------------
// 5.4 Anomaly Detection Configuration
// ----------------------------------------------------------------------------

/// Anomaly detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Number of isolation trees
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Subsample size per tree
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Expected outlier fraction; sets the decision threshold
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Seed for the ensemble and the synthetic baseline
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_critical_cutoff")]
    pub critical_cutoff: f64,

    #[serde(default = "default_high_cutoff")]
    pub high_cutoff: f64,

    #[serde(default = "default_medium_cutoff")]
    pub medium_cutoff: f64,

    /// Deviation in std units before a metric counts as affected
    #[serde(default = "default_attribution_sigma")]
    pub attribution_sigma: f64,

    /// Reference response time for the realtime score (ms)
    #[serde(default = "default_reference_response_time")]
    pub reference_response_time: f64,

    /// Rows generated for the synthetic training baseline
    #[serde(default = "default_baseline_samples")]
    pub baseline_samples: usize,

    /// Static per-metric baselines used for attribution
    #[serde(default = "default_baselines")]
    pub baselines: Vec<MetricBaseline>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            sample_size: default_sample_size(),
            contamination: default_contamination(),
            seed: default_seed(),
            critical_cutoff: default_critical_cutoff(),
            high_cutoff: default_high_cutoff(),
            medium_cutoff: default_medium_cutoff(),
            attribution_sigma: default_attribution_sigma(),
            reference_response_time: default_reference_response_time(),
            baseline_samples: default_baseline_samples(),
            baselines: default_baselines(),
        }
    }
}

impl AnomalyConfig {
    pub fn baseline(&self, metric: TrackedMetric) -> Option<&MetricBaseline> {
        self.baselines.iter().find(|b| b.metric == metric)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::invalid_value(
                "anomaly.n_trees",
                "The ensemble needs at least one tree",
            ));
        }

        if self.sample_size < 2 {
            return Err(ConfigError::invalid_value(
                "anomaly.sample_size",
                "Sample size must be at least 2",
            ));
        }

        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigError::invalid_value(
                "anomaly.contamination",
                format!("Contamination must be within (0, 0.5], got {}", self.contamination),
            ));
        }

        if !(self.critical_cutoff <= self.high_cutoff
            && self.high_cutoff <= self.medium_cutoff
            && self.medium_cutoff <= 0.0)
        {
            return Err(ConfigError::invalid_value(
                "anomaly.critical_cutoff",
                "Severity cutoffs must satisfy critical <= high <= medium <= 0",
            ));
        }

        if self.attribution_sigma <= 0.0 || self.reference_response_time <= 0.0 {
            return Err(ConfigError::invalid_value(
                "anomaly.attribution_sigma",
                "Attribution sigma and reference response time must be positive",
            ));
        }

        if self.baseline_samples < 2 {
            return Err(ConfigError::invalid_value(
                "anomaly.baseline_samples",
                "Synthetic baseline needs at least 2 rows",
            ));
        }

        if let Some(bad) = self.baselines.iter().find(|b| b.std < 0.0) {
            return Err(ConfigError::invalid_value(
                "anomaly.baselines",
                format!("Baseline std for '{}' cannot be negative", bad.metric),
            ));
        }

        Ok(())
    }
}

fn default_n_trees() -> usize {
    DEFAULT_ISOLATION_TREES
}

fn default_sample_size() -> usize {
    DEFAULT_ISOLATION_SAMPLE_SIZE
}

fn default_contamination() -> f64 {
    DEFAULT_CONTAMINATION
}

fn default_critical_cutoff() -> f64 {
    SEVERITY_CRITICAL_CUTOFF
}

fn default_high_cutoff() -> f64 {
    SEVERITY_HIGH_CUTOFF
}

fn default_medium_cutoff() -> f64 {
    SEVERITY_MEDIUM_CUTOFF
}

fn default_attribution_sigma() -> f64 {
    ATTRIBUTION_SIGMA
}

fn default_reference_response_time() -> f64 {
    REFERENCE_RESPONSE_TIME
}

fn default_baseline_samples() -> usize {
    BASELINE_SAMPLE_COUNT
}

fn default_baselines() -> Vec<MetricBaseline> {
    vec![
        MetricBaseline::new(TrackedMetric::ResponseTime, 100.0, 15.0, 130.0),
        MetricBaseline::new(TrackedMetric::ActiveUsers, 500.0, 100.0, 700.0),
        MetricBaseline::new(TrackedMetric::CpuUsage, 45.0, 12.0, 70.0),
        MetricBaseline::new(TrackedMetric::MemoryUsage, 55.0, 10.0, 75.0),
        MetricBaseline::new(TrackedMetric::ErrorRate, 2.0, 1.5, 5.0),
    ]
}

// ----------------------------------------------------------------------------
// 5.5 Optimizer Configuration
// ----------------------------------------------------------------------------

/// Optimizer thresholds, penalties and status bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold: f64,

    #[serde(default = "default_memory_threshold")]
    pub memory_threshold: f64,

    #[serde(default = "default_response_time_threshold")]
    pub response_time_threshold: f64,

    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,

    #[serde(default = "default_cpu_penalty")]
    pub cpu_penalty: f64,

    #[serde(default = "default_memory_penalty")]
    pub memory_penalty: f64,

    #[serde(default = "default_response_time_penalty")]
    pub response_time_penalty: f64,

    #[serde(default = "default_error_rate_penalty")]
    pub error_rate_penalty: f64,

    /// Minimum score for "excellent"
    #[serde(default = "default_excellent_score")]
    pub excellent_score: f64,

    /// Minimum score for "good"
    #[serde(default = "default_good_score")]
    pub good_score: f64,

    /// Forecast mean response time above which an advisory is raised
    #[serde(default = "default_response_time_threshold")]
    pub forecast_response_time_limit: f64,

    /// Forecast mean user load above which a capacity advisory is raised
    #[serde(default = "default_forecast_users_limit")]
    pub forecast_active_users_limit: f64,

    /// Forecast mean CPU above which a scaling advisory is raised
    #[serde(default = "default_cpu_threshold")]
    pub forecast_cpu_limit: f64,

    /// Value reported by `current_optimization_score`
    #[serde(default = "default_placeholder_score")]
    pub placeholder_score: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: default_cpu_threshold(),
            memory_threshold: default_memory_threshold(),
            response_time_threshold: default_response_time_threshold(),
            error_rate_threshold: default_error_rate_threshold(),
            cpu_penalty: default_cpu_penalty(),
            memory_penalty: default_memory_penalty(),
            response_time_penalty: default_response_time_penalty(),
            error_rate_penalty: default_error_rate_penalty(),
            excellent_score: default_excellent_score(),
            good_score: default_good_score(),
            forecast_response_time_limit: default_response_time_threshold(),
            forecast_active_users_limit: default_forecast_users_limit(),
            forecast_cpu_limit: default_cpu_threshold(),
            placeholder_score: default_placeholder_score(),
        }
    }
}

impl OptimizerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("optimizer.cpu_penalty", self.cpu_penalty),
            ("optimizer.memory_penalty", self.memory_penalty),
            ("optimizer.response_time_penalty", self.response_time_penalty),
            ("optimizer.error_rate_penalty", self.error_rate_penalty),
        ] {
            if value < 0.0 {
                return Err(ConfigError::invalid_value(field, "Penalty cannot be negative"));
            }
        }

        if !(self.good_score <= self.excellent_score && self.excellent_score <= 100.0) {
            return Err(ConfigError::invalid_value(
                "optimizer.excellent_score",
                "Status bands must satisfy good <= excellent <= 100",
            ));
        }

        Ok(())
    }
}

fn default_cpu_threshold() -> f64 {
    DEFAULT_CPU_THRESHOLD
}

fn default_memory_threshold() -> f64 {
    DEFAULT_MEMORY_THRESHOLD
}

fn default_response_time_threshold() -> f64 {
    DEFAULT_RESPONSE_TIME_THRESHOLD
}

fn default_error_rate_threshold() -> f64 {
    DEFAULT_ERROR_RATE_THRESHOLD
}

fn default_cpu_penalty() -> f64 {
    DEFAULT_CPU_PENALTY
}

fn default_memory_penalty() -> f64 {
    DEFAULT_MEMORY_PENALTY
}

fn default_response_time_penalty() -> f64 {
    DEFAULT_RESPONSE_TIME_PENALTY
}

fn default_error_rate_penalty() -> f64 {
    DEFAULT_ERROR_RATE_PENALTY
}

fn default_excellent_score() -> f64 {
    90.0
}

fn default_good_score() -> f64 {
    70.0
}

fn default_forecast_users_limit() -> f64 {
    1000.0
}

fn default_placeholder_score() -> f64 {
    PLACEHOLDER_OPTIMIZATION_SCORE
}

// ----------------------------------------------------------------------------
// 5.6 Logging Configuration
// ----------------------------------------------------------------------------

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, compact, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable ANSI colors
    #[serde(default = "default_true")]
    pub colors: bool,

    /// Include source location
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colors: true,
            source_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_true() -> bool {
    true
}

// ----------------------------------------------------------------------------
// 5.7 Configuration Hot-Reload
// ----------------------------------------------------------------------------

/// Holds the live configuration; readers never block a reload
pub struct ConfigManager {
    config: ArcSwap<EngineConfig>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            config_path: None,
        }
    }

    /// Create from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = EngineConfig::load(&path)?;
        let mut manager = Self::new(config);
        manager.config_path = Some(path.as_ref().to_path_buf());
        Ok(manager)
    }

    /// Get current configuration
    pub fn get(&self) -> Arc<EngineConfig> {
        self.config.load_full()
    }

    /// Validate and publish a new configuration
    pub fn update(&self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Reload from file; no-op for managers built from a value
    pub fn reload(&self) -> Result<bool, ConfigError> {
        match &self.config_path {
            Some(path) => {
                let config = EngineConfig::load(path)?;
                self.update(config)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Debug for ConfigManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config", &*self.config.load())
            .field("config_path", &self.config_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.engine.lazy_init);
        assert_eq!(config.forecast.timeframe_steps["7d"], 2016);
        assert_eq!(
            config.forecast.model_for(TrackedMetric::ErrorRate),
            Some(ModelKind::Forest { trees: 50 })
        );
        assert_eq!(config.optimizer.placeholder_score, 78.5);
    }

    #[test]
    fn test_generated_config_parses_back() {
        let rendered = EngineConfig::generate_default_config();
        assert!(!rendered.is_empty());
        let parsed = EngineConfig::from_str(&rendered).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_str(
            r#"
            [optimizer]
            cpu_threshold = 70.0

            [anomaly]
            contamination = 0.05
            "#,
        )
        .unwrap();

        assert_eq!(config.optimizer.cpu_threshold, 70.0);
        assert_eq!(config.optimizer.memory_threshold, DEFAULT_MEMORY_THRESHOLD);
        assert_eq!(config.anomaly.contamination, 0.05);
        assert_eq!(config.forecast.window_size, DEFAULT_FEATURE_WINDOW);
    }

    #[test]
    fn test_invalid_contamination_rejected() {
        let err = EngineConfig::from_str("[anomaly]\ncontamination = 0.9\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "anomaly.contamination"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_forecast_metric_rejected() {
        let mut config = EngineConfig::default();
        config
            .forecast
            .models
            .push(ForecastModelSpec::new(TrackedMetric::CpuUsage, ModelKind::Linear));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nlazy_init = true\nretrain_interval_secs = 60").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.engine.lazy_init);
        assert_eq!(config.engine.retrain_interval_secs, 60);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/definitely/not/here/cortex.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_manager_rejects_invalid_update() {
        let manager = ConfigManager::new(EngineConfig::default());
        let mut bad = EngineConfig::default();
        bad.forecast.window_size = 0;

        assert!(manager.update(bad).is_err());
        assert_eq!(manager.get().forecast.window_size, DEFAULT_FEATURE_WINDOW);
        assert!(!manager.reload().unwrap());
    }
}
