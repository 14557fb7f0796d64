// ============================================================================
// SECTION 4: ERROR HANDLING FRAMEWORK
// ============================================================================
// Error types for every subsystem in the engine.
// Expected conditions (a series with no detectable columns, one metric failing
// inside a multi-metric forecast) are modelled as values, not errors; these
// enums only carry genuine failures.
// ============================================================================

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::TrackedMetric;

/// Result alias used across the engine
pub type CortexResult<T> = Result<T, CortexError>;

// ----------------------------------------------------------------------------
// 4.1 Core Engine Errors
// ----------------------------------------------------------------------------

/// The main error type for the Cortex engine.
/// All subsystem errors can be converted to this type.
#[derive(Error, Debug)]
pub enum CortexError {
    // ---- Lifecycle Errors ----
    #[error("{component} is not ready: models have not been trained")]
    NotReady { component: &'static str },

    // ---- Input Errors ----
    #[error("Unknown metric: '{name}'")]
    UnknownMetric { name: String },

    // ---- Training Errors ----
    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    // ---- Configuration Errors ----
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // ---- Telemetry Errors ----
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    // ---- IO Errors ----
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ---- Generic Errors ----
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CortexError {
    pub fn not_ready(component: &'static str) -> Self {
        CortexError::NotReady { component }
    }

    pub fn unknown_metric(name: impl Into<String>) -> Self {
        CortexError::UnknownMetric { name: name.into() }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        CortexError::Telemetry {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            CortexError::NotReady { .. } => true,
            CortexError::UnknownMetric { .. } => false,
            CortexError::Training(e) => e.is_recoverable(),
            CortexError::Config(_) => false,
            CortexError::Telemetry { .. } => true,
            CortexError::Io(_) => true,
            CortexError::Internal(_) => false,
        }
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            CortexError::NotReady { .. } => "not_ready",
            CortexError::UnknownMetric { .. } => "unknown_metric",
            CortexError::Training(_) => "training",
            CortexError::Config(_) => "config",
            CortexError::Telemetry { .. } => "telemetry",
            CortexError::Io(_) => "io",
            CortexError::Internal(_) => "internal",
        }
    }

    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            CortexError::NotReady { .. } => RecoveryHint::InitializeModels,
            CortexError::UnknownMetric { .. } => RecoveryHint::Skip,
            CortexError::Training(e) => e.recovery_hint(),
            CortexError::Config(_) => RecoveryHint::FixConfiguration,
            CortexError::Telemetry { .. } => RecoveryHint::RetryWithBackoff,
            CortexError::Io(_) => RecoveryHint::RetryWithBackoff,
            CortexError::Internal(_) => RecoveryHint::AlertOperator,
        }
    }
}

/// Hints for how to recover from an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// No recovery possible
    None,
    /// Retry with exponential backoff
    RetryWithBackoff,
    /// Train the models, then retry
    InitializeModels,
    /// Collect more telemetry before training again
    CollectMoreData,
    /// Fix configuration and restart
    FixConfiguration,
    /// Skip this item and continue
    Skip,
    /// Alert operator for manual intervention
    AlertOperator,
}

// ----------------------------------------------------------------------------
// 4.2 Training Errors
// ----------------------------------------------------------------------------

/// Errors raised while fitting a model. A failed fit never replaces the
/// previously installed models.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Insufficient training data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Degenerate training data: {message}")]
    Degenerate { message: String },

    #[error("No trainable columns present in the training series")]
    NoColumns,

    #[error("Failed to fit model for '{metric}': {source}")]
    MetricFit {
        metric: TrackedMetric,
        #[source]
        source: Box<TrainingError>,
    },

    #[error("Training task failed: {message}")]
    Aborted { message: String },
}

impl TrainingError {
    pub fn degenerate(message: impl Into<String>) -> Self {
        TrainingError::Degenerate {
            message: message.into(),
        }
    }

    /// Attach the metric whose fit failed
    pub fn for_metric(self, metric: TrackedMetric) -> Self {
        TrainingError::MetricFit {
            metric,
            source: Box::new(self),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            TrainingError::InsufficientData { .. } => true,
            TrainingError::NoColumns => true,
            TrainingError::Degenerate { .. } => true,
            TrainingError::MetricFit { source, .. } => source.is_recoverable(),
            TrainingError::Aborted { .. } => false,
        }
    }

    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            TrainingError::InsufficientData { .. } | TrainingError::NoColumns => {
                RecoveryHint::CollectMoreData
            }
            TrainingError::Degenerate { .. } => RecoveryHint::CollectMoreData,
            TrainingError::MetricFit { source, .. } => source.recovery_hint(),
            TrainingError::Aborted { .. } => RecoveryHint::AlertOperator,
        }
    }
}

// ----------------------------------------------------------------------------
// 4.3 Configuration Errors
// ----------------------------------------------------------------------------

/// Errors related to configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {message}")]
    ParseError {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            message: message.into(),
            source: None,
        }
    }
}
