// ============================================================================
// SECTION 16: ENGINE METRICS
// ============================================================================
// Self-observability counters, kept in a per-engine Prometheus registry so
// several engines (and tests) never collide on the global default registry.
// ============================================================================

use std::fmt::{self, Debug, Formatter};

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry as PrometheusRegistry, TextEncoder,
};

use crate::error::{CortexError, CortexResult};

const NAMESPACE: &str = "cortex";

/// Engine-level Prometheus instruments.
pub struct EngineMetrics {
    registry: PrometheusRegistry,
    predictions: IntCounterVec,
    prediction_failures: IntCounterVec,
    anomalies_detected: IntCounter,
    alerts: IntCounterVec,
    retrains: IntCounterVec,
    training_failures: IntCounterVec,
    model_ready: IntGaugeVec,
    training_duration: Histogram,
}

impl EngineMetrics {
    pub fn new() -> CortexResult<Self> {
        let registry = PrometheusRegistry::new_custom(Some(NAMESPACE.to_string()), None)
            .map_err(metrics_error)?;

        let predictions = IntCounterVec::new(
            Opts::new("predictions_total", "Forecasts produced"),
            &["metric"],
        )
        .map_err(metrics_error)?;
        let prediction_failures = IntCounterVec::new(
            Opts::new("prediction_failures_total", "Forecasts that failed"),
            &["metric"],
        )
        .map_err(metrics_error)?;
        let anomalies_detected = IntCounter::new("anomalies_detected_total", "Anomalous samples flagged")
            .map_err(metrics_error)?;
        let alerts = IntCounterVec::new(Opts::new("alerts_total", "Alerts generated"), &["severity"])
            .map_err(metrics_error)?;
        let retrains = IntCounterVec::new(
            Opts::new("retrains_total", "Successful model fits"),
            &["component"],
        )
        .map_err(metrics_error)?;
        let training_failures = IntCounterVec::new(
            Opts::new("training_failures_total", "Failed model fits"),
            &["component"],
        )
        .map_err(metrics_error)?;
        let model_ready = IntGaugeVec::new(
            Opts::new("model_ready", "1 when the component has a trained model"),
            &["component"],
        )
        .map_err(metrics_error)?;
        let training_duration = Histogram::with_opts(
            HistogramOpts::new("training_duration_seconds", "Wall time of model fits")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(predictions.clone())).map_err(metrics_error)?;
        registry.register(Box::new(prediction_failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(anomalies_detected.clone())).map_err(metrics_error)?;
        registry.register(Box::new(alerts.clone())).map_err(metrics_error)?;
        registry.register(Box::new(retrains.clone())).map_err(metrics_error)?;
        registry.register(Box::new(training_failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(model_ready.clone())).map_err(metrics_error)?;
        registry.register(Box::new(training_duration.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            predictions,
            prediction_failures,
            anomalies_detected,
            alerts,
            retrains,
            training_failures,
            model_ready,
            training_duration,
        })
    }

    pub fn record_prediction(&self, metric: &str, ok: bool) {
        if ok {
            self.predictions.with_label_values(&[metric]).inc();
        } else {
            self.prediction_failures.with_label_values(&[metric]).inc();
        }
    }

    pub fn record_anomalies(&self, count: usize) {
        self.anomalies_detected.inc_by(count as u64);
    }

    pub fn record_alert(&self, severity: &str) {
        self.alerts.with_label_values(&[severity]).inc();
    }

    pub fn record_training(&self, component: &str, elapsed_ms: u64, ok: bool) {
        if ok {
            self.retrains.with_label_values(&[component]).inc();
            self.model_ready.with_label_values(&[component]).set(1);
        } else {
            self.training_failures.with_label_values(&[component]).inc();
        }
        self.training_duration.observe(elapsed_ms as f64 / 1000.0);
    }

    pub fn set_ready(&self, component: &str, ready: bool) {
        self.model_ready
            .with_label_values(&[component])
            .set(i64::from(ready));
    }

    pub fn retrain_count(&self, component: &str) -> u64 {
        self.retrains.with_label_values(&[component]).get()
    }

    pub fn training_failure_count(&self, component: &str) -> u64 {
        self.training_failures.with_label_values(&[component]).get()
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomalies_detected.get()
    }

    /// Text exposition format
    pub fn render(&self) -> CortexResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| CortexError::Internal(e.to_string()))
    }
}

impl Debug for EngineMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("anomalies_detected", &self.anomalies_detected.get())
            .finish_non_exhaustive()
    }
}

fn metrics_error(e: prometheus::Error) -> CortexError {
    CortexError::Internal(format!("metrics: {e}"))
}
