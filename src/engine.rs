// ============================================================================
// SECTION 17: ENGINE
// ============================================================================
// Composes telemetry, forecaster, anomaly detector, optimizer and pattern
// analysis into the payloads the transport layer serves. Model fitting runs
// on the blocking pool; inference reads the installed snapshots directly.
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::{self, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::anomaly::{Alert, AnomalyDetector, AnomalyRecord, Detection, RiskAssessment, SeverityLevels};
use crate::config::{ConfigManager, EngineConfig};
use crate::error::{CortexError, CortexResult, TrainingError};
use crate::forecaster::{BusinessImpact, Forecaster, QuickPrediction, TrendReport};
use crate::logging::PerfTimer;
use crate::metrics::EngineMetrics;
use crate::optimizer::{ActionItem, ImpactEstimate, Opportunities, Optimizer, Recommendation};
use crate::patterns::{PatternAnalyzer, UsagePatterns};
use crate::telemetry::{SyntheticTelemetry, TelemetryProvider};
use crate::types::{MetricSample, MetricSeries, Timestamp, TrackedMetric};
use crate::ENGINE_VERSION;

const FORECASTER: &str = "forecaster";
const DETECTOR: &str = "anomaly_detector";

// ----------------------------------------------------------------------------
// 17.1 Payloads
// ----------------------------------------------------------------------------

fn default_timeframe() -> String {
    "1h".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Metric wire names, e.g. `response_time`
    pub metrics: Vec<String>,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl PredictionRequest {
    pub fn new<I, S>(metrics: I, timeframe: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metrics: metrics.into_iter().map(Into::into).collect(),
            timeframe: timeframe.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: BTreeMap<String, Vec<f64>>,
    pub confidence_scores: BTreeMap<String, f64>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Metrics that could not be forecast, with the reason
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed: BTreeMap<String, String>,
    pub timestamp: Timestamp,
}

/// How a detection request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionOutcome {
    Scored,
    NoColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies_detected: usize,
    pub anomalies: Vec<AnomalyRecord>,
    pub alerts: Vec<Alert>,
    pub severity_levels: SeverityLevels,
    pub outcome: DetectionOutcome,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub current_performance_score: f64,
    pub optimization_suggestions: Vec<Recommendation>,
    pub predicted_improvements: ImpactEstimate,
    pub implementation_priority: Vec<Recommendation>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub performance_trends: TrendReport,
    pub usage_patterns: UsagePatterns,
    pub optimization_opportunities: Opportunities,
    pub risk_assessment: RiskAssessment,
    pub business_impact: BusinessImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub insights: Insights,
    pub recommendations: Vec<ActionItem>,
    /// Mean confidence of trends, patterns and opportunities
    pub confidence_score: f64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSnapshot {
    pub next_5_minutes: QuickPrediction,
    pub next_hour: QuickPrediction,
    pub anomaly_score: f64,
    pub optimization_score: f64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy` once every model is trained, `initializing` before
    pub status: String,
    pub models: BTreeMap<String, bool>,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: Timestamp,
}

// ----------------------------------------------------------------------------
// 17.2 Engine
// ----------------------------------------------------------------------------

/// The analytic engine.
pub struct Engine {
    config: Arc<ConfigManager>,
    provider: Arc<dyn TelemetryProvider>,
    forecaster: Arc<Forecaster>,
    detector: Arc<AnomalyDetector>,
    optimizer: Optimizer,
    patterns: PatternAnalyzer,
    metrics: Arc<EngineMetrics>,
    rng: Mutex<StdRng>,
    shutdown: Arc<Notify>,
    running: AtomicBool,
    start_time: Timestamp,
}

impl Engine {
    /// Build an engine over `provider`. Components are sized from `config`;
    /// later reloads only affect scheduling and data windows.
    pub fn new(config: EngineConfig, provider: Arc<dyn TelemetryProvider>) -> CortexResult<Self> {
        config.validate()?;

        Ok(Self {
            forecaster: Arc::new(Forecaster::new(config.forecast.clone())),
            detector: Arc::new(AnomalyDetector::new(config.anomaly.clone())),
            optimizer: Optimizer::new(config.optimizer.clone()),
            patterns: PatternAnalyzer::new(),
            metrics: Arc::new(EngineMetrics::new()?),
            rng: Mutex::new(StdRng::from_entropy()),
            config: Arc::new(ConfigManager::new(config)),
            provider,
            shutdown: Arc::new(Notify::new()),
            running: AtomicBool::new(true),
            start_time: Timestamp::now(),
        })
    }

    /// Engine backed by the seeded synthetic telemetry generator
    pub fn with_synthetic(config: EngineConfig) -> CortexResult<Self> {
        let seed = config.forecast.seed;
        Self::new(config, Arc::new(SyntheticTelemetry::new(seed)))
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.get()
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn is_ready(&self) -> bool {
        self.forecaster.is_ready() && self.detector.is_ready()
    }

    pub fn uptime(&self) -> Duration {
        Timestamp::now().duration_since(self.start_time)
    }

    // ------------------------------------------------------------------------
    // Training
    // ------------------------------------------------------------------------

    /// Fit the forecaster on provider history and the detector on its
    /// synthetic baseline. Safe to call again; each call publishes new models.
    pub async fn initialize(&self) -> CortexResult<()> {
        let config = self.config.get();
        info!(
            target: "cortex::engine",
            instance = %config.engine.instance_name,
            days = config.engine.training_days,
            "Initializing models"
        );

        let training = Arc::new(self.provider.training_data(config.engine.training_days).await?);
        let detector = Arc::clone(&self.detector);
        let (forecast, anomaly) = tokio::join!(
            self.train_forecaster(training),
            self.run_training(DETECTOR, move || detector.initialize()),
        );
        forecast.and(anomaly)?;

        info!(target: "cortex::engine", "All models ready");
        Ok(())
    }

    /// Refit both components on fresh provider history
    pub async fn retrain(&self) -> CortexResult<()> {
        let days = self.config.get().engine.training_days;
        let training = Arc::new(self.provider.training_data(days).await?);

        let detector = Arc::clone(&self.detector);
        let detector_training = Arc::clone(&training);
        // Both fits always run to completion so each records its own outcome
        let (forecast, anomaly) = tokio::join!(
            self.train_forecaster(training),
            self.run_training(DETECTOR, move || detector.retrain(&detector_training)),
        );
        forecast.and(anomaly)
    }

    async fn train_forecaster(&self, training: Arc<MetricSeries>) -> CortexResult<()> {
        let forecaster = Arc::clone(&self.forecaster);
        self.run_training(FORECASTER, move || forecaster.retrain(&training))
            .await
    }

    async fn run_training<F>(&self, component: &'static str, fit: F) -> CortexResult<()>
    where
        F: FnOnce() -> Result<(), TrainingError> + Send + 'static,
    {
        let timer = PerfTimer::new(component);
        let result = task::spawn_blocking(fit).await.map_err(|e| {
            CortexError::Internal(format!("{component} training task failed: {e}"))
        })?;
        let elapsed = timer.stop();

        self.metrics.record_training(component, elapsed, result.is_ok());
        if let Err(e) = &result {
            error!(
                target: "cortex::engine",
                component,
                error = %e,
                hint = ?e.recovery_hint(),
                "Training failed"
            );
        }
        result.map_err(CortexError::from)
    }

    async fn ensure_forecaster(&self) -> CortexResult<()> {
        if self.forecaster.is_ready() {
            return Ok(());
        }
        let config = self.config.get();
        if !config.engine.lazy_init {
            return Err(CortexError::not_ready(FORECASTER));
        }

        info!(target: "cortex::engine", "Forecaster not trained; fitting on demand");
        let training = self.provider.training_data(config.engine.training_days).await?;
        let forecaster = Arc::clone(&self.forecaster);
        self.run_training(FORECASTER, move || forecaster.ensure_ready(&training))
            .await
    }

    async fn ensure_detector(&self) -> CortexResult<()> {
        if self.detector.is_ready() {
            return Ok(());
        }
        if !self.config.get().engine.lazy_init {
            return Err(CortexError::not_ready(DETECTOR));
        }

        info!(target: "cortex::engine", "Anomaly detector not trained; fitting on demand");
        let detector = Arc::clone(&self.detector);
        self.run_training(DETECTOR, move || detector.ensure_ready())
            .await
    }

    // ------------------------------------------------------------------------
    // Payloads
    // ------------------------------------------------------------------------

    /// Forecast the requested metrics over the recent history window.
    /// Unknown or failing metrics are reported in `failed`.
    pub async fn predict(&self, request: &PredictionRequest) -> CortexResult<PredictionResponse> {
        self.ensure_forecaster().await?;
        let recent = self
            .provider
            .recent_metrics(self.config.get().engine.recent_hours)
            .await?;

        let mut by_metric: BTreeMap<TrackedMetric, Vec<f64>> = BTreeMap::new();
        let mut response = PredictionResponse {
            predictions: BTreeMap::new(),
            confidence_scores: BTreeMap::new(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            failed: BTreeMap::new(),
            timestamp: Timestamp::now(),
        };

        for name in &request.metrics {
            match self.forecaster.predict_named(name, &recent, &request.timeframe) {
                Ok(prediction) => {
                    self.metrics.record_prediction(name, true);
                    response.confidence_scores.insert(name.clone(), prediction.confidence);
                    response.predictions.insert(name.clone(), prediction.values.clone());
                    by_metric.insert(prediction.metric, prediction.values);
                }
                Err(e) => {
                    warn!(target: "cortex::engine", metric = %name, error = %e, "Prediction failed");
                    self.metrics.record_prediction(name, false);
                    response.failed.insert(name.clone(), e.to_string());
                }
            }
        }

        response.insights = self.forecaster.generate_insights(&by_metric);
        response.recommendations = self.optimizer.get_recommendations(&by_metric);
        debug!(
            target: "cortex::engine",
            predicted = response.predictions.len(),
            failed = response.failed.len(),
            timeframe = %request.timeframe,
            "Prediction request served"
        );
        Ok(response)
    }

    /// Score `series`, derive alerts and the severity histogram
    pub async fn detect(&self, series: &MetricSeries) -> CortexResult<AnomalyReport> {
        let (anomalies, outcome) = match self.detector.detect(series) {
            Ok(Detection::NoColumns) => (Vec::new(), DetectionOutcome::NoColumns),
            Ok(Detection::Scored(records)) => (records, DetectionOutcome::Scored),
            Err(CortexError::NotReady { .. }) => {
                self.ensure_detector().await?;
                match self.detector.detect(series)? {
                    Detection::NoColumns => (Vec::new(), DetectionOutcome::NoColumns),
                    Detection::Scored(records) => (records, DetectionOutcome::Scored),
                }
            }
            Err(e) => return Err(e),
        };

        let alerts = self.detector.generate_alerts(&anomalies);
        self.metrics.record_anomalies(anomalies.len());
        for alert in &alerts {
            self.metrics.record_alert(alert.severity.as_str());
        }

        Ok(AnomalyReport {
            anomalies_detected: anomalies.len(),
            severity_levels: self.detector.assess_severity(&anomalies),
            anomalies,
            alerts,
            outcome,
            timestamp: Timestamp::now(),
        })
    }

    /// Detect over the provider's recent history
    pub async fn detect_recent(&self) -> CortexResult<AnomalyReport> {
        let recent = self
            .provider
            .recent_metrics(self.config.get().engine.recent_hours)
            .await?;
        self.detect(&recent).await
    }

    pub fn optimize(&self, sample: &MetricSample) -> OptimizationReport {
        let analysis = self.optimizer.analyze_performance(sample);
        let suggestions = self.optimizer.suggest_optimizations(&analysis);

        OptimizationReport {
            current_performance_score: analysis.score,
            predicted_improvements: self.optimizer.predict_impact(&suggestions),
            implementation_priority: self.optimizer.prioritize_optimizations(suggestions.clone()),
            optimization_suggestions: suggestions,
            timestamp: Timestamp::now(),
        }
    }

    /// Optimize the provider's current snapshot
    pub async fn optimize_current(&self) -> CortexResult<OptimizationReport> {
        let current = self.provider.current_metrics().await?;
        Ok(self.optimize(&current))
    }

    pub async fn insights(&self) -> CortexResult<InsightsReport> {
        let recent = self
            .provider
            .recent_metrics(self.config.get().engine.recent_hours)
            .await?;

        let insights = Insights {
            performance_trends: self.forecaster.analyze_trends(&recent),
            usage_patterns: self.patterns.identify_patterns(&recent),
            optimization_opportunities: self.optimizer.find_opportunities(&recent),
            risk_assessment: self.detector.assess_risks(&recent),
            business_impact: self.forecaster.calculate_business_impact(&recent),
        };
        let confidence_score = (insights.performance_trends.confidence
            + insights.usage_patterns.confidence
            + insights.optimization_opportunities.confidence)
            / 3.0;

        Ok(InsightsReport {
            recommendations: self.optimizer.generate_action_plan(),
            insights,
            confidence_score,
            timestamp: Timestamp::now(),
        })
    }

    /// Model-free snapshot for streaming consumers
    pub async fn realtime(&self) -> CortexResult<RealtimeSnapshot> {
        let current = self.provider.current_metrics().await?;

        let (next_5_minutes, next_hour) = {
            let mut rng = self.rng.lock();
            (
                self.forecaster.quick_predict(&current, "5m", &mut *rng),
                self.forecaster.quick_predict(&current, "1h", &mut *rng),
            )
        };

        Ok(RealtimeSnapshot {
            next_5_minutes,
            next_hour,
            anomaly_score: self.detector.current_anomaly_score(&current),
            optimization_score: self.optimizer.current_optimization_score(&current),
            timestamp: Timestamp::now(),
        })
    }

    pub fn health(&self) -> HealthReport {
        let models: BTreeMap<String, bool> = [
            (FORECASTER, self.forecaster.is_ready()),
            (DETECTOR, self.detector.is_ready()),
            ("optimizer", self.optimizer.is_ready()),
        ]
        .into_iter()
        .map(|(name, ready)| (name.to_string(), ready))
        .collect();

        for (name, ready) in &models {
            self.metrics.set_ready(name, *ready);
        }

        HealthReport {
            status: if models.values().all(|ready| *ready) {
                "healthy".to_string()
            } else {
                "initializing".to_string()
            },
            models,
            version: ENGINE_VERSION.to_string(),
            uptime_secs: self.uptime().as_secs(),
            timestamp: Timestamp::now(),
        }
    }

    // ------------------------------------------------------------------------
    // Background jobs
    // ------------------------------------------------------------------------

    /// Start the periodic retrain job. Returns `None` when the configured
    /// interval is 0.
    pub fn spawn_retrain_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let secs = self.config.get().engine.retrain_interval_secs;
        if secs == 0 {
            debug!(target: "cortex::engine", "Background retraining disabled");
            return None;
        }

        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            info!(target: "cortex::engine", interval_secs = secs, "Background retraining started");
            let mut ticker = interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                let notified = engine.shutdown.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if !engine.running.load(AtomicOrdering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.retrain().await {
                            Ok(()) => info!(target: "cortex::engine", "Scheduled retrain complete"),
                            Err(e) => warn!(
                                target: "cortex::engine",
                                error = %e,
                                category = e.category(),
                                "Scheduled retrain failed; keeping current models"
                            ),
                        }
                    }
                    _ = &mut notified => break,
                }
            }
            info!(target: "cortex::engine", "Background retraining stopped");
        }))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::Acquire)
    }

    /// Stop background jobs
    pub fn shutdown(&self) {
        info!(target: "cortex::engine", "Shutdown signal received");
        self.running.store(false, AtomicOrdering::Release);
        self.shutdown.notify_waiters();
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("forecaster", &self.forecaster)
            .field("detector", &self.detector)
            .field("optimizer", &self.optimizer)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForecastModelSpec;
    use crate::models::ModelKind;
    use crate::telemetry::MockTelemetryProvider;
    use pretty_assertions::assert_eq;

    const END: Timestamp = Timestamp::from_secs(1_700_000_000);

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.engine.training_days = 3;
        config.engine.recent_hours = 2;
        config.forecast.max_depth = 6;
        config.forecast.models = vec![
            ForecastModelSpec::new(TrackedMetric::ResponseTime, ModelKind::Forest { trees: 6 }),
            ForecastModelSpec::new(TrackedMetric::ActiveUsers, ModelKind::Forest { trees: 6 }),
            ForecastModelSpec::new(TrackedMetric::CpuUsage, ModelKind::Linear),
            ForecastModelSpec::new(TrackedMetric::MemoryUsage, ModelKind::Linear),
            ForecastModelSpec::new(TrackedMetric::ErrorRate, ModelKind::Forest { trees: 4 }),
        ];
        config.anomaly.n_trees = 30;
        config
    }

    fn synthetic_mock() -> MockTelemetryProvider {
        let mut provider = MockTelemetryProvider::new();
        provider
            .expect_training_data()
            .returning(|days| Ok(SyntheticTelemetry::new(11).training_series(days, END)));
        provider
            .expect_recent_metrics()
            .returning(|hours| Ok(SyntheticTelemetry::new(12).recent_series(hours, END)));
        provider.expect_current_metrics().returning(|| {
            Ok(MetricSample::new(END)
                .with(TrackedMetric::ResponseTime, 150.0)
                .with(TrackedMetric::CpuUsage, 85.0))
        });
        provider
    }

    fn engine_with(config: EngineConfig, provider: MockTelemetryProvider) -> Engine {
        Engine::new(config, Arc::new(provider)).unwrap()
    }

    #[tokio::test]
    async fn test_predict_reports_failures_per_metric() {
        let engine = engine_with(test_config(), synthetic_mock());
        engine.initialize().await.unwrap();

        let request = PredictionRequest::new(["response_time", "cpu_usage", "latency_p99"], "1h");
        let response = engine.predict(&request).await.unwrap();

        assert_eq!(response.predictions.len(), 2);
        assert_eq!(response.predictions["response_time"].len(), 12);
        assert!(response.confidence_scores["cpu_usage"] <= 0.85);
        assert_eq!(response.failed.len(), 1);
        assert!(response.failed.contains_key("latency_p99"));
        assert_eq!(
            response.insights.last().map(String::as_str),
            Some("Predictions generated with 2 metrics analyzed")
        );
    }

    #[tokio::test]
    async fn test_predict_without_training_is_not_ready() {
        let engine = engine_with(test_config(), synthetic_mock());
        let request = PredictionRequest::new(["cpu_usage"], "5m");
        assert!(matches!(
            engine.predict(&request).await,
            Err(CortexError::NotReady { component: "forecaster" })
        ));
    }

    #[tokio::test]
    async fn test_lazy_init_fits_on_first_request() {
        let mut config = test_config();
        config.engine.lazy_init = true;

        let mut provider = MockTelemetryProvider::new();
        provider
            .expect_training_data()
            .times(1)
            .returning(|days| Ok(SyntheticTelemetry::new(5).training_series(days, END)));
        provider
            .expect_recent_metrics()
            .returning(|hours| Ok(SyntheticTelemetry::new(6).recent_series(hours, END)));

        let engine = engine_with(config, provider);
        let response = engine
            .predict(&PredictionRequest::new(["memory_usage"], "5m"))
            .await
            .unwrap();

        assert_eq!(response.predictions["memory_usage"].len(), 1);
        assert!(engine.forecaster().is_ready());
        assert!(!engine.detector().is_ready());
    }

    #[tokio::test]
    async fn test_detect_without_columns_is_distinct_outcome() {
        let engine = engine_with(test_config(), synthetic_mock());
        let series = MetricSeries::from_samples(vec![MetricSample::new(END)]);

        let report = engine.detect(&series).await.unwrap();
        assert_eq!(report.outcome, DetectionOutcome::NoColumns);
        assert_eq!(report.anomalies_detected, 0);
        assert_eq!(report.severity_levels.total(), 0);
    }

    #[tokio::test]
    async fn test_detect_untracked_json_series_has_no_columns() {
        let engine = engine_with(test_config(), synthetic_mock());
        let series: MetricSeries = serde_json::from_str(
            r#"[
                {"timestamp":"2024-01-01T00:00:00Z","hostname_id":1.0},
                {"timestamp":"2024-01-01T00:01:00Z","hostname_id":2.0,"region_code":"eu"}
            ]"#,
        )
        .unwrap();

        let report = engine.detect(&series).await.unwrap();
        assert_eq!(report.outcome, DetectionOutcome::NoColumns);
        assert!(report.anomalies.is_empty());
        assert!(report.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_detect_report_is_consistent() {
        let engine = engine_with(test_config(), synthetic_mock());
        engine.initialize().await.unwrap();

        let report = engine.detect_recent().await.unwrap();
        assert_eq!(report.outcome, DetectionOutcome::Scored);
        assert_eq!(report.anomalies_detected, report.anomalies.len());
        assert_eq!(report.alerts.len(), report.anomalies.len());
        assert_eq!(report.severity_levels.total(), report.anomalies.len());
        assert_eq!(engine.metrics().anomaly_count(), report.anomalies.len() as u64);
    }

    #[tokio::test]
    async fn test_optimize_current() {
        let engine = engine_with(test_config(), synthetic_mock());
        let report = engine.optimize_current().await.unwrap();

        assert_eq!(report.current_performance_score, 80.0);
        assert_eq!(report.optimization_suggestions.len(), 1);
        assert_eq!(report.predicted_improvements.performance_improvement, 15);
        assert_eq!(report.implementation_priority, report.optimization_suggestions);
    }

    #[tokio::test]
    async fn test_realtime_snapshot_needs_no_models() {
        let engine = engine_with(test_config(), synthetic_mock());
        let snapshot = engine.realtime().await.unwrap();

        assert_eq!(snapshot.anomaly_score, 0.5);
        assert_eq!(snapshot.optimization_score, 78.5);
        assert_eq!(snapshot.next_5_minutes.timeframe, "5m");
        assert_eq!(snapshot.next_hour.predictions.len(), 4);
    }

    #[tokio::test]
    async fn test_insights_confidence() {
        let engine = engine_with(test_config(), synthetic_mock());
        let report = engine.insights().await.unwrap();

        assert!((report.confidence_score - (0.8 + 0.82 + 0.8) / 3.0).abs() < 1e-12);
        assert_eq!(report.recommendations.len(), 3);
        assert_eq!(report.insights.risk_assessment.risk_factors.len(), 3);
    }

    #[tokio::test]
    async fn test_health_and_repeat_initialize() {
        let engine = engine_with(test_config(), synthetic_mock());
        let before = engine.health();
        assert_eq!(before.status, "initializing");
        assert_eq!(before.models["optimizer"], true);

        engine.initialize().await.unwrap();
        engine.initialize().await.unwrap();

        let after = engine.health();
        assert_eq!(after.status, "healthy");
        assert!(after.models.values().all(|ready| *ready));
        assert_eq!(engine.metrics().retrain_count("forecaster"), 2);
    }

    #[tokio::test]
    async fn test_failed_retrain_keeps_models() {
        let mut provider = MockTelemetryProvider::new();
        let mut seq = mockall::Sequence::new();
        provider
            .expect_training_data()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|days| Ok(SyntheticTelemetry::new(1).training_series(days, END)));
        provider
            .expect_training_data()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(MetricSeries::new()));

        let engine = engine_with(test_config(), provider);
        engine.initialize().await.unwrap();
        let batch = engine.forecaster().snapshot().unwrap().batch();

        assert!(engine.retrain().await.is_err());
        assert!(engine.is_ready());
        assert_eq!(engine.forecaster().snapshot().unwrap().batch(), batch);
        assert_eq!(engine.metrics().training_failure_count("forecaster"), 1);
        assert_eq!(engine.metrics().training_failure_count("anomaly_detector"), 1);
    }

    #[tokio::test]
    async fn test_retrain_loop_disabled_and_shutdown() {
        let engine = Arc::new(engine_with(test_config(), synthetic_mock()));
        assert!(engine.spawn_retrain_loop().is_none());

        let mut config = test_config();
        config.engine.retrain_interval_secs = 3600;
        let engine = Arc::new(engine_with(config, synthetic_mock()));
        let handle = engine.spawn_retrain_loop().unwrap();

        engine.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.anomaly.n_trees = 0;
        assert!(matches!(
            Engine::with_synthetic(config),
            Err(CortexError::Config(_))
        ));
    }
}
