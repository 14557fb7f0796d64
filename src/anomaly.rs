// ============================================================================
// SECTION 13: ANOMALY DETECTOR
// ============================================================================
// Isolation-forest scoring over standardized telemetry rows, with severity
// bucketing on the decision score and attribution against a static baseline
// table. The fitted ensemble remembers its column set; every row is scored on
// exactly that set, with absent values imputed to the training mean.
// ============================================================================

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnomalyConfig;
use crate::error::{CortexError, CortexResult, TrainingError};
use crate::lifecycle::ModelSlot;
use crate::logging::PerfTimer;
use crate::models::IsolationForest;
use crate::stats::{StandardScaler, StatisticalFunctions};
use crate::types::{MetricSample, MetricSeries, Severity, Timestamp, TrackedMetric};

/// Columns the ensemble is trained on
pub const TRAINING_COLUMNS: [TrackedMetric; 5] = [
    TrackedMetric::ActiveUsers,
    TrackedMetric::ResponseTime,
    TrackedMetric::ErrorRate,
    TrackedMetric::CpuUsage,
    TrackedMetric::MemoryUsage,
];

// ----------------------------------------------------------------------------
// 13.1 Baselines & Records
// ----------------------------------------------------------------------------

/// Expected operating range of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBaseline {
    pub metric: TrackedMetric,
    pub mean: f64,
    pub std: f64,
    pub p95: f64,
}

impl MetricBaseline {
    pub const fn new(metric: TrackedMetric, mean: f64, std: f64, p95: f64) -> Self {
        Self {
            metric,
            mean,
            std,
            p95,
        }
    }

    /// `|value - mean| > sigma * std`
    #[inline]
    pub fn deviates(&self, value: f64, sigma: f64) -> bool {
        (value - self.mean).abs() > sigma * self.std
    }
}

/// One anomalous sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: Timestamp,
    /// Decision score; negative is anomalous, lower is worse
    pub anomaly_score: f64,
    pub severity: Severity,
    pub affected_metrics: Vec<TrackedMetric>,
    pub description: String,
}

/// Actionable notification derived 1:1 from an anomaly record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub affected_systems: Vec<TrackedMetric>,
    pub recommended_actions: Vec<String>,
    pub escalation_required: bool,
}

/// Outcome of scoring a series
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Rows were scored; holds the anomalous ones
    Scored(Vec<AnomalyRecord>),
    /// The series carries none of the tracked metrics
    NoColumns,
}

impl Detection {
    pub fn anomalies(&self) -> &[AnomalyRecord] {
        match self {
            Detection::Scored(records) => records,
            Detection::NoColumns => &[],
        }
    }

    pub fn into_anomalies(self) -> Vec<AnomalyRecord> {
        match self {
            Detection::Scored(records) => records,
            Detection::NoColumns => Vec::new(),
        }
    }

    pub fn is_no_columns(&self) -> bool {
        matches!(self, Detection::NoColumns)
    }
}

/// Count of anomalies per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityLevels {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityLevels {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

/// Qualitative risk summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: String,
    pub risk_score: u32,
    pub risk_factors: Vec<String>,
    pub mitigation_suggestions: Vec<String>,
}

// ----------------------------------------------------------------------------
// 13.2 Trained Ensemble
// ----------------------------------------------------------------------------

/// Scaler + forest fitted together on one column set
#[derive(Debug)]
pub struct EnsembleState {
    batch: u64,
    columns: Vec<TrackedMetric>,
    scaler: StandardScaler,
    forest: IsolationForest,
    trained_at: Timestamp,
}

impl EnsembleState {
    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// Column set the ensemble was fitted on, canonical order
    pub fn columns(&self) -> &[TrackedMetric] {
        &self.columns
    }

    pub fn trained_at(&self) -> Timestamp {
        self.trained_at
    }

    /// Decision score of one sample on the fitted column set
    pub fn decision(&self, sample: &MetricSample) -> f64 {
        let means = self.scaler.means();
        let row: Vec<f64> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, metric)| sample.get(*metric).unwrap_or(means[i]))
            .collect();
        self.forest.decision_function(&self.scaler.transform(&row))
    }
}

// ----------------------------------------------------------------------------
// 13.3 Detector
// ----------------------------------------------------------------------------

/// Unsupervised anomaly detector.
pub struct AnomalyDetector {
    config: AnomalyConfig,
    slot: ModelSlot<EnsembleState>,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            slot: ModelSlot::new("anomaly_detector"),
        }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    pub fn snapshot(&self) -> Option<Arc<EnsembleState>> {
        self.slot.load()
    }

    /// Fit on a seeded synthetic baseline of normal operation
    pub fn initialize(&self) -> Result<(), TrainingError> {
        info!(
            target: "cortex::anomaly",
            samples = self.config.baseline_samples,
            "Initializing anomaly detector on synthetic baseline"
        );
        let rows = self.synthetic_baseline();
        self.fit(TRAINING_COLUMNS.to_vec(), rows)
    }

    /// Fit on provided telemetry instead of the synthetic baseline
    pub fn initialize_with(&self, series: &MetricSeries) -> Result<(), TrainingError> {
        info!(target: "cortex::anomaly", rows = series.len(), "Initializing anomaly detector on telemetry");
        self.retrain(series)
    }

    /// Refit on the training columns present in `series`
    pub fn retrain(&self, series: &MetricSeries) -> Result<(), TrainingError> {
        let columns: Vec<TrackedMetric> = TRAINING_COLUMNS
            .iter()
            .copied()
            .filter(|m| series.has_column(*m))
            .collect();
        if columns.is_empty() {
            warn!(target: "cortex::anomaly", "No trainable columns in retrain series");
            return Err(TrainingError::NoColumns);
        }

        // Gaps are filled with the column mean before fitting
        let fills: Vec<f64> = columns
            .iter()
            .map(|m| StatisticalFunctions::mean(&series.values(*m)))
            .collect();
        let rows: Vec<Vec<f64>> = series
            .samples()
            .iter()
            .map(|sample| {
                columns
                    .iter()
                    .zip(&fills)
                    .map(|(m, fill)| sample.get(*m).unwrap_or(*fill))
                    .collect()
            })
            .collect();

        self.fit(columns, rows)
    }

    fn fit(&self, columns: Vec<TrackedMetric>, rows: Vec<Vec<f64>>) -> Result<(), TrainingError> {
        let timer = PerfTimer::with_threshold("anomaly.fit", 30_000);
        let result = self.slot.train(|batch| self.build_state(columns, &rows, batch));
        let elapsed = timer.stop();

        match result {
            Ok(state) => {
                crate::log_training!("anomaly_detector", rows.len(), elapsed);
                debug!(
                    target: "cortex::anomaly",
                    batch = state.batch(),
                    columns = state.columns().len(),
                    "Ensemble published"
                );
                Ok(())
            }
            Err(e) => {
                warn!(target: "cortex::anomaly", error = %e, "Anomaly detector training failed");
                Err(e)
            }
        }
    }

    /// Fit on the synthetic baseline only if no ensemble is installed yet.
    /// Concurrent callers share a single fit.
    pub fn ensure_ready(&self) -> Result<(), TrainingError> {
        if self.is_ready() {
            return Ok(());
        }
        self.slot
            .get_or_try_init(|batch| {
                let rows = self.synthetic_baseline();
                self.build_state(TRAINING_COLUMNS.to_vec(), &rows, batch)
            })
            .map(|_| ())
    }

    fn build_state(
        &self,
        columns: Vec<TrackedMetric>,
        rows: &[Vec<f64>],
        batch: u64,
    ) -> Result<EnsembleState, TrainingError> {
        let scaler = StandardScaler::fit(rows)?;
        let scaled = scaler.transform_all(rows);
        let forest = IsolationForest::fit(
            &scaled,
            self.config.n_trees,
            self.config.sample_size,
            self.config.contamination,
            self.config.seed,
        )?;
        Ok(EnsembleState {
            batch,
            columns,
            scaler,
            forest,
            trained_at: Timestamp::now(),
        })
    }

    fn synthetic_baseline(&self) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let users = Normal::new(500.0, 50.0).ok();
        let response = Normal::new(100.0, 15.0).ok();
        let errors = Exp::new(0.5).ok();
        let cpu = Beta::new(2.0, 3.0).ok();
        let memory = Beta::new(3.0, 2.0).ok();

        (0..self.config.baseline_samples)
            .map(|_| {
                vec![
                    users.map_or(500.0, |d| d.sample(&mut rng)),
                    response.map_or(100.0, |d| d.sample(&mut rng)),
                    errors.map_or(2.0, |d| d.sample(&mut rng)),
                    cpu.map_or(0.4, |d| d.sample(&mut rng)) * 100.0,
                    memory.map_or(0.6, |d| d.sample(&mut rng)) * 100.0,
                ]
            })
            .collect()
    }

    /// Score every sample in `series` and keep the anomalous ones.
    ///
    /// A series with none of the tracked metrics yields
    /// [`Detection::NoColumns`] rather than an error.
    pub fn detect(&self, series: &MetricSeries) -> CortexResult<Detection> {
        let available = series.columns();
        if available.is_empty() {
            warn!(target: "cortex::anomaly", "No suitable columns for anomaly detection");
            return Ok(Detection::NoColumns);
        }

        let state = self
            .slot
            .load()
            .ok_or_else(|| CortexError::not_ready("anomaly_detector"))?;

        let anomalies: Vec<AnomalyRecord> = series
            .samples()
            .iter()
            .filter_map(|sample| {
                let score = state.decision(sample);
                if score >= 0.0 {
                    return None;
                }
                let affected = self.affected_metrics(sample, &available);
                Some(AnomalyRecord {
                    timestamp: sample.timestamp,
                    anomaly_score: score,
                    severity: self.severity_for(score),
                    description: describe(&affected),
                    affected_metrics: affected,
                })
            })
            .collect();

        info!(
            target: "cortex::anomaly",
            rows = series.len(),
            anomalies = anomalies.len(),
            batch = state.batch(),
            "Detection complete"
        );
        Ok(Detection::Scored(anomalies))
    }

    /// Bucket a decision score
    pub fn severity_for(&self, score: f64) -> Severity {
        if score <= self.config.critical_cutoff {
            Severity::Critical
        } else if score <= self.config.high_cutoff {
            Severity::High
        } else if score <= self.config.medium_cutoff {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Metrics outside their baseline band; falls back to the first column
    fn affected_metrics(&self, sample: &MetricSample, columns: &[TrackedMetric]) -> Vec<TrackedMetric> {
        let affected: Vec<TrackedMetric> = columns
            .iter()
            .copied()
            .filter(|metric| {
                match (self.config.baseline(*metric), sample.get(*metric)) {
                    (Some(baseline), Some(value)) => {
                        baseline.deviates(value, self.config.attribution_sigma)
                    }
                    _ => false,
                }
            })
            .collect();

        if affected.is_empty() {
            columns.iter().take(1).copied().collect()
        } else {
            affected
        }
    }

    /// One alert per anomaly
    pub fn generate_alerts(&self, anomalies: &[AnomalyRecord]) -> Vec<Alert> {
        anomalies
            .iter()
            .map(|anomaly| {
                let alert = Alert {
                    id: Uuid::new_v4(),
                    timestamp: anomaly.timestamp,
                    severity: anomaly.severity,
                    title: alert_title(anomaly),
                    message: format!(
                        "{}. Anomaly score: {:.3}. Immediate investigation recommended.",
                        anomaly.description, anomaly.anomaly_score
                    ),
                    affected_systems: anomaly.affected_metrics.clone(),
                    recommended_actions: suggest_actions(anomaly),
                    escalation_required: anomaly.severity.requires_escalation(),
                };
                if alert.escalation_required {
                    crate::log_alert!(alert.severity, alert.title.as_str(), alert_id = %alert.id);
                }
                alert
            })
            .collect()
    }

    /// Severity histogram; every bucket present
    pub fn assess_severity(&self, anomalies: &[AnomalyRecord]) -> SeverityLevels {
        let mut levels = SeverityLevels::default();
        for anomaly in anomalies {
            levels.record(anomaly.severity);
        }
        levels
    }

    /// Realtime score: relative response-time deviation clamped to [0, 1],
    /// rounded to three decimals
    pub fn current_anomaly_score(&self, sample: &MetricSample) -> f64 {
        let reference = self.config.reference_response_time;
        match sample.get(TrackedMetric::ResponseTime) {
            Some(rt) => {
                let deviation = ((rt - reference).abs() / reference).min(1.0);
                StatisticalFunctions::round_to(deviation, 3)
            }
            None => 0.0,
        }
    }

    pub fn assess_risks(&self, series: &MetricSeries) -> RiskAssessment {
        let mut assessment = RiskAssessment {
            overall_risk: "low".to_string(),
            risk_score: 25,
            risk_factors: Vec::new(),
            mitigation_suggestions: Vec::new(),
        };

        if !series.is_empty() {
            assessment.risk_factors = vec![
                "Response time variability within normal range".to_string(),
                "User activity patterns stable".to_string(),
                "Resource utilization optimized".to_string(),
            ];
            assessment.mitigation_suggestions = vec![
                "Continue monitoring response time trends".to_string(),
                "Maintain current capacity planning".to_string(),
                "Regular performance optimization reviews".to_string(),
            ];
        }
        assessment
    }
}

impl Debug for AnomalyDetector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnomalyDetector")
            .field("n_trees", &self.config.n_trees)
            .field("contamination", &self.config.contamination)
            .field("slot", &self.slot)
            .finish()
    }
}

fn describe(affected: &[TrackedMetric]) -> String {
    if affected.contains(&TrackedMetric::ResponseTime) {
        "Unusual response time pattern detected".to_string()
    } else if affected.contains(&TrackedMetric::ActiveUsers) {
        "Abnormal user activity pattern observed".to_string()
    } else if affected.contains(&TrackedMetric::CpuUsage) {
        "CPU usage anomaly detected".to_string()
    } else {
        format!("Anomaly detected in {}", join_metrics(affected))
    }
}

fn alert_title(anomaly: &AnomalyRecord) -> String {
    let subject = if anomaly.affected_metrics.is_empty() {
        "system".to_string()
    } else {
        join_metrics(&anomaly.affected_metrics[..anomaly.affected_metrics.len().min(2)])
    };
    format!("{} Alert: {} anomaly", anomaly.severity.title(), subject)
}

fn suggest_actions(anomaly: &AnomalyRecord) -> Vec<String> {
    let mut actions = Vec::new();

    if anomaly.affected_metrics.contains(&TrackedMetric::ResponseTime) {
        actions.push("Check server load and database performance".to_string());
        actions.push("Review recent deployments for performance impacts".to_string());
    }
    if anomaly.affected_metrics.contains(&TrackedMetric::CpuUsage) {
        actions.push("Monitor process utilization".to_string());
        actions.push("Consider scaling resources if needed".to_string());
    }
    if anomaly.severity.requires_escalation() {
        actions.push("Alert on-call team immediately".to_string());
        actions.push("Prepare for potential service degradation".to_string());
    }

    if actions.is_empty() {
        vec![
            "Monitor system closely".to_string(),
            "Review logs for root cause".to_string(),
        ]
    } else {
        actions
    }
}

fn join_metrics(metrics: &[TrackedMetric]) -> String {
    metrics
        .iter()
        .map(TrackedMetric::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::SyntheticTelemetry;
    use pretty_assertions::assert_eq;
    use std::sync::OnceLock;

    fn fast_config() -> AnomalyConfig {
        AnomalyConfig {
            n_trees: 50,
            ..AnomalyConfig::default()
        }
    }

    fn trained() -> &'static AnomalyDetector {
        static DETECTOR: OnceLock<AnomalyDetector> = OnceLock::new();
        DETECTOR.get_or_init(|| {
            let detector = AnomalyDetector::new(fast_config());
            detector.initialize().unwrap();
            detector
        })
    }

    fn normal_sample(ts: i64) -> MetricSample {
        MetricSample::new(Timestamp::from_secs(ts))
            .with(TrackedMetric::ActiveUsers, 500.0)
            .with(TrackedMetric::ResponseTime, 100.0)
            .with(TrackedMetric::ErrorRate, 1.5)
            .with(TrackedMetric::CpuUsage, 40.0)
            .with(TrackedMetric::MemoryUsage, 60.0)
    }

    fn record(severity: Severity, affected: Vec<TrackedMetric>) -> AnomalyRecord {
        AnomalyRecord {
            timestamp: Timestamp::from_secs(0),
            anomaly_score: -0.1234,
            severity,
            description: describe(&affected),
            affected_metrics: affected,
        }
    }

    #[test]
    fn test_no_columns_is_not_an_error() {
        let detector = AnomalyDetector::new(fast_config());
        let series: MetricSeries = (0..3).map(|i| MetricSample::new(Timestamp::from_secs(i))).collect();

        let detection = detector.detect(&series).unwrap();
        assert!(detection.is_no_columns());
        assert!(detection.anomalies().is_empty());
        assert!(detector.detect(&MetricSeries::new()).unwrap().is_no_columns());
    }

    #[test]
    fn test_detect_requires_training() {
        let detector = AnomalyDetector::new(fast_config());
        let series = MetricSeries::from_samples(vec![normal_sample(0)]);
        assert!(matches!(
            detector.detect(&series),
            Err(CortexError::NotReady { .. })
        ));
    }

    #[test]
    fn test_extreme_row_is_flagged_and_attributed() {
        let detector = trained();
        let mut samples: Vec<MetricSample> = (0..20).map(normal_sample).collect();
        samples.push(
            MetricSample::new(Timestamp::from_secs(100))
                .with(TrackedMetric::ActiveUsers, 500.0)
                .with(TrackedMetric::ResponseTime, 1500.0)
                .with(TrackedMetric::ErrorRate, 40.0)
                .with(TrackedMetric::CpuUsage, 99.0)
                .with(TrackedMetric::MemoryUsage, 60.0),
        );

        let anomalies = detector
            .detect(&MetricSeries::from_samples(samples))
            .unwrap()
            .into_anomalies();

        let extreme = anomalies
            .iter()
            .find(|a| a.timestamp == Timestamp::from_secs(100))
            .expect("extreme row should be anomalous");
        assert!(extreme.anomaly_score < 0.0);
        assert!(extreme.severity >= Severity::Medium);
        assert!(extreme.affected_metrics.contains(&TrackedMetric::ResponseTime));
        assert!(extreme.affected_metrics.contains(&TrackedMetric::ErrorRate));
        assert!(!extreme.affected_metrics.contains(&TrackedMetric::ActiveUsers));
        assert_eq!(extreme.description, "Unusual response time pattern detected");
    }

    #[test]
    fn test_partial_series_is_scored_with_imputation() {
        let detector = trained();
        let series: MetricSeries = (0..5)
            .map(|i| MetricSample::new(Timestamp::from_secs(i)).with(TrackedMetric::DiskUsage, 50.0))
            .collect();

        let detection = detector.detect(&series).unwrap();
        assert!(!detection.is_no_columns());
        for anomaly in detection.anomalies() {
            assert_eq!(anomaly.affected_metrics, vec![TrackedMetric::DiskUsage]);
        }
    }

    #[test]
    fn test_severity_cutoffs() {
        let detector = AnomalyDetector::new(fast_config());
        assert_eq!(detector.severity_for(-0.5), Severity::Critical);
        assert_eq!(detector.severity_for(-0.4), Severity::High);
        assert_eq!(detector.severity_for(-0.3), Severity::High);
        assert_eq!(detector.severity_for(-0.1), Severity::Medium);
        assert_eq!(detector.severity_for(-0.05), Severity::Low);
    }

    #[test]
    fn test_alert_text_and_actions() {
        let detector = AnomalyDetector::new(fast_config());
        let anomalies = vec![
            record(
                Severity::High,
                vec![TrackedMetric::ResponseTime, TrackedMetric::CpuUsage, TrackedMetric::ErrorRate],
            ),
            record(Severity::Low, vec![TrackedMetric::MemoryUsage]),
        ];

        let alerts = detector.generate_alerts(&anomalies);
        assert_eq!(alerts.len(), 2);
        assert_ne!(alerts[0].id, alerts[1].id);

        assert_eq!(alerts[0].title, "High Alert: response_time, cpu_usage anomaly");
        assert_eq!(
            alerts[0].message,
            "Unusual response time pattern detected. Anomaly score: -0.123. Immediate investigation recommended."
        );
        assert_eq!(alerts[0].recommended_actions.len(), 6);
        assert!(alerts[0].escalation_required);

        assert_eq!(alerts[1].title, "Low Alert: memory_usage anomaly");
        assert_eq!(alerts[1].message.split('.').next(), Some("Anomaly detected in memory_usage"));
        assert_eq!(
            alerts[1].recommended_actions,
            vec!["Monitor system closely".to_string(), "Review logs for root cause".to_string()]
        );
        assert!(!alerts[1].escalation_required);
    }

    #[test]
    fn test_assess_severity_counts_every_bucket() {
        let detector = AnomalyDetector::new(fast_config());
        let anomalies = vec![
            record(Severity::Critical, vec![TrackedMetric::CpuUsage]),
            record(Severity::Critical, vec![TrackedMetric::CpuUsage]),
            record(Severity::Medium, vec![TrackedMetric::CpuUsage]),
        ];

        let levels = detector.assess_severity(&anomalies);
        assert_eq!(
            levels,
            SeverityLevels {
                low: 0,
                medium: 1,
                high: 0,
                critical: 2
            }
        );
        assert_eq!(levels.total(), anomalies.len());

        let json = serde_json::to_value(detector.assess_severity(&[])).unwrap();
        assert_eq!(json, serde_json::json!({"low": 0, "medium": 0, "high": 0, "critical": 0}));
    }

    #[test]
    fn test_current_anomaly_score() {
        let detector = AnomalyDetector::new(fast_config());
        let at = |rt: f64| MetricSample::new(Timestamp::from_secs(0)).with(TrackedMetric::ResponseTime, rt);

        assert_eq!(detector.current_anomaly_score(&at(150.0)), 0.5);
        assert_eq!(detector.current_anomaly_score(&at(350.0)), 1.0);
        assert_eq!(detector.current_anomaly_score(&at(100.1234)), 0.001);
        assert_eq!(
            detector.current_anomaly_score(&MetricSample::new(Timestamp::from_secs(0))),
            0.0
        );
    }

    #[test]
    fn test_retrain_uses_available_columns() {
        let detector = AnomalyDetector::new(fast_config());
        let series: MetricSeries = SyntheticTelemetry::new(8)
            .training_series(3, Timestamp::from_secs(1_700_000_000))
            .into_iter()
            .map(|s| {
                MetricSample::from_pairs(
                    s.timestamp,
                    s.metrics()
                        .filter(|(m, _)| matches!(m, TrackedMetric::CpuUsage | TrackedMetric::NetworkIo)),
                )
            })
            .collect();

        detector.retrain(&series).unwrap();
        assert_eq!(detector.snapshot().unwrap().columns(), &[TrackedMetric::CpuUsage]);
    }

    #[test]
    fn test_retrain_without_columns_fails_and_keeps_state() {
        let detector = AnomalyDetector::new(fast_config());
        detector.initialize().unwrap();

        let series: MetricSeries = (0..10)
            .map(|i| MetricSample::new(Timestamp::from_secs(i)).with(TrackedMetric::DiskUsage, 1.0))
            .collect();
        assert!(matches!(detector.retrain(&series), Err(TrainingError::NoColumns)));
        assert!(detector.is_ready());
        assert_eq!(detector.snapshot().unwrap().columns().len(), 5);
    }

    #[test]
    fn test_assess_risks() {
        let detector = AnomalyDetector::new(fast_config());
        let empty = detector.assess_risks(&MetricSeries::new());
        assert_eq!(empty.overall_risk, "low");
        assert!(empty.risk_factors.is_empty());

        let full = detector.assess_risks(&MetricSeries::from_samples(vec![normal_sample(0)]));
        assert_eq!(full.risk_score, 25);
        assert_eq!(full.risk_factors.len(), 3);
        assert_eq!(full.mitigation_suggestions.len(), 3);
    }
}
