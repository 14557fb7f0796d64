// ============================================================================
// SECTION 11: TELEMETRY PROVIDERS
// ============================================================================
// The engine pulls telemetry through `TelemetryProvider`. Collection and
// storage live outside the engine; `SyntheticTelemetry` generates realistic
// seeded series for development, demos and tests.
// ============================================================================

use std::f64::consts::PI;
use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp, Normal, Poisson};
use tracing::debug;

use crate::error::{CortexError, CortexResult};
use crate::types::{MetricSample, MetricSeries, Timestamp, TrackedMetric};

// ----------------------------------------------------------------------------
// 11.1 Provider Trait
// ----------------------------------------------------------------------------

/// Source of telemetry for inference and training.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Samples covering the last `hours` hours, oldest first
    async fn recent_metrics(&self, hours: u32) -> CortexResult<MetricSeries>;

    /// The latest snapshot
    async fn current_metrics(&self) -> CortexResult<MetricSample>;

    /// Historical samples covering the last `days` days, oldest first
    async fn training_data(&self, days: u32) -> CortexResult<MetricSeries>;
}

// ----------------------------------------------------------------------------
// 11.2 Synthetic Telemetry
// ----------------------------------------------------------------------------

const RECENT_STEP: Duration = Duration::from_secs(5 * 60);
const TRAINING_STEP: Duration = Duration::from_secs(60 * 60);

/// 5-minute slots per day; also drives the user-activity cycle
const DAILY_SLOTS: usize = 288;

/// Seeded generator of realistic telemetry shapes: a daily user cycle,
/// load-correlated latency and CPU, slowly growing memory and disk, and
/// sparse error spikes.
pub struct SyntheticTelemetry {
    rng: Mutex<StdRng>,
}

impl SyntheticTelemetry {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// 5-minute samples over the `hours` hours ending at `end` (inclusive)
    pub fn recent_series(&self, hours: u32, end: Timestamp) -> MetricSeries {
        let n = hours as usize * 12 + 1;
        let series = self.generate(n, end, RECENT_STEP);
        debug!(target: "cortex::engine", records = series.len(), "Generated recent metrics");
        series
    }

    /// Hourly samples over the `days` days ending at `end` (inclusive)
    pub fn training_series(&self, days: u32, end: Timestamp) -> MetricSeries {
        let n = days as usize * 24 + 1;
        let series = self.generate(n, end, TRAINING_STEP);
        debug!(target: "cortex::engine", records = series.len(), days, "Generated training metrics");
        series
    }

    /// One realistic current snapshot
    pub fn current_sample(&self, now: Timestamp) -> MetricSample {
        let mut guard = self.rng.lock();
        let rng = &mut *guard;
        let users = Poisson::new(450.0).map(|p| p.sample(rng)).unwrap_or(450.0) + 50.0;

        MetricSample::from_pairs(
            now,
            [
                (TrackedMetric::ActiveUsers, users),
                (TrackedMetric::ResponseTime, normal(rng, 100.0, 20.0).max(50.0)),
                (TrackedMetric::CpuUsage, normal(rng, 45.0, 15.0).clamp(10.0, 90.0)),
                (TrackedMetric::MemoryUsage, normal(rng, 55.0, 12.0).clamp(20.0, 85.0)),
                (TrackedMetric::ErrorRate, exponential(rng, 2.0).max(0.0)),
                (TrackedMetric::DiskUsage, normal(rng, 50.0, 8.0).clamp(30.0, 80.0)),
                (TrackedMetric::NetworkIo, normal(rng, 500.0, 100.0).max(100.0)),
            ],
        )
    }

    fn generate(&self, n: usize, end: Timestamp, step: Duration) -> MetricSeries {
        let mut guard = self.rng.lock();
        let rng = &mut *guard;
        let start = end.sub_duration(step * (n.saturating_sub(1)) as u32);
        let spikes = Bernoulli::new(0.05).ok();

        (0..n)
            .map(|i| {
                let progress = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                let slot = (i % DAILY_SLOTS) as f64;
                let daily = 100.0 * (2.0 * PI * slot / DAILY_SLOTS as f64 - PI / 2.0).sin() + 100.0;

                let users = (400.0 + daily + normal(rng, 0.0, 50.0)).max(50.0).floor();
                let response = (100.0 * rng.gen_range(0.8..1.2) + normal(rng, 0.0, 20.0)).max(50.0);
                let cpu = (45.0 * rng.gen_range(0.5..1.5) + normal(rng, 0.0, 10.0)).clamp(10.0, 95.0);
                let memory = (55.0 + 10.0 * progress + normal(rng, 0.0, 8.0)).clamp(20.0, 90.0);
                let spike = match spikes {
                    Some(b) if b.sample(rng) => exponential(rng, 5.0),
                    _ => 0.0,
                };
                let errors = exponential(rng, 1.5) + spike;
                let disk = (50.0 + 5.0 * progress + normal(rng, 0.0, 3.0)).clamp(30.0, 85.0);
                let network = (500.0 * rng.gen_range(0.6..1.4) + normal(rng, 0.0, 100.0)).max(100.0);

                MetricSample::from_pairs(
                    start.add_duration(step * i as u32),
                    [
                        (TrackedMetric::ActiveUsers, users),
                        (TrackedMetric::ResponseTime, response),
                        (TrackedMetric::CpuUsage, cpu),
                        (TrackedMetric::MemoryUsage, memory),
                        (TrackedMetric::ErrorRate, errors),
                        (TrackedMetric::DiskUsage, disk),
                        (TrackedMetric::NetworkIo, network),
                    ],
                )
            })
            .collect()
    }
}

impl Default for SyntheticTelemetry {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Debug for SyntheticTelemetry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticTelemetry").finish_non_exhaustive()
    }
}

#[async_trait]
impl TelemetryProvider for SyntheticTelemetry {
    async fn recent_metrics(&self, hours: u32) -> CortexResult<MetricSeries> {
        Ok(self.recent_series(hours, Timestamp::now()))
    }

    async fn current_metrics(&self) -> CortexResult<MetricSample> {
        Ok(self.current_sample(Timestamp::now()))
    }

    async fn training_data(&self, days: u32) -> CortexResult<MetricSeries> {
        if days == 0 {
            return Err(CortexError::telemetry("training window must cover at least one day"));
        }
        Ok(self.training_series(days, Timestamp::now()))
    }
}

fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    Normal::new(mean, std).map(|d| d.sample(rng)).unwrap_or(mean)
}

/// Exponential draw parameterized by its mean
fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    Exp::new(1.0 / mean).map(|d| d.sample(rng)).unwrap_or(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_series_shape() {
        let telemetry = SyntheticTelemetry::new(42);
        let end = Timestamp::from_secs(1_700_000_000);
        let series = telemetry.recent_series(24, end);

        assert_eq!(series.len(), 289);
        assert!(series.is_time_ordered());
        assert_eq!(series.last().unwrap().timestamp, end);
        assert_eq!(series.columns().len(), TrackedMetric::ALL.len());

        for sample in &series {
            assert!(sample.get(TrackedMetric::ActiveUsers).unwrap() >= 50.0);
            assert!(sample.get(TrackedMetric::ResponseTime).unwrap() >= 50.0);
            let cpu = sample.get(TrackedMetric::CpuUsage).unwrap();
            assert!((10.0..=95.0).contains(&cpu));
        }
    }

    #[test]
    fn test_training_series_is_hourly() {
        let telemetry = SyntheticTelemetry::new(1);
        let end = Timestamp::from_secs(1_700_000_000);
        let series = telemetry.training_series(2, end);

        assert_eq!(series.len(), 49);
        let gap = series.samples()[1]
            .timestamp
            .duration_since(series.samples()[0].timestamp);
        assert_eq!(gap, TRAINING_STEP);
    }

    #[test]
    fn test_same_seed_same_series() {
        let end = Timestamp::from_secs(1_700_000_000);
        let a = SyntheticTelemetry::new(9).training_series(1, end);
        let b = SyntheticTelemetry::new(9).training_series(1, end);
        assert_eq!(a, b);
    }

    #[test]
    fn test_current_sample_bounds() {
        let sample = SyntheticTelemetry::new(3).current_sample(Timestamp::from_secs(0));
        assert!(sample.get(TrackedMetric::ActiveUsers).unwrap() >= 50.0);
        let memory = sample.get(TrackedMetric::MemoryUsage).unwrap();
        assert!((20.0..=85.0).contains(&memory));
    }

    #[tokio::test]
    async fn test_provider_rejects_empty_training_window() {
        let telemetry = SyntheticTelemetry::new(0);
        assert!(telemetry.training_data(0).await.is_err());
        assert!(!telemetry.training_data(1).await.unwrap().is_empty());
    }
}
