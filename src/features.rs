// ============================================================================
// SECTION 8: FEATURE WINDOW
// ============================================================================
// Turns a trailing window of one metric column into a fixed-width vector:
//   [mean, std, min, max, hour-of-day, hour-of-week]
// ============================================================================

use crate::stats::StatisticalFunctions;
use crate::types::{MetricSample, MetricSeries, Timestamp, TrackedMetric};
use crate::{DEFAULT_FEATURE_WINDOW, DEFAULT_WINDOW_STATS, FEATURE_VECTOR_LEN, HOURS_PER_DAY, HOURS_PER_WEEK};

/// Fixed-width model input
pub type FeatureVector = [f64; FEATURE_VECTOR_LEN];

/// Derives feature vectors from a trailing window of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWindow {
    size: usize,
}

impl Default for FeatureWindow {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_WINDOW)
    }
}

impl FeatureWindow {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Supervised pairs for one metric.
    ///
    /// For each index `i >= W` the window is `series[i-W..i]` and the target
    /// is `series[i]`. The time slots are positional (`i % 24`, `i % 168`),
    /// matching an hourly training series. Samples lacking the metric are
    /// skipped inside a window; pairs with a missing target or an empty
    /// window are dropped.
    pub fn training_pairs(&self, series: &MetricSeries, metric: TrackedMetric) -> Vec<(FeatureVector, f64)> {
        let samples = series.samples();
        if samples.len() <= self.size {
            return Vec::new();
        }

        (self.size..samples.len())
            .filter_map(|i| {
                let target = samples[i].get(metric)?;
                let stats = Self::window_stats(&samples[i - self.size..i], metric)?;
                let features = [
                    stats[0],
                    stats[1],
                    stats[2],
                    stats[3],
                    (i % HOURS_PER_DAY) as f64,
                    (i % HOURS_PER_WEEK) as f64,
                ];
                Some((features, target))
            })
            .collect()
    }

    /// Feature vector for the trailing window, stamped with the current time
    pub fn inference_features(&self, series: &MetricSeries, metric: TrackedMetric) -> FeatureVector {
        self.inference_features_at(series, metric, Timestamp::now())
    }

    /// Feature vector for the trailing window, stamped with `now`.
    ///
    /// Falls back to [`FeatureWindow::default_vector`] when the window holds
    /// no values for the metric.
    pub fn inference_features_at(
        &self,
        series: &MetricSeries,
        metric: TrackedMetric,
        now: Timestamp,
    ) -> FeatureVector {
        match Self::window_stats(series.tail(self.size), metric) {
            Some(stats) => [
                stats[0],
                stats[1],
                stats[2],
                stats[3],
                now.hour_of_day() as f64,
                now.hour_of_week() as f64,
            ],
            None => Self::default_vector(now),
        }
    }

    /// `[100, 10, 80, 120, hour, hour + weekday * 24]`
    pub fn default_vector(now: Timestamp) -> FeatureVector {
        [
            DEFAULT_WINDOW_STATS[0],
            DEFAULT_WINDOW_STATS[1],
            DEFAULT_WINDOW_STATS[2],
            DEFAULT_WINDOW_STATS[3],
            now.hour_of_day() as f64,
            now.hour_of_week() as f64,
        ]
    }

    fn window_stats(window: &[MetricSample], metric: TrackedMetric) -> Option<[f64; 4]> {
        let values: Vec<f64> = window.iter().filter_map(|s| s.get(metric)).collect();
        if values.is_empty() {
            return None;
        }
        Some([
            StatisticalFunctions::mean(&values),
            StatisticalFunctions::std_dev(&values),
            StatisticalFunctions::min(&values),
            StatisticalFunctions::max(&values),
        ])
    }
}
