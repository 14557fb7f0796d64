// ============================================================================
// SECTION 3: CORE TYPE SYSTEM
// ============================================================================
// The data every component of the engine agrees on: timestamps, the closed
// set of tracked metrics, samples and series, and the two ordered
// classifications (severity, priority) that flow out to consumers.
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::CortexError;

// ----------------------------------------------------------------------------
// 3.1 Timestamp
// ----------------------------------------------------------------------------

/// Timestamp in nanoseconds since Unix epoch.
/// Serialized as an RFC 3339 string so payloads read like the dashboard expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "DateTime<Utc>", from = "DateTime<Utc>")]
#[repr(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new timestamp from nanoseconds since Unix epoch
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Create a new timestamp from seconds since Unix epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1_000_000_000)
    }

    /// Get the current timestamp
    #[inline]
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_nanos() as i64)
    }

    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.0 / 1_000_000_000
    }

    /// Add duration to timestamp
    #[inline]
    pub fn add_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_nanos() as i64))
    }

    /// Subtract duration from timestamp
    #[inline]
    pub fn sub_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_nanos() as i64))
    }

    /// Calculate duration between two timestamps
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        let nanos = self.0.saturating_sub(earlier.0);
        Duration::from_nanos(nanos.max(0) as u64)
    }

    /// Convert to chrono DateTime<Utc>
    #[inline]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or_default()
    }

    /// Create from chrono DateTime<Utc>
    #[inline]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_nanos_opt().unwrap_or(0))
    }

    /// Hour of day (0-23, UTC)
    pub fn hour_of_day(&self) -> u32 {
        self.to_datetime().hour()
    }

    /// Hour of week (0-167, UTC, Monday 00:00 = 0)
    pub fn hour_of_week(&self) -> u32 {
        let dt = self.to_datetime();
        dt.hour() + dt.weekday().num_days_from_monday() * 24
    }

    /// Zero timestamp (Unix epoch)
    pub const EPOCH: Timestamp = Timestamp(0);
}

impl Default for Timestamp {
    #[inline]
    fn default() -> Self {
        Self::now()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    #[inline]
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.to_datetime()
    }
}

// ----------------------------------------------------------------------------
// 3.2 Tracked Metrics
// ----------------------------------------------------------------------------

/// The closed set of telemetry columns the engine understands.
///
/// Declaration order is the canonical column order used for detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedMetric {
    ActiveUsers,
    ResponseTime,
    ErrorRate,
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    NetworkIo,
}

impl TrackedMetric {
    /// Every tracked metric, in canonical column order
    pub const ALL: [TrackedMetric; 7] = [
        TrackedMetric::ActiveUsers,
        TrackedMetric::ResponseTime,
        TrackedMetric::ErrorRate,
        TrackedMetric::CpuUsage,
        TrackedMetric::MemoryUsage,
        TrackedMetric::DiskUsage,
        TrackedMetric::NetworkIo,
    ];

    /// Wire name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedMetric::ActiveUsers => "active_users",
            TrackedMetric::ResponseTime => "response_time",
            TrackedMetric::ErrorRate => "error_rate",
            TrackedMetric::CpuUsage => "cpu_usage",
            TrackedMetric::MemoryUsage => "memory_usage",
            TrackedMetric::DiskUsage => "disk_usage",
            TrackedMetric::NetworkIo => "network_io",
        }
    }
}

impl Display for TrackedMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedMetric {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackedMetric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CortexError::unknown_metric(s))
    }
}

// ----------------------------------------------------------------------------
// 3.3 Metric Sample & Series
// ----------------------------------------------------------------------------

/// One observation across the tracked metrics.
///
/// Absent metrics stay absent; every consumer decides its own
/// missing-field policy instead of reading a silent zero.
///
/// Deserialization keeps the keys that name a tracked metric and skips every
/// other column, so foreign fields never reject a whole series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    values: BTreeMap<TrackedMetric, f64>,
}

/// Wire shape before column filtering
#[derive(Deserialize)]
struct RawSample {
    timestamp: Timestamp,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'de> Deserialize<'de> for MetricSample {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawSample::deserialize(deserializer)?;
        let mut values = BTreeMap::new();
        for (key, value) in raw.fields {
            let Ok(metric) = key.parse::<TrackedMetric>() else {
                debug!(column = %key, "Skipping untracked column");
                continue;
            };
            let value = value
                .as_f64()
                .ok_or_else(|| de::Error::custom(format!("{key} must be a number")))?;
            values.insert(metric, value);
        }
        Ok(MetricSample {
            timestamp: raw.timestamp,
            values,
        })
    }
}

impl MetricSample {
    /// Create an empty sample at the given time
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Set a metric value (builder style)
    pub fn with(mut self, metric: TrackedMetric, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    /// Build a sample from `(metric, value)` pairs
    pub fn from_pairs<I>(timestamp: Timestamp, pairs: I) -> Self
    where
        I: IntoIterator<Item = (TrackedMetric, f64)>,
    {
        Self {
            timestamp,
            values: pairs.into_iter().collect(),
        }
    }

    #[inline]
    pub fn get(&self, metric: TrackedMetric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    #[inline]
    pub fn has(&self, metric: TrackedMetric) -> bool {
        self.values.contains_key(&metric)
    }

    /// Present metrics in canonical order
    pub fn metrics(&self) -> impl Iterator<Item = (TrackedMetric, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Time-ascending sequence of samples.
///
/// Timestamps are expected to be strictly increasing; producers guarantee it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries {
    samples: Vec<MetricSample>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<MetricSample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&MetricSample> {
        self.samples.last()
    }

    /// The trailing `n` samples (fewer if the series is shorter)
    pub fn tail(&self, n: usize) -> &[MetricSample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    /// One metric column, with gaps preserved
    pub fn column(&self, metric: TrackedMetric) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.get(metric)).collect()
    }

    /// Present values of one metric column, gaps dropped
    pub fn values(&self, metric: TrackedMetric) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.get(metric)).collect()
    }

    /// A series has a column if any sample carries the metric
    pub fn has_column(&self, metric: TrackedMetric) -> bool {
        self.samples.iter().any(|s| s.has(metric))
    }

    /// Columns present in the series, in canonical order
    pub fn columns(&self) -> Vec<TrackedMetric> {
        TrackedMetric::ALL
            .iter()
            .copied()
            .filter(|m| self.has_column(*m))
            .collect()
    }

    /// Check the strictly-increasing timestamp invariant
    pub fn is_time_ordered(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp)
    }
}

impl FromIterator<MetricSample> for MetricSeries {
    fn from_iter<T: IntoIterator<Item = MetricSample>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MetricSeries {
    type Item = MetricSample;
    type IntoIter = std::vec::IntoIter<MetricSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetricSeries {
    type Item = &'a MetricSample;
    type IntoIter = std::slice::Iter<'a, MetricSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

// ----------------------------------------------------------------------------
// 3.4 Priority & Severity - Importance Classification
// ----------------------------------------------------------------------------

/// Severity level for anomalies and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    /// Low severity - can be addressed later
    Low = 0,
    /// Medium severity - should be addressed soon
    Medium = 1,
    /// High severity - needs attention
    High = 2,
    /// Critical severity - immediate action required
    Critical = 3,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Capitalized form used in alert titles
    pub fn title(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// High and critical findings page the on-call rotation
    pub fn requires_escalation(&self) -> bool {
        *self >= Severity::High
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a recommendation or planned action.
/// Higher variants outrank lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Priority {
    /// Sort rank: critical first (0), low last (3)
    #[inline]
    pub const fn rank(&self) -> u8 {
        Priority::Critical as u8 - *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tracked_metric_round_trip_names() {
        for metric in TrackedMetric::ALL {
            assert_eq!(metric.as_str().parse::<TrackedMetric>().unwrap(), metric);
        }
        let err = "latency_p99".parse::<TrackedMetric>().unwrap_err();
        assert!(matches!(err, CortexError::UnknownMetric { .. }));
    }

    #[test]
    fn test_sample_serializes_flat() {
        let sample = MetricSample::new(Timestamp::from_secs(0))
            .with(TrackedMetric::CpuUsage, 42.5)
            .with(TrackedMetric::ResponseTime, 120.0);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["cpu_usage"], 42.5);
        assert_eq!(json["response_time"], 120.0);
        assert!(json["timestamp"].as_str().unwrap().starts_with("1970-01-01T00:00:00"));

        let back: MetricSample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_untracked_columns_are_skipped() {
        let series: MetricSeries = serde_json::from_str(
            r#"[
                {"timestamp":"2024-01-01T00:00:00Z","cpu_usage":41.0,"region_code":"eu-west"},
                {"timestamp":"2024-01-01T00:01:00Z","cpu_usage":43.0,"hostname_id":7.0}
            ]"#,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.columns(), vec![TrackedMetric::CpuUsage]);
        assert_eq!(series.values(TrackedMetric::CpuUsage), vec![41.0, 43.0]);
    }

    #[test]
    fn test_untracked_only_series_parses_empty() {
        let series: MetricSeries =
            serde_json::from_str(r#"[{"timestamp":"2024-01-01T00:00:00Z","hostname_id":1.0}]"#)
                .unwrap();
        assert_eq!(series.len(), 1);
        assert!(series.columns().is_empty());
    }

    #[test]
    fn test_tracked_column_must_be_numeric() {
        let err = serde_json::from_str::<MetricSample>(
            r#"{"timestamp":"2024-01-01T00:00:00Z","cpu_usage":"high"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cpu_usage"));
    }

    #[test]
    fn test_sample_requires_timestamp() {
        let err = serde_json::from_str::<MetricSample>(r#"{"cpu_usage":1.0}"#).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_series_columns_follow_canonical_order() {
        let series: MetricSeries = (0..3)
            .map(|i| {
                MetricSample::new(Timestamp::from_secs(i))
                    .with(TrackedMetric::MemoryUsage, 50.0)
                    .with(TrackedMetric::ActiveUsers, 400.0)
            })
            .collect();

        assert_eq!(
            series.columns(),
            vec![TrackedMetric::ActiveUsers, TrackedMetric::MemoryUsage]
        );
        assert!(series.is_time_ordered());
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 3);
    }

    #[test]
    fn test_time_order_detects_duplicates() {
        let ts = Timestamp::from_secs(10);
        let series = MetricSeries::from_samples(vec![MetricSample::new(ts), MetricSample::new(ts)]);
        assert!(!series.is_time_ordered());
    }

    #[test]
    fn test_hour_encodings() {
        // 1970-01-01 was a Thursday
        let ts = Timestamp::from_secs(5 * 3600);
        assert_eq!(ts.hour_of_day(), 5);
        assert_eq!(ts.hour_of_week(), 5 + 3 * 24);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.requires_escalation());
        assert!(!Severity::Medium.requires_escalation());
    }

    #[test]
    fn test_priority_rank() {
        assert_eq!(Priority::Critical.rank(), 0);
        assert_eq!(Priority::High.rank(), 1);
        assert_eq!(Priority::Medium.rank(), 2);
        assert_eq!(Priority::Low.rank(), 3);
    }
}
