// ============================================================================
// SECTION 7: STATISTICS & SCALING
// ============================================================================

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

// ----------------------------------------------------------------------------
// 7.1 Statistical Functions
// ----------------------------------------------------------------------------

/// Statistical functions over plain value slices.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalFunctions;

impl StatisticalFunctions {
    /// Arithmetic mean; 0 for an empty slice.
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Sample variance (n-1 denominator); 0 below two values.
    pub fn variance(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(values);
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    }

    /// Sample standard deviation.
    pub fn std_dev(values: &[f64]) -> f64 {
        Self::variance(values).sqrt()
    }

    /// Population standard deviation (n denominator).
    pub fn population_std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(values);
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
    }

    pub fn min(values: &[f64]) -> f64 {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(values: &[f64]) -> f64 {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Percentile with linear interpolation between closest ranks.
    /// `q` is a fraction in [0, 1].
    pub fn percentile(values: &[f64], q: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();

        let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let weight = rank - lower as f64;

        sorted[lower].0 + (sorted[upper].0 - sorted[lower].0) * weight
    }

    /// Mean of consecutive differences; 0 below two values.
    pub fn mean_diff(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        Self::mean(&diffs)
    }

    /// Round to a fixed number of decimal places.
    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }
}

// ----------------------------------------------------------------------------
// 7.2 Standard Scaler
// ----------------------------------------------------------------------------

/// Per-column z-score standardization.
///
/// Uses the population standard deviation; a constant column scales by 1 so
/// it maps to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column statistics over row-major data
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, TrainingError> {
        let width = match rows.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => {
                return Err(TrainingError::InsufficientData {
                    required: 1,
                    actual: 0,
                })
            }
        };

        if rows.iter().any(|row| row.len() != width) {
            return Err(TrainingError::degenerate("rows have inconsistent widths"));
        }

        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|row| row[col]).collect();
            if column.iter().any(|v| !v.is_finite()) {
                return Err(TrainingError::degenerate(format!(
                    "column {} contains non-finite values",
                    col
                )));
            }
            means.push(StatisticalFunctions::mean(&column));
            let std = StatisticalFunctions::population_std_dev(&column);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    /// Number of columns the scaler was fitted on
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Standardize one row. Missing trailing columns are treated as the mean.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        self.means
            .iter()
            .zip(&self.scales)
            .enumerate()
            .map(|(i, (mean, scale))| match row.get(i) {
                Some(v) => (v - mean) / scale,
                None => 0.0,
            })
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
