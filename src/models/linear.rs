//! Ordinary least squares over standardized features.

use crate::error::TrainingError;
use crate::stats::StatisticalFunctions;

use super::Regressor;

/// Small ridge term keeping the normal equations solvable when a feature is
/// constant or two features are collinear.
const RIDGE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegressor {
    /// Solve the centered normal equations by Gaussian elimination.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Result<Self, TrainingError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(TrainingError::degenerate("rows have no features"));
        }

        let x_means: Vec<f64> = (0..width)
            .map(|j| StatisticalFunctions::mean(&rows.iter().map(|r| r[j]).collect::<Vec<_>>()))
            .collect();
        let y_mean = StatisticalFunctions::mean(targets);

        // Augmented matrix [XᵀX + λI | Xᵀy]
        let mut system = vec![vec![0.0; width + 1]; width];
        for (row, target) in rows.iter().zip(targets) {
            let centered: Vec<f64> = row.iter().zip(&x_means).map(|(v, m)| v - m).collect();
            let dy = target - y_mean;
            for i in 0..width {
                for j in 0..width {
                    system[i][j] += centered[i] * centered[j];
                }
                system[i][width] += centered[i] * dy;
            }
        }
        for (i, eq) in system.iter_mut().enumerate() {
            eq[i] += RIDGE;
        }

        let coefficients = solve(system)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_means)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegressor {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting on an n x (n+1) augmented matrix.
fn solve(mut m: Vec<Vec<f64>>) -> Result<Vec<f64>, TrainingError> {
    let n = m.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < f64::EPSILON {
            return Err(TrainingError::degenerate("singular normal equations"));
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * solution[k]).sum();
        solution[row] = (m[row][n] - tail) / m[row][row];
    }

    if solution.iter().any(|c| !c.is_finite()) {
        return Err(TrainingError::degenerate("least squares produced non-finite coefficients"));
    }
    Ok(solution)
}
