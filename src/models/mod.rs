// ============================================================================
// SECTION 9: MODEL FAMILIES
// ============================================================================
// Regressors for the forecaster and the isolation ensemble for the detector.
// All randomized fits take an explicit seed.
// ============================================================================

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;
use crate::MIN_TRAINING_PAIRS;

pub mod forest;
pub mod isolation;
pub mod linear;

pub use forest::ForestRegressor;
pub use isolation::IsolationForest;
pub use linear::LinearRegressor;

// ----------------------------------------------------------------------------
// 9.1 Regressor Contract
// ----------------------------------------------------------------------------

/// A fitted regression model mapping one feature row to one value.
pub trait Regressor: Send + Sync + Debug {
    /// Short family name used in logs and health payloads
    fn name(&self) -> &'static str;

    /// Predict one value
    fn predict(&self, features: &[f64]) -> f64;
}

/// Regressor family selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// Ordinary least squares
    Linear,
    /// Bagged regression trees
    Forest { trees: usize },
}

/// Tree growth limits shared by every forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl ModelKind {
    /// Fit a fresh regressor of this family
    pub fn fit(
        &self,
        rows: &[Vec<f64>],
        targets: &[f64],
        params: TreeParams,
    ) -> Result<Box<dyn Regressor>, TrainingError> {
        check_training_set(rows, targets)?;

        match *self {
            ModelKind::Linear => Ok(Box::new(LinearRegressor::fit(rows, targets)?)),
            ModelKind::Forest { trees } => {
                Ok(Box::new(ForestRegressor::fit(rows, targets, trees, params)?))
            }
        }
    }
}

fn check_training_set(rows: &[Vec<f64>], targets: &[f64]) -> Result<(), TrainingError> {
    if rows.len() < MIN_TRAINING_PAIRS {
        return Err(TrainingError::InsufficientData {
            required: MIN_TRAINING_PAIRS,
            actual: rows.len(),
        });
    }
    if rows.len() != targets.len() {
        return Err(TrainingError::degenerate(format!(
            "{} rows but {} targets",
            rows.len(),
            targets.len()
        )));
    }
    if targets.iter().any(|t| !t.is_finite()) {
        return Err(TrainingError::degenerate("targets contain non-finite values"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: TreeParams = TreeParams {
        max_depth: 8,
        min_samples_split: 2,
        seed: 42,
    };

    #[test]
    fn test_fit_rejects_tiny_sets() {
        let err = ModelKind::Linear.fit(&[vec![1.0]], &[1.0], PARAMS).unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientData { actual: 1, .. }));
    }

    #[test]
    fn test_fit_rejects_mismatched_targets() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let err = ModelKind::Forest { trees: 3 }
            .fit(&rows, &[1.0, 2.0], PARAMS)
            .unwrap_err();
        assert!(matches!(err, TrainingError::Degenerate { .. }));
    }

    #[test]
    fn test_model_kind_serde() {
        let kind: ModelKind = serde_json::from_str(r#"{"kind":"forest","trees":50}"#).unwrap();
        assert_eq!(kind, ModelKind::Forest { trees: 50 });
        let kind: ModelKind = serde_json::from_str(r#"{"kind":"linear"}"#).unwrap();
        assert_eq!(kind, ModelKind::Linear);
    }
}
