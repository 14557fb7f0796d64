//! Bagged regression trees (random forest with all features considered at
//! every split).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::TrainingError;
use crate::stats::StatisticalFunctions;

use super::{Regressor, TreeParams};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree stored as an arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if x <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, indices: Vec<usize>) -> RegressionTree {
        self.grow(indices, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let values: Vec<f64> = indices.iter().map(|&i| self.targets[i]).collect();
        let leaf_value = StatisticalFunctions::mean(&values);

        let split = if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            None
        } else {
            self.best_split(&indices)
        };

        let Some((feature, threshold)) = split else {
            self.nodes.push(Node::Leaf { value: leaf_value });
            return self.nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][feature] <= threshold);

        // Reserve the slot so children land after their parent
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { value: leaf_value });
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[slot] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }

    /// Split minimizing the summed squared error of both children.
    fn best_split(&self, indices: &[usize]) -> Option<(usize, f64)> {
        let width = self.rows[indices[0]].len();
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n;

        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..width {
            let mut order: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.rows[i][feature], self.targets[i]))
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..order.len() - 1 {
                left_sum += order[k].1;
                left_sq += order[k].1.powi(2);

                if order[k].0 == order[k + 1].0 {
                    continue;
                }

                let left_n = (k + 1) as f64;
                let right_n = n - left_n;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);

                if best.map_or(true, |(_, _, b)| sse < b) {
                    best = Some((feature, (order[k].0 + order[k + 1].0) / 2.0, sse));
                }
            }
        }

        best.filter(|(_, _, sse)| *sse < parent_sse - 1e-12)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Average of bootstrap-trained regression trees.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestRegressor {
    trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    /// Fit `n_trees` trees, tree `t` seeded with `seed + t`.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        n_trees: usize,
        params: TreeParams,
    ) -> Result<Self, TrainingError> {
        if n_trees == 0 {
            return Err(TrainingError::degenerate("forest needs at least one tree"));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(TrainingError::degenerate("features contain non-finite values"));
        }

        let n = rows.len();
        let trees = (0..n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                TreeBuilder {
                    rows,
                    targets,
                    params,
                    nodes: Vec::new(),
                }
                .build(bootstrap)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for ForestRegressor {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: TreeParams = TreeParams {
        max_depth: 10,
        min_samples_split: 2,
        seed: 42,
    };

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let targets = rows.iter().map(|r| if r[0] < 50.0 { 10.0 } else { 90.0 }).collect();
        (rows, targets)
    }

    #[test]
    fn test_forest_learns_step_function() {
        let (rows, targets) = step_data();
        let forest = ForestRegressor::fit(&rows, &targets, 20, PARAMS).unwrap();

        assert_eq!(forest.n_trees(), 20);
        assert!((forest.predict(&[10.0, 1.0]) - 10.0).abs() < 5.0);
        assert!((forest.predict(&[90.0, 1.0]) - 90.0).abs() < 5.0);
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let (rows, targets) = step_data();
        let a = ForestRegressor::fit(&rows, &targets, 10, PARAMS).unwrap();
        let b = ForestRegressor::fit(&rows, &targets, 10, PARAMS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_target_yields_single_leaf() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets = vec![7.0; 10];
        let forest = ForestRegressor::fit(&rows, &targets, 3, PARAMS).unwrap();
        assert!((forest.predict(&[100.0]) - 7.0).abs() < 1e-12);
    }
}
