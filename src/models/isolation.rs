//! Isolation forest: unsupervised outlier scoring by average path length.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::TrainingError;
use crate::stats::StatisticalFunctions;

const EULER_GAMMA: f64 = 0.5772156649;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn path_length(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth + c_factor(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

struct IsolationBuilder<'a> {
    rows: &'a [Vec<f64>],
    height_limit: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl<'a> IsolationBuilder<'a> {
    fn build(mut self, sample: Vec<usize>) -> IsolationTree {
        self.grow(sample, 0);
        IsolationTree { nodes: self.nodes }
    }

    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        if depth >= self.height_limit || sample.len() <= 1 {
            self.nodes.push(Node::Leaf { size: sample.len() });
            return self.nodes.len() - 1;
        }

        // Only features that still vary inside this node can isolate anything
        let width = self.rows[sample[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|f| {
                let (lo, hi) = sample.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(self.rows[i][f]), hi.max(self.rows[i][f]))
                });
                (hi - lo > 1e-12).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            self.nodes.push(Node::Leaf { size: sample.len() });
            return self.nodes.len() - 1;
        }

        let (feature, lo, hi) = candidates[self.rng.gen_range(0..candidates.len())];
        let threshold = self.rng.gen_range(lo..hi);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.rows[i][feature] < threshold);

        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { size: 0 });
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
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Fitted isolation forest.
///
/// `score_samples` follows the usual convention (higher is more normal, in
/// [-1, 0]); `decision_function` subtracts the contamination quantile of the
/// training scores so that negative values are outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    width: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn fit(
        rows: &[Vec<f64>],
        n_trees: usize,
        sample_size: usize,
        contamination: f64,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        if rows.len() < 2 {
            return Err(TrainingError::InsufficientData {
                required: 2,
                actual: rows.len(),
            });
        }
        if n_trees == 0 {
            return Err(TrainingError::degenerate("isolation forest needs at least one tree"));
        }
        let width = rows[0].len();
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(TrainingError::degenerate("rows have inconsistent widths"));
        }

        let psi = sample_size.clamp(2, rows.len());
        let height_limit = (psi as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let sample = index::sample(&mut rng, rows.len(), psi).into_vec();
                IsolationBuilder {
                    rows,
                    height_limit,
                    rng,
                    nodes: Vec::new(),
                }
                .build(sample)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size: psi,
            width,
            offset: 0.0,
        };

        let training_scores = forest.score_samples(rows);
        forest.offset = StatisticalFunctions::percentile(&training_scores, contamination);
        Ok(forest)
    }

    /// Number of columns the forest was fitted on
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Negated anomaly score `-2^(-E[h(x)] / c(psi))`
    pub fn score(&self, row: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        -(2f64.powf(-mean_path / c_factor(self.sample_size)))
    }

    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|row| self.score(row)).collect()
    }

    /// Shifted score; negative means outlier
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.score(row) - self.offset
    }

    pub fn is_outlier(&self, row: &[f64]) -> bool {
        self.decision_function(row) < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, Normal};

    fn gaussian_cloud(n: usize) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|_| vec![normal.sample(&mut rng), normal.sample(&mut rng)])
            .collect()
    }

    #[test]
    fn test_c_factor() {
        assert_eq!(c_factor(1), 0.0);
        assert_eq!(c_factor(2), 1.0);
        assert!((c_factor(256) - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_far_point_is_outlier() {
        let rows = gaussian_cloud(500);
        let forest = IsolationForest::fit(&rows, 100, 256, 0.1, 42).unwrap();

        assert!(forest.is_outlier(&[8.0, -8.0]));
        assert!(!forest.is_outlier(&[0.0, 0.0]));
        assert!(forest.decision_function(&[8.0, -8.0]) < forest.decision_function(&[0.0, 0.0]));
    }

    #[test]
    fn test_contamination_sets_training_outlier_fraction() {
        let rows = gaussian_cloud(400);
        let forest = IsolationForest::fit(&rows, 50, 128, 0.1, 42).unwrap();

        let outliers = rows.iter().filter(|r| forest.is_outlier(r)).count();
        let fraction = outliers as f64 / rows.len() as f64;
        assert!((0.05..=0.15).contains(&fraction), "fraction = {fraction}");
    }

    #[test]
    fn test_scores_are_bounded() {
        let rows = gaussian_cloud(100);
        let forest = IsolationForest::fit(&rows, 20, 64, 0.1, 1).unwrap();
        for score in forest.score_samples(&rows) {
            assert!((-1.0..=0.0).contains(&score));
        }
    }
}
