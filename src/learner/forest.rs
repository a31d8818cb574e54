//! Random forest backend.
//!
//! Bagged CART trees with `mtry` random features per split. Rows left out
//! of a tree's bootstrap sample score that tree, giving the out-of-bag error
//! without a separate holdout.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::automl::params::Param;
use crate::automl::search::Assignment;
use crate::error::{Result, TuneError};
use crate::primitives::Matrix;
use crate::task::TaskKind;
use crate::traits::{Estimator, Output, Target};

use super::tree::{argmax_first, DecisionTree, TreeConfig};
use super::int_param;

/// Resolved random forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Number of trees
    pub n_trees: usize,
    /// Features tried per split
    pub mtry: usize,
    /// Minimum rows per leaf
    pub node_size: usize,
    /// Maximum depth (None = unbounded)
    pub max_depth: Option<usize>,
}

impl ForestParams {
    /// Defaults for a task of `kind` with `n_features` columns.
    ///
    /// `mtry` is `floor(sqrt(p))` for classification and `floor(p / 3)` for
    /// regression (at least 1); leaves hold 1 row for classification and 5
    /// for regression.
    #[must_use]
    pub fn defaults(kind: TaskKind, n_features: usize) -> Self {
        let (mtry, node_size) = match kind {
            TaskKind::Classification => ((n_features as f64).sqrt().floor() as usize, 1),
            TaskKind::Regression => (n_features / 3, 5),
        };
        Self {
            n_trees: 100,
            mtry: mtry.clamp(1, n_features.max(1)),
            node_size,
            max_depth: None,
        }
    }

    /// Reads parameters from an assignment, defaulting unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] if `mtry` is outside
    /// `1..=n_features` or any count is below 1.
    pub fn resolve(assignment: &Assignment, kind: TaskKind, n_features: usize) -> Result<Self> {
        let defaults = Self::defaults(kind, n_features);
        let n_trees = int_param(assignment, Param::NTree, defaults.n_trees, 1)?;
        let mtry = int_param(assignment, Param::Mtry, defaults.mtry, 1)?;
        if mtry > n_features {
            return Err(TuneError::InvalidHyperparameter {
                param: Param::Mtry.name().to_string(),
                value: mtry.to_string(),
                constraint: format!("at most the number of features ({n_features})"),
            });
        }
        let node_size = int_param(assignment, Param::NodeSize, defaults.node_size, 1)?;
        let max_depth = match assignment.get(Param::MaxDepth) {
            None => None,
            Some(_) => Some(int_param(assignment, Param::MaxDepth, 0, 1)?),
        };
        Ok(Self {
            n_trees,
            mtry,
            node_size,
            max_depth,
        })
    }
}

/// Fitted random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: Option<usize>,
    oob_error: Option<f64>,
}

impl RandomForest {
    /// Out-of-bag error: MSE for regression, misclassification rate for
    /// classification. `None` when no row was ever out of bag.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    /// Number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Creates a bootstrap sample (random sample with replacement).
fn bootstrap_sample(n_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

/// Running out-of-bag tallies per row.
enum OobTally {
    Values { sum: Vec<f64>, count: Vec<usize> },
    Votes(Vec<Vec<usize>>),
}

impl OobTally {
    fn error(&self, y: Target<'_>) -> Option<f64> {
        let (mut total, mut scored) = (0.0_f64, 0usize);
        match (self, y) {
            (Self::Values { sum, count }, Target::Values(truth)) => {
                for i in 0..truth.len() {
                    if count[i] > 0 {
                        let pred = sum[i] / count[i] as f64;
                        total += (pred - f64::from(truth[i])).powi(2);
                        scored += 1;
                    }
                }
            }
            (Self::Votes(votes), Target::Classes { labels, .. }) => {
                for (i, row_votes) in votes.iter().enumerate() {
                    if row_votes.iter().any(|&v| v > 0) {
                        if argmax_first(row_votes) != labels[i] {
                            total += 1.0;
                        }
                        scored += 1;
                    }
                }
            }
            _ => return None,
        }
        (scored > 0).then(|| total / scored as f64)
    }
}

impl Estimator for RandomForest {
    type Params = ForestParams;

    fn fit(x: &Matrix<f32>, y: Target<'_>, params: &ForestParams, seed: u64) -> Result<Self> {
        let n = x.n_rows();
        if n == 0 {
            return Err(TuneError::fit("cannot fit a random forest on zero rows"));
        }
        if y.len() != n {
            return Err(TuneError::dimension_mismatch("forest targets", n, y.len()));
        }

        let config = TreeConfig {
            max_depth: params.max_depth,
            min_leaf: params.node_size,
            mtry: Some(params.mtry),
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tally = match y {
            Target::Values(_) => OobTally::Values {
                sum: vec![0.0; n],
                count: vec![0; n],
            },
            Target::Classes { n_classes, .. } => OobTally::Votes(vec![vec![0; n_classes]; n]),
        };

        let mut trees = Vec::with_capacity(params.n_trees);
        let mut in_bag = vec![false; n];
        for _ in 0..params.n_trees {
            let sample = bootstrap_sample(n, &mut rng);
            in_bag.iter_mut().for_each(|b| *b = false);
            for &i in &sample {
                in_bag[i] = true;
            }

            let tree = DecisionTree::fit(x, y, &sample, config, &mut rng);

            for i in (0..n).filter(|&i| !in_bag[i]) {
                let row = x.row_slice(i);
                match &mut tally {
                    OobTally::Values { sum, count } => {
                        sum[i] += f64::from(tree.predict_value(row));
                        count[i] += 1;
                    }
                    OobTally::Votes(votes) => votes[i][tree.predict_class(row)] += 1,
                }
            }
            trees.push(tree);
        }

        let oob_error = tally.error(y);
        tracing::trace!(
            n_trees = trees.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            ?oob_error,
            "random forest fitted"
        );

        Ok(Self {
            trees,
            n_features: x.n_cols(),
            n_classes: match y {
                Target::Values(_) => None,
                Target::Classes { n_classes, .. } => Some(n_classes),
            },
            oob_error,
        })
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        if x.n_cols() != self.n_features {
            return Err(TuneError::dimension_mismatch(
                "forest features",
                self.n_features,
                x.n_cols(),
            ));
        }
        let n = x.n_rows();
        match self.n_classes {
            None => {
                let mut predictions = Vec::with_capacity(n);
                for i in 0..n {
                    let row = x.row_slice(i);
                    let sum: f64 = self
                        .trees
                        .iter()
                        .map(|t| f64::from(t.predict_value(row)))
                        .sum();
                    predictions.push((sum / self.trees.len().max(1) as f64) as f32);
                }
                Ok(Output::Values(predictions))
            }
            Some(n_classes) => {
                let mut predictions = Vec::with_capacity(n);
                for i in 0..n {
                    let row = x.row_slice(i);
                    let mut votes = vec![0usize; n_classes];
                    for tree in &self.trees {
                        votes[tree.predict_class(row)] += 1;
                    }
                    predictions.push(argmax_first(&votes));
                }
                Ok(Output::Classes(predictions))
            }
        }
    }
}

#[cfg(test)]
#[path = "forest_tests.rs"]
mod tests;
