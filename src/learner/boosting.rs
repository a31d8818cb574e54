//! Gradient boosting backend.
//!
//! Stagewise additive trees fitted to the negative gradient of the loss.
//! Regression uses squared loss; classification uses multinomial deviance
//! with one tree per class per round and a one-step Newton update per leaf.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::automl::params::Param;
use crate::automl::search::Assignment;
use crate::error::{Result, TuneError};
use crate::primitives::Matrix;
use crate::traits::{Estimator, Output, Target};

use super::tree::{argmax_first, DecisionTree, TreeConfig};
use super::{float_param, int_param};

/// Resolved gradient boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    /// Boosting rounds
    pub n_trees: usize,
    /// Depth of every tree
    pub interaction_depth: usize,
    /// Learning rate
    pub shrinkage: f32,
    /// Minimum rows per leaf
    pub min_obs_in_node: usize,
    /// Fraction of rows sampled per round
    pub bag_fraction: f32,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            interaction_depth: 3,
            shrinkage: 0.1,
            min_obs_in_node: 10,
            bag_fraction: 1.0,
        }
    }
}

impl BoostingParams {
    /// Reads parameters from an assignment, defaulting unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] if a count is below 1,
    /// the shrinkage is not positive, or the bag fraction is outside (0, 1].
    pub fn resolve(assignment: &Assignment) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            n_trees: int_param(assignment, Param::NTrees, d.n_trees, 1)?,
            interaction_depth: int_param(
                assignment,
                Param::InteractionDepth,
                d.interaction_depth,
                1,
            )?,
            shrinkage: float_param(
                assignment,
                Param::Shrinkage,
                f64::from(d.shrinkage),
                |v| v > 0.0,
                "a positive learning rate",
            )? as f32,
            min_obs_in_node: int_param(assignment, Param::MinObsInNode, d.min_obs_in_node, 1)?,
            bag_fraction: float_param(
                assignment,
                Param::BagFraction,
                f64::from(d.bag_fraction),
                |v| v > 0.0 && v <= 1.0,
                "a fraction in (0, 1]",
            )? as f32,
        })
    }
}

/// Fitted gradient boosting model.
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    /// Initial score per output (one for regression, one per class otherwise)
    init: Vec<f32>,
    /// `rounds[m][k]` is the tree for output `k` in round `m`
    rounds: Vec<Vec<DecisionTree>>,
    shrinkage: f32,
    n_features: usize,
    classification: bool,
}

impl GradientBoosting {
    /// Number of boosting rounds actually fitted.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    fn raw_scores(&self, row: &[f32]) -> Vec<f32> {
        let mut scores = self.init.clone();
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                scores[k] += self.shrinkage * tree.predict_value(row);
            }
        }
        scores
    }
}

/// Rows used in one boosting round.
fn subsample(n: usize, fraction: f32, rng: &mut StdRng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let m = ((n as f32 * fraction).floor() as usize).clamp(1, n);
    let mut rows = rand::seq::index::sample(rng, n, m).into_vec();
    rows.sort_unstable();
    rows
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl Estimator for GradientBoosting {
    type Params = BoostingParams;

    fn fit(x: &Matrix<f32>, y: Target<'_>, params: &BoostingParams, seed: u64) -> Result<Self> {
        let n = x.n_rows();
        if n == 0 {
            return Err(TuneError::fit("cannot fit gradient boosting on zero rows"));
        }
        if y.len() != n {
            return Err(TuneError::dimension_mismatch("boosting targets", n, y.len()));
        }

        let config = TreeConfig {
            max_depth: Some(params.interaction_depth),
            min_leaf: params.min_obs_in_node,
            mtry: None,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let shrinkage = params.shrinkage;
        let mut rounds = Vec::with_capacity(params.n_trees);

        let (init, classification) = match y {
            Target::Values(values) => {
                let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
                let mut current = vec![mean as f32; n];
                let mut residuals = vec![0.0_f32; n];

                for _ in 0..params.n_trees {
                    for i in 0..n {
                        residuals[i] = values[i] - current[i];
                    }
                    let rows = subsample(n, params.bag_fraction, &mut rng);
                    let tree =
                        DecisionTree::fit(x, Target::Values(&residuals), &rows, config, &mut rng);
                    for (i, value) in current.iter_mut().enumerate() {
                        *value += shrinkage * tree.predict_value(x.row_slice(i));
                    }
                    rounds.push(vec![tree]);
                }
                (vec![mean as f32], false)
            }
            Target::Classes { labels, n_classes } => {
                // Laplace-smoothed log priors, so classes absent here stay finite
                let mut counts = vec![0usize; n_classes];
                for &label in labels {
                    counts[label] += 1;
                }
                let init: Vec<f32> = counts
                    .iter()
                    .map(|&c| ((c as f64 + 1.0) / (n + n_classes) as f64).ln() as f32)
                    .collect();

                let mut scores: Vec<Vec<f32>> = vec![init.clone(); n];
                let mut residuals = vec![0.0_f32; n];
                let k_factor = (n_classes as f32 - 1.0) / n_classes as f32;

                for _ in 0..params.n_trees {
                    let probs: Vec<Vec<f32>> = scores.iter().map(|s| softmax(s)).collect();
                    let rows = subsample(n, params.bag_fraction, &mut rng);
                    let mut round = Vec::with_capacity(n_classes);

                    for k in 0..n_classes {
                        for i in 0..n {
                            let indicator = if labels[i] == k { 1.0 } else { 0.0 };
                            residuals[i] = indicator - probs[i][k];
                        }
                        let mut tree =
                            DecisionTree::fit(x, Target::Values(&residuals), &rows, config, &mut rng);

                        // Newton step per leaf: sum(r) / sum(|r| (1 - |r|))
                        let mut leaf_sums: std::collections::BTreeMap<usize, (f64, f64)> =
                            std::collections::BTreeMap::new();
                        for &i in &rows {
                            let r = f64::from(residuals[i]);
                            let entry = leaf_sums
                                .entry(tree.leaf_index(x.row_slice(i)))
                                .or_insert((0.0, 0.0));
                            entry.0 += r;
                            entry.1 += r.abs() * (1.0 - r.abs());
                        }
                        for (leaf, (num, den)) in leaf_sums {
                            let gamma = if den < 1e-10 {
                                0.0
                            } else {
                                f64::from(k_factor) * num / den
                            };
                            tree.set_leaf_value(leaf, gamma as f32);
                        }

                        for (i, row_scores) in scores.iter_mut().enumerate() {
                            row_scores[k] += shrinkage * tree.predict_value(x.row_slice(i));
                        }
                        round.push(tree);
                    }
                    rounds.push(round);
                }
                (init, true)
            }
        };

        tracing::trace!(
            rounds = rounds.len(),
            leaves = rounds.iter().flatten().map(DecisionTree::n_leaves).sum::<usize>(),
            "gradient boosting fitted"
        );

        Ok(Self {
            init,
            rounds,
            shrinkage,
            n_features: x.n_cols(),
            classification,
        })
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        if x.n_cols() != self.n_features {
            return Err(TuneError::dimension_mismatch(
                "boosting features",
                self.n_features,
                x.n_cols(),
            ));
        }

        let scores = (0..x.n_rows()).map(|i| self.raw_scores(x.row_slice(i)));
        if self.classification {
            Ok(Output::Classes(scores.map(|s| argmax_first(&s)).collect()))
        } else {
            Ok(Output::Values(scores.map(|s| s[0]).collect()))
        }
    }
}

#[cfg(test)]
#[path = "boosting_tests.rs"]
mod tests;
