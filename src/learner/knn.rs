//! K-nearest-neighbours backend.
//!
//! Instance-based learner: features are standardized with the training
//! moments, distances are Minkowski distances of configurable power, and
//! neighbour votes (or averages) are optionally weighted by inverse distance.

use crate::automl::params::Param;
use crate::automl::search::Assignment;
use crate::error::{Result, TuneError};
use crate::preprocessing::StandardScaler;
use crate::primitives::Matrix;
use crate::traits::{Estimator, Output, Target, Transformer};

use super::{float_param, int_param};

/// Resolved kNN hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnParams {
    /// Number of neighbours (clamped to the training size at fit time)
    pub k: usize,
    /// Minkowski exponent
    pub distance_power: f32,
    /// Inverse-distance weighting
    pub weighted: bool,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            k: 7,
            distance_power: 2.0,
            weighted: false,
        }
    }
}

impl KnnParams {
    /// Reads parameters from an assignment, defaulting unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] if `k < 1` or the
    /// distance power is not positive.
    pub fn resolve(assignment: &Assignment) -> Result<Self> {
        let defaults = Self::default();
        let k = int_param(assignment, Param::K, defaults.k, 1)?;
        let distance_power = float_param(
            assignment,
            Param::DistancePower,
            f64::from(defaults.distance_power),
            |p| p > 0.0,
            "a positive number",
        )? as f32;
        let weighted = match assignment.get(Param::DistanceWeighted) {
            None => defaults.weighted,
            Some(value) => value.as_bool().ok_or_else(|| TuneError::InvalidHyperparameter {
                param: Param::DistanceWeighted.name().to_string(),
                value: value.to_string(),
                constraint: "a boolean".to_string(),
            })?,
        };
        Ok(Self {
            k,
            distance_power,
            weighted,
        })
    }
}

#[derive(Debug, Clone)]
enum Stored {
    Values(Vec<f32>),
    Classes { labels: Vec<usize>, n_classes: usize },
}

/// Fitted kNN model: the scaled training rows plus their targets.
#[derive(Debug, Clone)]
pub struct Knn {
    params: KnnParams,
    scaler: StandardScaler,
    x_train: Matrix<f32>,
    y_train: Stored,
}

impl Knn {
    /// Computes distance between two standardized rows.
    fn compute_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let p = self.params.distance_power;
        if (p - 2.0).abs() < f32::EPSILON {
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        } else if (p - 1.0).abs() < f32::EPSILON {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
        } else {
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f32>()
                .powf(1.0 / p)
        }
    }

    /// The k nearest training rows as `(distance, row)`, nearest first.
    fn neighbours(&self, row: &[f32]) -> Vec<(f32, usize)> {
        let mut distances: Vec<(f32, usize)> = (0..self.x_train.n_rows())
            .map(|j| (self.compute_distance(row, self.x_train.row_slice(j)), j))
            .collect();
        let k = self.params.k.min(distances.len());
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        distances.truncate(k);
        distances
    }

    fn weight(&self, dist: f32) -> f32 {
        if !self.params.weighted {
            1.0
        } else if dist < 1e-10 {
            1e10
        } else {
            1.0 / dist
        }
    }
}

impl Estimator for Knn {
    type Params = KnnParams;

    /// Stores the standardized training data.
    fn fit(x: &Matrix<f32>, y: Target<'_>, params: &KnnParams, _seed: u64) -> Result<Self> {
        if x.n_rows() == 0 {
            return Err(TuneError::fit("cannot fit kNN on zero rows"));
        }
        if y.len() != x.n_rows() {
            return Err(TuneError::dimension_mismatch("kNN targets", x.n_rows(), y.len()));
        }

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(x)?;
        let y_train = match y {
            Target::Values(v) => Stored::Values(v.to_vec()),
            Target::Classes { labels, n_classes } => Stored::Classes {
                labels: labels.to_vec(),
                n_classes,
            },
        };

        Ok(Self {
            params: *params,
            scaler,
            x_train,
            y_train,
        })
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        let x = self.scaler.transform(x)?;
        let n = x.n_rows();

        match &self.y_train {
            Stored::Values(y) => {
                let mut predictions = Vec::with_capacity(n);
                for i in 0..n {
                    let (mut num, mut den) = (0.0_f32, 0.0_f32);
                    for (dist, j) in self.neighbours(x.row_slice(i)) {
                        let w = self.weight(dist);
                        num += w * y[j];
                        den += w;
                    }
                    predictions.push(num / den);
                }
                Ok(Output::Values(predictions))
            }
            Stored::Classes { labels, n_classes } => {
                let mut predictions = Vec::with_capacity(n);
                for i in 0..n {
                    let mut class_weights = vec![0.0_f32; *n_classes];
                    for (dist, j) in self.neighbours(x.row_slice(i)) {
                        class_weights[labels[j]] += self.weight(dist);
                    }
                    predictions.push(super::tree::argmax_first(&class_weights));
                }
                Ok(Output::Classes(predictions))
            }
        }
    }
}

#[cfg(test)]
#[path = "knn_tests.rs"]
mod tests;
