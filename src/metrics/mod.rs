//! Evaluation measures for tuning and out-of-sample scoring.
//!
//! Regression: MSE, RMSE, MAE. Classification: misclassification rate
//! (MMCE) and accuracy. Every [`Measure`] is an error, so tuning always
//! minimises.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};
use crate::task::TaskKind;

/// Computes the Mean Squared Error (MSE).
///
/// MSE = (1/n) * `Σ(y_true - y_pred)²`
///
/// # Examples
///
/// ```
/// use aprender_tune::metrics::mse;
///
/// let y_true = [3.0, -0.5, 2.0, 7.0];
/// let y_pred = [2.5, 0.0, 2.0, 8.0];
/// assert!((mse(&y_pred, &y_true) - 0.375).abs() < 1e-9);
/// ```
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn mse(y_pred: &[f32], y_true: &[f32]) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_sq_error: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (f64::from(t) - f64::from(p)).powi(2))
        .sum();

    sum_sq_error / y_true.len() as f64
}

/// Computes the Root Mean Squared Error (RMSE).
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn rmse(y_pred: &[f32], y_true: &[f32]) -> f64 {
    mse(y_pred, y_true).sqrt()
}

/// Computes the Mean Absolute Error (MAE).
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn mae(y_pred: &[f32], y_true: &[f32]) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_abs_error: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (f64::from(t) - f64::from(p)).abs())
        .sum();

    sum_abs_error / y_true.len() as f64
}

/// Fraction of predictions equal to the true label.
///
/// # Examples
///
/// ```
/// use aprender_tune::metrics::accuracy;
///
/// let y_true = [1.0, 2.0, 3.0, 1.0];
/// let y_pred = [1.0, 2.0, 1.0, 1.0];
/// assert!((accuracy(&y_pred, &y_true) - 0.75).abs() < 1e-9);
/// ```
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn accuracy(y_pred: &[f32], y_true: &[f32]) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f64 / y_true.len() as f64
}

/// Mean misclassification error: `1 - accuracy`.
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
#[must_use]
pub fn mmce(y_pred: &[f32], y_true: &[f32]) -> f64 {
    1.0 - accuracy(y_pred, y_true)
}

/// Error measure minimised during tuning and reported by benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    /// Mean squared error (regression).
    Mse,
    /// Root mean squared error (regression).
    Rmse,
    /// Mean absolute error (regression).
    Mae,
    /// Mean misclassification error (classification).
    Mmce,
}

impl Measure {
    /// Default measure for a problem type.
    #[must_use]
    pub fn default_for(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Regression => Self::Mse,
            TaskKind::Classification => Self::Mmce,
        }
    }

    /// Short name used in logs and report tables.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Mse => "mse",
            Self::Rmse => "rmse",
            Self::Mae => "mae",
            Self::Mmce => "mmce",
        }
    }

    /// Problem type this measure applies to.
    #[must_use]
    pub fn task_kind(self) -> TaskKind {
        match self {
            Self::Mse | Self::Rmse | Self::Mae => TaskKind::Regression,
            Self::Mmce => TaskKind::Classification,
        }
    }

    /// Checks the measure applies to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] on a regression/classification mix-up.
    pub fn check_applies(self, kind: TaskKind) -> Result<()> {
        if self.task_kind() == kind {
            Ok(())
        } else {
            Err(TuneError::InvalidConfig(format!(
                "measure {} does not apply to a {kind} task",
                self.name()
            )))
        }
    }

    /// Scores predictions against truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices are empty or differ in length.
    pub fn evaluate(self, y_pred: &[f32], y_true: &[f32]) -> Result<f64> {
        if y_pred.len() != y_true.len() {
            return Err(TuneError::dimension_mismatch(
                "predictions",
                y_true.len(),
                y_pred.len(),
            ));
        }
        if y_true.is_empty() {
            return Err(TuneError::fit("cannot score an empty evaluation set"));
        }

        Ok(match self {
            Self::Mse => mse(y_pred, y_true),
            Self::Rmse => rmse(y_pred, y_true),
            Self::Mae => mae(y_pred, y_true),
            Self::Mmce => mmce(y_pred, y_true),
        })
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Out-of-sample performance of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metrics {
    /// Regression errors.
    Regression {
        /// Mean squared error
        mse: f64,
        /// Root mean squared error
        rmse: f64,
        /// Mean absolute error
        mae: f64,
    },
    /// Classification errors.
    Classification {
        /// Misclassification rate
        mmce: f64,
        /// Accuracy (`1 - mmce`)
        accuracy: f64,
    },
}

impl Metrics {
    /// Computes all metrics for the given problem type.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices are empty or differ in length.
    pub fn compute(kind: TaskKind, y_pred: &[f32], y_true: &[f32]) -> Result<Self> {
        Measure::default_for(kind).evaluate(y_pred, y_true)?;
        Ok(match kind {
            TaskKind::Regression => Self::Regression {
                mse: mse(y_pred, y_true),
                rmse: rmse(y_pred, y_true),
                mae: mae(y_pred, y_true),
            },
            TaskKind::Classification => {
                let acc = accuracy(y_pred, y_true);
                Self::Classification {
                    mmce: 1.0 - acc,
                    accuracy: acc,
                }
            }
        })
    }

    /// Value of a single measure, if it belongs to this metric family.
    #[must_use]
    pub fn get(&self, measure: Measure) -> Option<f64> {
        match (self, measure) {
            (Self::Regression { mse, .. }, Measure::Mse) => Some(*mse),
            (Self::Regression { rmse, .. }, Measure::Rmse) => Some(*rmse),
            (Self::Regression { mae, .. }, Measure::Mae) => Some(*mae),
            (Self::Classification { mmce, .. }, Measure::Mmce) => Some(*mmce),
            _ => None,
        }
    }

    /// Accuracy for classification metrics.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        match self {
            Self::Classification { accuracy, .. } => Some(*accuracy),
            Self::Regression { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
