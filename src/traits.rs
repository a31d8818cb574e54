//! Core traits for learner backends and transformers.
//!
//! These traits define the contract every backend satisfies: fit on a
//! feature matrix and a target, then predict for new rows.

use crate::error::Result;
use crate::primitives::Matrix;

/// Training target handed to a backend.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Continuous responses, one per row.
    Values(&'a [f32]),
    /// Class indices into a label domain of `n_classes` values.
    Classes {
        /// Class index per row
        labels: &'a [usize],
        /// Size of the label domain
        n_classes: usize,
    },
}

impl Target<'_> {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Values(v) => v.len(),
            Self::Classes { labels, .. } => labels.len(),
        }
    }

    /// True if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backend predictions.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Continuous predictions.
    Values(Vec<f32>),
    /// Predicted class indices.
    Classes(Vec<usize>),
}

impl Output {
    /// Number of predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Values(v) => v.len(),
            Self::Classes(c) => c.len(),
        }
    }

    /// True if there are no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Supervised learner backend.
///
/// Fitting is a constructor: a fitted backend is immutable.
pub trait Estimator: Sized {
    /// Resolved hyperparameters.
    type Params;

    /// Fits the backend.
    ///
    /// `seed` drives every random decision (bootstrap, feature sampling,
    /// row subsampling).
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot support a fit (too few rows, a
    /// single class, singular covariance).
    fn fit(x: &Matrix<f32>, y: Target<'_>, params: &Self::Params, seed: u64) -> Result<Self>;

    /// Predicts for every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of columns.
    fn predict(&self, x: &Matrix<f32>) -> Result<Output>;
}

/// Unsupervised feature transformer.
pub trait Transformer {
    /// Learns transformation parameters from `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Applies the learned transformation.
    ///
    /// # Errors
    ///
    /// Returns an error if not fitted or on a column count mismatch.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits then transforms the same data.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Transformer::fit`] and
    /// [`Transformer::transform`].
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}
