//! Feature preprocessing.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};
use crate::primitives::Matrix;
use crate::traits::Transformer;

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// Constant columns keep a unit divisor, so they map to zero instead of NaN.
///
/// # Examples
///
/// ```
/// use aprender_tune::preprocessing::StandardScaler;
/// use aprender_tune::primitives::Matrix;
/// use aprender_tune::traits::Transformer;
///
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1 matrix");
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&x).expect("fit");
/// let mean: f32 = scaled.as_slice().iter().sum::<f32>() / 4.0;
/// assert!(mean.abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f32>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f32>>,
}

impl StandardScaler {
    /// Creates an unfitted scaler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted means, if any.
    #[must_use]
    pub fn mean(&self) -> Option<&[f32]> {
        self.mean.as_deref()
    }

    /// Fitted standard deviations, if any.
    #[must_use]
    pub fn std(&self) -> Option<&[f32]> {
        self.std.as_deref()
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        if x.n_rows() == 0 {
            return Err(TuneError::fit("cannot fit a scaler on zero rows"));
        }
        let (mean, std) = x.column_moments();
        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (Some(mean), Some(std)) = (self.mean.as_ref(), self.std.as_ref()) else {
            return Err(TuneError::fit("scaler not fitted"));
        };

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(TuneError::dimension_mismatch(
                "scaler columns",
                mean.len(),
                n_features,
            ));
        }

        let mut result = Vec::with_capacity(n_samples * n_features);
        for i in 0..n_samples {
            for (j, value) in x.row_slice(i).iter().enumerate() {
                result.push((value - mean[j]) / std[j]);
            }
        }

        Matrix::from_vec(n_samples, n_features, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_unit_variance() {
        let x = Matrix::from_vec(4, 2, vec![1.0, 10.0, 2.0, 10.0, 3.0, 10.0, 4.0, 10.0])
            .expect("matrix");
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).expect("fit");
        let col0 = out.column(0);
        assert!(col0.mean().abs() < 1e-6);
        assert!((col0.variance() - 1.0).abs() < 1e-5);
        // constant column maps to zero
        assert!(out.column(1).as_slice().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_transform_requires_fit() {
        let x = Matrix::from_vec(1, 1, vec![1.0]).expect("matrix");
        assert!(StandardScaler::new().transform(&x).is_err());
    }

    #[test]
    fn test_transform_column_mismatch() {
        let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("matrix");
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).expect("fit");
        let wide = Matrix::from_vec(1, 2, vec![1.0, 2.0]).expect("matrix");
        assert!(scaler.transform(&wide).is_err());
    }
}
