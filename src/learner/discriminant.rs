//! Linear and quadratic discriminant analysis.
//!
//! Both model each class as a multivariate Gaussian and predict the class
//! with the largest posterior. LDA shares one pooled covariance across
//! classes; QDA estimates one per class, optionally shrunk toward a scaled
//! identity. Linear algebra runs in `f64` via Cholesky factors.

use crate::automl::params::Param;
use crate::automl::search::Assignment;
use crate::error::{Result, TuneError};
use crate::primitives::Matrix;
use crate::traits::{Estimator, Output, Target};

use super::float_param;

/// In-place Cholesky factorisation of a symmetric `p x p` matrix.
///
/// On success the lower triangle holds `L` with `A = L L^T`. Returns `None`
/// if the matrix is not positive definite.
fn cholesky(a: &mut [f64], p: usize) -> Option<()> {
    for j in 0..p {
        let mut diag = a[j * p + j];
        for k in 0..j {
            diag -= a[j * p + k] * a[j * p + k];
        }
        if diag <= 1e-12 || !diag.is_finite() {
            return None;
        }
        let l_jj = diag.sqrt();
        a[j * p + j] = l_jj;

        for i in (j + 1)..p {
            let mut sum = a[i * p + j];
            for k in 0..j {
                sum -= a[i * p + k] * a[j * p + k];
            }
            a[i * p + j] = sum / l_jj;
        }
    }
    Some(())
}

/// `|L^{-1} v|^2` by forward substitution, i.e. `v^T A^{-1} v`.
fn mahalanobis_sq(l: &[f64], p: usize, v: &mut [f64]) -> f64 {
    for i in 0..p {
        let mut sum = v[i];
        for k in 0..i {
            sum -= l[i * p + k] * v[k];
        }
        v[i] = sum / l[i * p + i];
    }
    v.iter().map(|z| z * z).sum()
}

fn log_det(l: &[f64], p: usize) -> f64 {
    (0..p).map(|i| 2.0 * l[i * p + i].ln()).sum()
}

/// Per-class row counts, means and scatter matrices.
struct ClassStats {
    counts: Vec<usize>,
    means: Vec<Vec<f64>>,
    scatter: Vec<Vec<f64>>,
}

fn class_stats(x: &Matrix<f32>, labels: &[usize], n_classes: usize) -> ClassStats {
    let p = x.n_cols();
    let mut counts = vec![0usize; n_classes];
    let mut means = vec![vec![0.0_f64; p]; n_classes];

    for (i, &c) in labels.iter().enumerate() {
        counts[c] += 1;
        for (m, &v) in means[c].iter_mut().zip(x.row_slice(i)) {
            *m += f64::from(v);
        }
    }
    for (mean, &count) in means.iter_mut().zip(&counts) {
        if count > 0 {
            mean.iter_mut().for_each(|m| *m /= count as f64);
        }
    }

    let mut scatter = vec![vec![0.0_f64; p * p]; n_classes];
    let mut centered = vec![0.0_f64; p];
    for (i, &c) in labels.iter().enumerate() {
        for (d, (&v, &m)) in centered.iter_mut().zip(x.row_slice(i).iter().zip(&means[c])) {
            *d = f64::from(v) - m;
        }
        let s = &mut scatter[c];
        for a in 0..p {
            for b in 0..=a {
                s[a * p + b] += centered[a] * centered[b];
            }
        }
    }
    // mirror lower triangle
    for s in &mut scatter {
        for a in 0..p {
            for b in 0..a {
                s[b * p + a] = s[a * p + b];
            }
        }
    }

    ClassStats {
        counts,
        means,
        scatter,
    }
}

fn class_labels<'a>(y: Target<'a>, n_rows: usize) -> Result<(&'a [usize], usize)> {
    match y {
        Target::Classes { labels, n_classes } => {
            if labels.len() != n_rows {
                return Err(TuneError::dimension_mismatch(
                    "discriminant labels",
                    n_rows,
                    labels.len(),
                ));
            }
            Ok((labels, n_classes))
        }
        Target::Values(_) => Err(TuneError::fit(
            "discriminant analysis requires a classification target",
        )),
    }
}

/// Gaussian class model: `mean`, Cholesky factor of the covariance, and the
/// constant part of the log posterior.
#[derive(Debug, Clone)]
struct ClassModel {
    class: usize,
    mean: Vec<f64>,
    chol: Vec<f64>,
    offset: f64,
}

fn predict_classes(models: &[ClassModel], p: usize, x: &Matrix<f32>) -> Result<Output> {
    if x.n_cols() != p {
        return Err(TuneError::dimension_mismatch(
            "discriminant features",
            p,
            x.n_cols(),
        ));
    }
    let mut diff = vec![0.0_f64; p];
    let mut predictions = Vec::with_capacity(x.n_rows());
    for i in 0..x.n_rows() {
        let row = x.row_slice(i);
        let mut best = (f64::NEG_INFINITY, 0usize);
        for model in models {
            for (d, (&v, &m)) in diff.iter_mut().zip(row.iter().zip(&model.mean)) {
                *d = f64::from(v) - m;
            }
            let score = model.offset - 0.5 * mahalanobis_sq(&model.chol, p, &mut diff);
            if score > best.0 {
                best = (score, model.class);
            }
        }
        predictions.push(best.1);
    }
    Ok(Output::Classes(predictions))
}

/// Linear discriminant analysis.
#[derive(Debug, Clone)]
pub struct Lda {
    models: Vec<ClassModel>,
    n_features: usize,
}

impl Estimator for Lda {
    type Params = ();

    fn fit(x: &Matrix<f32>, y: Target<'_>, _params: &(), _seed: u64) -> Result<Self> {
        let (n, p) = x.shape();
        let (labels, n_classes) = class_labels(y, n)?;
        let stats = class_stats(x, labels, n_classes);
        let present = stats.counts.iter().filter(|&&c| c > 0).count();
        if present < 2 {
            return Err(TuneError::fit("training rows contain a single class"));
        }
        if n <= present {
            return Err(TuneError::fit(format!(
                "LDA needs more rows ({n}) than classes ({present})"
            )));
        }

        let dof = (n - present) as f64;
        let mut pooled = vec![0.0_f64; p * p];
        for s in &stats.scatter {
            for (acc, v) in pooled.iter_mut().zip(s) {
                *acc += v / dof;
            }
        }
        cholesky(&mut pooled, p)
            .ok_or_else(|| TuneError::fit("pooled covariance is singular"))?;

        let models = (0..n_classes)
            .filter(|&c| stats.counts[c] > 0)
            .map(|c| ClassModel {
                class: c,
                mean: stats.means[c].clone(),
                chol: pooled.clone(),
                offset: (stats.counts[c] as f64 / n as f64).ln(),
            })
            .collect();

        Ok(Self {
            models,
            n_features: p,
        })
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        predict_classes(&self.models, self.n_features, x)
    }
}

/// Resolved QDA hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QdaParams {
    /// Shrinkage `r` in `(1 - r) S_k + r (tr S_k / p) I`, within [0, 1]
    pub reg_param: f64,
}

impl QdaParams {
    /// Reads parameters from an assignment, defaulting unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] if the shrinkage lies
    /// outside [0, 1].
    pub fn resolve(assignment: &Assignment) -> Result<Self> {
        Ok(Self {
            reg_param: float_param(
                assignment,
                Param::RegParam,
                0.0,
                |r| (0.0..=1.0).contains(&r),
                "a value in [0, 1]",
            )?,
        })
    }
}

/// Quadratic discriminant analysis.
#[derive(Debug, Clone)]
pub struct Qda {
    models: Vec<ClassModel>,
    n_features: usize,
}

impl Estimator for Qda {
    type Params = QdaParams;

    fn fit(x: &Matrix<f32>, y: Target<'_>, params: &QdaParams, _seed: u64) -> Result<Self> {
        let (n, p) = x.shape();
        let (labels, n_classes) = class_labels(y, n)?;
        let stats = class_stats(x, labels, n_classes);
        if stats.counts.iter().filter(|&&c| c > 0).count() < 2 {
            return Err(TuneError::fit("training rows contain a single class"));
        }

        let r = params.reg_param;
        let mut models = Vec::with_capacity(n_classes);
        for c in (0..n_classes).filter(|&c| stats.counts[c] > 0) {
            let n_c = stats.counts[c];
            if n_c < 2 {
                return Err(TuneError::fit(format!(
                    "class {c} has a single training row"
                )));
            }

            let mut cov: Vec<f64> = stats.scatter[c]
                .iter()
                .map(|v| v / (n_c - 1) as f64)
                .collect();
            if r > 0.0 {
                let trace: f64 = (0..p).map(|i| cov[i * p + i]).sum();
                let target = trace / p as f64;
                cov.iter_mut().for_each(|v| *v *= 1.0 - r);
                for i in 0..p {
                    cov[i * p + i] += r * target;
                }
            }

            cholesky(&mut cov, p).ok_or_else(|| {
                TuneError::fit(format!("covariance of class {c} is singular"))
            })?;

            models.push(ClassModel {
                class: c,
                mean: stats.means[c].clone(),
                offset: (n_c as f64 / n as f64).ln() - 0.5 * log_det(&cov, p),
                chol: cov,
            });
        }

        Ok(Self {
            models,
            n_features: p,
        })
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        predict_classes(&self.models, self.n_features, x)
    }
}

#[cfg(test)]
#[path = "discriminant_tests.rs"]
mod tests;
