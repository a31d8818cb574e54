//! Learners: a closed set of model families behind one fit/predict contract.
//!
//! [`Learner`] names a family and declares which [`Param`]s it accepts;
//! [`Learner::train`] produces an immutable [`TrainedModel`].

pub mod boosting;
pub mod discriminant;
pub mod forest;
pub mod knn;
pub(crate) mod tree;

use serde::{Deserialize, Serialize};

use crate::automl::params::Param;
use crate::automl::search::Assignment;
use crate::data::DataFrame;
use crate::error::{Result, TuneError};
use crate::primitives::{Matrix, Vector};
use crate::task::{Schema, Task, TaskKind};
use crate::traits::{Estimator, Output, Target};

use boosting::{BoostingParams, GradientBoosting};
use discriminant::{Lda, Qda, QdaParams};
use forest::{ForestParams, RandomForest};
use knn::{Knn, KnnParams};

/// Model family.
///
/// # Examples
///
/// ```
/// use aprender_tune::automl::params::Param;
/// use aprender_tune::learner::Learner;
/// use aprender_tune::task::TaskKind;
///
/// assert!(Learner::Knn.params().contains(&Param::K));
/// assert!(!Learner::Lda.supports(TaskKind::Regression));
/// assert_eq!(Learner::RandomForest.id(), "random_forest");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Learner {
    /// k-nearest neighbours
    Knn,
    /// Random forest
    RandomForest,
    /// Gradient-boosted trees
    GradientBoosting,
    /// Linear discriminant analysis (classification only)
    Lda,
    /// Quadratic discriminant analysis (classification only)
    Qda,
}

impl Learner {
    /// Every learner, in a fixed order.
    pub const ALL: [Self; 5] = [
        Self::Knn,
        Self::RandomForest,
        Self::GradientBoosting,
        Self::Lda,
        Self::Qda,
    ];

    /// Identifier used in logs and reports.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Knn => "knn",
            Self::RandomForest => "random_forest",
            Self::GradientBoosting => "gbm",
            Self::Lda => "lda",
            Self::Qda => "qda",
        }
    }

    /// Whether the learner handles tasks of `kind`.
    #[must_use]
    pub fn supports(&self, kind: TaskKind) -> bool {
        match self {
            Self::Knn | Self::RandomForest | Self::GradientBoosting => true,
            Self::Lda | Self::Qda => kind == TaskKind::Classification,
        }
    }

    /// Tunable hyperparameters.
    #[must_use]
    pub fn params(&self) -> &'static [Param] {
        match self {
            Self::Knn => &[Param::K, Param::DistancePower, Param::DistanceWeighted],
            Self::RandomForest => &[Param::NTree, Param::Mtry, Param::NodeSize, Param::MaxDepth],
            Self::GradientBoosting => &[
                Param::NTrees,
                Param::InteractionDepth,
                Param::Shrinkage,
                Param::MinObsInNode,
                Param::BagFraction,
            ],
            Self::Lda => &[],
            Self::Qda => &[Param::RegParam],
        }
    }

    /// Checks the learner can run on `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] for an unsupported task kind.
    pub fn check_supports(&self, kind: TaskKind) -> Result<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(TuneError::InvalidConfig(format!(
                "learner {} does not support {kind} tasks",
                self.id()
            )))
        }
    }

    /// Checks every parameter in `assignment` is declared by this learner.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] naming the first
    /// undeclared parameter.
    pub fn check_params<'a>(&self, params: impl IntoIterator<Item = &'a Param>) -> Result<()> {
        let declared = self.params();
        for param in params {
            if !declared.contains(param) {
                return Err(TuneError::InvalidHyperparameter {
                    param: param.name().to_string(),
                    value: "-".to_string(),
                    constraint: format!("a hyperparameter of {}", self.id()),
                });
            }
        }
        Ok(())
    }

    /// Resolves and validates `assignment` without fitting.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidHyperparameter`] for an undeclared
    /// parameter or a value the backend rejects.
    pub fn validate(&self, kind: TaskKind, n_features: usize, assignment: &Assignment) -> Result<()> {
        self.resolve(kind, n_features, assignment).map(|_| ())
    }

    fn resolve(&self, kind: TaskKind, n_features: usize, assignment: &Assignment) -> Result<Resolved> {
        let params: Vec<Param> = assignment.params().collect();
        self.check_params(&params)?;
        Ok(match self {
            Self::Knn => Resolved::Knn(KnnParams::resolve(assignment)?),
            Self::RandomForest => {
                Resolved::Forest(ForestParams::resolve(assignment, kind, n_features)?)
            }
            Self::GradientBoosting => Resolved::Boosting(BoostingParams::resolve(assignment)?),
            Self::Lda => Resolved::Lda,
            Self::Qda => Resolved::Qda(QdaParams::resolve(assignment)?),
        })
    }

    /// Fits a backend on a feature matrix.
    ///
    /// Classification targets must contain at least two distinct classes.
    pub(crate) fn fit_backend(
        &self,
        kind: TaskKind,
        x: &Matrix<f32>,
        y: Target<'_>,
        assignment: &Assignment,
        seed: u64,
    ) -> Result<Backend> {
        self.check_supports(kind)?;
        let resolved = self.resolve(kind, x.n_cols(), assignment)?;

        if let Target::Classes { labels, .. } = y {
            if let Some(&first) = labels.first() {
                if labels.iter().all(|&l| l == first) {
                    return Err(TuneError::fit("training rows contain a single class"));
                }
            }
        }

        Ok(match resolved {
            Resolved::Knn(p) => Backend::Knn(Knn::fit(x, y, &p, seed)?),
            Resolved::Forest(p) => Backend::Forest(RandomForest::fit(x, y, &p, seed)?),
            Resolved::Boosting(p) => Backend::Boosting(GradientBoosting::fit(x, y, &p, seed)?),
            Resolved::Lda => Backend::Lda(Lda::fit(x, y, &(), seed)?),
            Resolved::Qda(p) => Backend::Qda(Qda::fit(x, y, &p, seed)?),
        })
    }

    /// Fits the learner on every row of `task`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] for an unsupported task kind,
    /// [`TuneError::InvalidHyperparameter`] for a bad assignment, or
    /// [`TuneError::Fit`] if the backend cannot fit the data.
    pub fn train(&self, task: &Task, assignment: &Assignment, seed: u64) -> Result<TrainedModel> {
        let y = match task.kind() {
            TaskKind::Regression => Target::Values(task.target_values().as_slice()),
            TaskKind::Classification => Target::Classes {
                labels: task.encoded_labels(),
                n_classes: task.classes().len(),
            },
        };
        let backend = self.fit_backend(task.kind(), task.features(), y, assignment, seed)?;

        Ok(TrainedModel {
            learner: *self,
            assignment: assignment.clone(),
            schema: task.schema().clone(),
            kind: task.kind(),
            classes: task.classes().to_vec(),
            backend,
        })
    }
}

impl std::fmt::Display for Learner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

enum Resolved {
    Knn(KnnParams),
    Forest(ForestParams),
    Boosting(BoostingParams),
    Lda,
    Qda(QdaParams),
}

/// A fitted backend of any family.
#[derive(Debug, Clone)]
pub(crate) enum Backend {
    Knn(Knn),
    Forest(RandomForest),
    Boosting(GradientBoosting),
    Lda(Lda),
    Qda(Qda),
}

impl Backend {
    pub(crate) fn predict(&self, x: &Matrix<f32>) -> Result<Output> {
        match self {
            Self::Knn(m) => m.predict(x),
            Self::Forest(m) => m.predict(x),
            Self::Boosting(m) => m.predict(x),
            Self::Lda(m) => m.predict(x),
            Self::Qda(m) => m.predict(x),
        }
    }

    fn oob_error(&self) -> Option<f64> {
        match self {
            Self::Forest(m) => m.oob_error(),
            _ => None,
        }
    }
}

/// Maps backend output back to target units: class indices become labels
/// from `classes`.
pub(crate) fn decode(output: Output, classes: &[f32]) -> Vec<f32> {
    match output {
        Output::Values(values) => values,
        Output::Classes(indices) => indices.into_iter().map(|i| classes[i]).collect(),
    }
}

/// A fitted model: learner, chosen hyperparameters, training schema and
/// backend. Immutable once built.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    learner: Learner,
    assignment: Assignment,
    schema: Schema,
    kind: TaskKind,
    classes: Vec<f32>,
    backend: Backend,
}

impl TrainedModel {
    /// Learner family.
    #[must_use]
    pub fn learner(&self) -> Learner {
        self.learner
    }

    /// Hyperparameters the model was fitted with.
    #[must_use]
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Columns the model was trained on.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Problem type.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Training label domain (empty for regression).
    #[must_use]
    pub fn classes(&self) -> &[f32] {
        &self.classes
    }

    /// Out-of-bag error, for random forests.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.backend.oob_error()
    }

    /// Predicts for every row of `data`, selecting feature columns by name.
    ///
    /// Classification predictions are labels from [`TrainedModel::classes`].
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::SchemaMismatch`] if a training feature column is
    /// missing from `data`.
    pub fn predict(&self, data: &DataFrame) -> Result<Vector<f32>> {
        let missing = self.schema.missing_in(data, false);
        if !missing.is_empty() {
            return Err(TuneError::SchemaMismatch { missing });
        }
        let x = data.to_matrix_of(&self.schema.feature_refs())?;
        Ok(Vector::from_vec(self.predict_matrix(&x)?))
    }

    pub(crate) fn predict_matrix(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        Ok(decode(self.backend.predict(x)?, &self.classes))
    }
}

/// Reads an integer parameter, defaulting when unset.
pub(crate) fn int_param(
    assignment: &Assignment,
    param: Param,
    default: usize,
    min: usize,
) -> Result<usize> {
    let Some(value) = assignment.get(param) else {
        return Ok(default);
    };
    match value.as_i64() {
        Some(v) if v >= min as i64 => Ok(v as usize),
        _ => Err(TuneError::InvalidHyperparameter {
            param: param.name().to_string(),
            value: value.to_string(),
            constraint: format!("an integer >= {min}"),
        }),
    }
}

/// Reads a numeric parameter, defaulting when unset.
pub(crate) fn float_param(
    assignment: &Assignment,
    param: Param,
    default: f64,
    valid: impl Fn(f64) -> bool,
    constraint: &str,
) -> Result<f64> {
    let Some(value) = assignment.get(param) else {
        return Ok(default);
    };
    match value.as_f64() {
        Some(v) if v.is_finite() && valid(v) => Ok(v),
        _ => Err(TuneError::InvalidHyperparameter {
            param: param.name().to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "learner_tests.rs"]
mod tests;
