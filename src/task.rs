//! Supervised learning tasks.
//!
//! A [`Task`] bundles a read-only [`DataFrame`] with a designated target
//! column and a problem type. Every remaining column is a feature.

use serde::{Deserialize, Serialize};

use crate::data::DataFrame;
use crate::error::{Result, TuneError};
use crate::primitives::{Matrix, Vector};

/// Problem type of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Continuous target.
    Regression,
    /// Discrete class target.
    Classification,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regression => write!(f, "regression"),
            Self::Classification => write!(f, "classification"),
        }
    }
}

/// Column layout a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Feature columns, in the order the model consumes them.
    pub features: Vec<String>,
    /// Target column.
    pub target: String,
}

impl Schema {
    /// Feature names as borrowed strings.
    #[must_use]
    pub fn feature_refs(&self) -> Vec<&str> {
        self.features.iter().map(String::as_str).collect()
    }

    /// Columns of this schema that `df` does not carry.
    #[must_use]
    pub fn missing_in(&self, df: &DataFrame, include_target: bool) -> Vec<String> {
        let mut missing: Vec<String> = self
            .features
            .iter()
            .filter(|name| !df.has_column(name))
            .cloned()
            .collect();
        if include_target && !df.has_column(&self.target) {
            missing.push(self.target.clone());
        }
        missing
    }
}

/// A dataset with a designated target column and problem type.
///
/// # Examples
///
/// ```
/// use aprender_tune::data::DataFrame;
/// use aprender_tune::primitives::Vector;
/// use aprender_tune::task::{Task, TaskKind};
///
/// let df = DataFrame::new(vec![
///     ("x".to_string(), Vector::from_slice(&[1.0, 2.0, 3.0, 4.0])),
///     ("class".to_string(), Vector::from_slice(&[1.0, 1.0, 2.0, 2.0])),
/// ]).expect("valid frame");
///
/// let task = Task::classification("toy", df, "class").expect("valid task");
/// assert_eq!(task.kind(), TaskKind::Classification);
/// assert_eq!(task.classes(), &[1.0, 2.0]);
/// assert_eq!(task.feature_names(), &["x".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    data: DataFrame,
    schema: Schema,
    kind: TaskKind,
    x: Matrix<f32>,
    y: Vector<f32>,
    /// Sorted label domain (classification only).
    classes: Vec<f32>,
    /// Index into `classes` per row (classification only).
    encoded: Vec<usize>,
}

impl Task {
    /// Creates a regression task.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidTask`] if the target is missing, the data
    /// is empty, or there are no feature columns.
    pub fn regression(id: impl Into<String>, data: DataFrame, target: &str) -> Result<Self> {
        Self::build(id.into(), data, target, TaskKind::Regression)
    }

    /// Creates a classification task.
    ///
    /// Target values are class codes; the distinct values form the label
    /// domain.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidTask`] for the same reasons as
    /// [`Task::regression`], or when fewer than two classes are present.
    pub fn classification(id: impl Into<String>, data: DataFrame, target: &str) -> Result<Self> {
        Self::build(id.into(), data, target, TaskKind::Classification)
    }

    fn build(id: String, data: DataFrame, target: &str, kind: TaskKind) -> Result<Self> {
        if !data.has_column(target) {
            return Err(TuneError::InvalidTask(format!(
                "target column '{target}' not found"
            )));
        }
        if data.n_rows() == 0 {
            return Err(TuneError::InvalidTask("dataset has no rows".to_string()));
        }

        let features: Vec<String> = data
            .column_names()
            .into_iter()
            .filter(|name| *name != target)
            .map(str::to_string)
            .collect();
        if features.is_empty() {
            return Err(TuneError::InvalidTask(
                "dataset has no feature columns".to_string(),
            ));
        }

        let schema = Schema {
            features,
            target: target.to_string(),
        };
        let x = data.to_matrix_of(&schema.feature_refs())?;
        let y = data.column(target)?.clone();

        if !y.all_finite() {
            return Err(TuneError::InvalidTask(format!(
                "target column '{target}' contains non-finite values"
            )));
        }

        let (classes, encoded) = match kind {
            TaskKind::Regression => (Vec::new(), Vec::new()),
            TaskKind::Classification => {
                let classes = label_domain(y.as_slice());
                if classes.len() < 2 {
                    return Err(TuneError::InvalidTask(format!(
                        "classification target '{target}' has {} distinct value(s), need at least 2",
                        classes.len()
                    )));
                }
                let encoded = encode_labels(y.as_slice(), &classes);
                (classes, encoded)
            }
        };

        Ok(Self {
            id,
            data,
            schema,
            kind,
            x,
            y,
            classes,
            encoded,
        })
    }

    /// Task identifier used in reports.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Problem type.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Underlying dataset.
    #[must_use]
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Training schema (features + target).
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.schema.features
    }

    /// Target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.schema.target
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.x.n_rows()
    }

    /// Feature matrix (rows × features).
    #[must_use]
    pub fn features(&self) -> &Matrix<f32> {
        &self.x
    }

    /// Raw target values.
    #[must_use]
    pub fn target_values(&self) -> &Vector<f32> {
        &self.y
    }

    /// Sorted label domain; empty for regression.
    #[must_use]
    pub fn classes(&self) -> &[f32] {
        &self.classes
    }

    /// Class index per row; empty for regression.
    #[must_use]
    pub fn encoded_labels(&self) -> &[usize] {
        &self.encoded
    }

    /// Number of distinct classes among the given rows.
    #[must_use]
    pub fn n_classes_in(&self, rows: &[usize]) -> usize {
        let mut seen = vec![false; self.classes.len()];
        for &r in rows {
            seen[self.encoded[r]] = true;
        }
        seen.into_iter().filter(|&s| s).count()
    }

    /// A task restricted to the given rows.
    ///
    /// The label domain is recomputed from the subset, so a classification
    /// subset with a single class is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if an index is out of bounds or the subset is not a
    /// valid task on its own.
    pub fn subset(&self, rows: &[usize]) -> Result<Self> {
        let data = self.data.take_rows(rows)?;
        Self::build(self.id.clone(), data, &self.schema.target, self.kind)
    }
}

/// Sorted distinct values of a label column.
pub(crate) fn label_domain(values: &[f32]) -> Vec<f32> {
    let mut classes: Vec<f32> = values.to_vec();
    classes.sort_by(f32::total_cmp);
    classes.dedup();
    classes
}

/// Maps each value to its index in `classes` (values must be present).
fn encode_labels(values: &[f32], classes: &[f32]) -> Vec<usize> {
    values
        .iter()
        .map(|v| {
            classes
                .binary_search_by(|c| c.total_cmp(v))
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
