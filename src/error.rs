//! Error types for tuning, resampling and benchmarking.
//!
//! Every failure carries enough context (failing split, failing candidate
//! assignment, offending parameter) to reproduce it.

use thiserror::Error;

/// Main error type for aprender-tune operations.
///
/// # Examples
///
/// ```
/// use aprender_tune::error::TuneError;
///
/// let err = TuneError::InvalidDomain {
///     param: "k".to_string(),
///     reason: "lower bound 12 exceeds upper bound 1".to_string(),
/// };
/// assert!(err.to_string().contains("invalid domain"));
/// ```
#[derive(Debug, Error)]
pub enum TuneError {
    /// Hyperparameter domain is malformed (inverted bounds, empty choices).
    #[error("invalid domain for hyperparameter {param}: {reason}")]
    InvalidDomain {
        /// Parameter name
        param: String,
        /// What is wrong with the domain
        reason: String,
    },

    /// The search strategy produced no candidate assignments.
    #[error("search space produced no candidates")]
    EmptySearchSpace,

    /// A resampling split could not be fit or scored.
    #[error("resampling split {split} failed for {assignment}: {reason}")]
    ResamplingFailure {
        /// Index of the failing split within the resample instance
        split: usize,
        /// Rendered candidate assignment
        assignment: String,
        /// Backend failure description
        reason: String,
    },

    /// Evaluation data does not carry the columns the model was trained on.
    #[error("schema mismatch: missing columns {missing:?}")]
    SchemaMismatch {
        /// Column names present at training time but absent now
        missing: Vec<String>,
    },

    /// A learner produced a non-finite score.
    #[error("learner {learner} diverged on split {split}: {reason}")]
    LearnerDivergence {
        /// Learner identity
        learner: String,
        /// Index of the split where divergence was observed
        split: usize,
        /// Description of the failure
        reason: String,
    },

    /// A hyperparameter value violates a learner constraint.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Task construction failed.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// Resampling, measure or pipeline configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend fit or predict failure outside of a resampling loop.
    #[error("fit failed: {0}")]
    Fit(String),

    /// Data source or `DataFrame` failure.
    #[error("data error: {message}")]
    Data {
        /// Error description
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON export failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TuneError {
    /// Create a data error from any message.
    #[must_use]
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a fit error from any message.
    #[must_use]
    pub fn fit(message: impl Into<String>) -> Self {
        Self::Fit(message.into())
    }

    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::Fit(format!(
            "dimension mismatch: {context} expected {expected}, got {actual}"
        ))
    }
}

impl From<serde_json::Error> for TuneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for TuneError {
    fn from(err: csv::Error) -> Self {
        Self::data(err.to_string())
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, TuneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampling_failure_display_names_split_and_assignment() {
        let err = TuneError::ResamplingFailure {
            split: 3,
            assignment: "{k=5}".to_string(),
            reason: "training rows contain a single class".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("split 3"));
        assert!(msg.contains("{k=5}"));
        assert!(msg.contains("single class"));
    }

    #[test]
    fn test_schema_mismatch_lists_missing_columns() {
        let err = TuneError::SchemaMismatch {
            missing: vec!["alcohol".to_string()],
        };
        assert!(err.to_string().contains("alcohol"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TuneError = io.into();
        assert!(matches!(err, TuneError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_data_helper() {
        let err = TuneError::data("bad cell");
        assert_eq!(err.to_string(), "data error: bad cell");
    }
}
