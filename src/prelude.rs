//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use aprender_tune::prelude::*;
//! ```

pub use crate::automl::{
    Assignment, BenchmarkReport, BenchmarkRunner, Domain, HyperparameterSpec, Param,
    SearchResult, SearchSpace, SearchStrategy, TuneWrapper, TuningConfig, TuningPipeline,
};
pub use crate::data::DataFrame;
pub use crate::error::{Result, TuneError};
pub use crate::learner::{Learner, TrainedModel};
pub use crate::metrics::{Measure, Metrics};
pub use crate::model_selection::Resampling;
pub use crate::primitives::{Matrix, Vector};
pub use crate::task::{Task, TaskKind};
pub use crate::traits::{Estimator, Transformer};
