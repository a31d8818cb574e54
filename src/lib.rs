//! aprender-tune: hyperparameter tuning, resampling and benchmarking for
//! small tabular learning tasks.
//!
//! A [`task::Task`] wraps a read-only [`data::DataFrame`] with a target
//! column. A [`automl::TuningPipeline`] searches a typed
//! [`automl::SearchSpace`] for one [`learner::Learner`] under a
//! [`model_selection::Resampling`], refits the winner and scores it on new
//! rows. [`automl::BenchmarkRunner`] nests that search inside an outer
//! resampling to compare learners.
//!
//! # Quick Start
//!
//! ```
//! use aprender_tune::prelude::*;
//!
//! let x: Vec<f32> = (0..30).map(|i| i as f32).collect();
//! let y: Vec<f32> = x.iter().map(|v| 2.0 * v + 1.0).collect();
//! let df = DataFrame::new(vec![
//!     ("x".to_string(), Vector::from_vec(x)),
//!     ("y".to_string(), Vector::from_vec(y)),
//! ])
//! .expect("frame");
//! let task = Task::regression("line", df, "y").expect("task");
//!
//! let pipeline = TuningPipeline::new(TuningConfig::default());
//! let space = pipeline
//!     .define_search_space(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 12))])
//!     .expect("space");
//! let result = pipeline
//!     .tune(&task, Learner::Knn, &space, SearchStrategy::grid(), &Resampling::cv(5))
//!     .expect("tune");
//! assert_eq!(result.n_candidates(), 12);
//!
//! let model = pipeline.train_final(&task, Learner::Knn, &result.best).expect("train");
//! let metrics = pipeline.evaluate_out_of_sample(&model, task.data()).expect("evaluate");
//! assert!(metrics.get(Measure::Mse).is_some());
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`data`]: DataFrame for named columns, CSV loading
//! - [`task`]: Regression and classification tasks
//! - [`metrics`]: Error measures
//! - [`model_selection`]: K-fold, repeated and holdout resampling
//! - [`learner`]: kNN, random forest, gradient boosting, LDA and QDA
//! - [`preprocessing`]: Feature standardisation
//! - [`automl`]: Search spaces, tuning pipeline and benchmarking
//!
//! # Features
//!
//! - `parallel` (default): evaluate candidates on a scoped rayon pool

pub mod automl;
pub mod data;
pub mod error;
pub mod learner;
pub mod metrics;
pub mod model_selection;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod task;
pub mod traits;

pub use error::{Result, TuneError};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer};
