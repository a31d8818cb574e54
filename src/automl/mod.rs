//! Hyperparameter search, tuning and benchmarking.
//!
//! # Example
//!
//! ```
//! use aprender_tune::automl::params::Param;
//! use aprender_tune::automl::{Domain, HyperparameterSpec, SearchStrategy, TuningConfig, TuningPipeline};
//! use aprender_tune::data::DataFrame;
//! use aprender_tune::learner::Learner;
//! use aprender_tune::model_selection::Resampling;
//! use aprender_tune::primitives::Vector;
//! use aprender_tune::task::Task;
//!
//! let x: Vec<f32> = (0..24).map(|i| (i % 12) as f32 + if i < 12 { 0.0 } else { 20.0 }).collect();
//! let y: Vec<f32> = (0..24).map(|i| if i < 12 { 0.0 } else { 1.0 }).collect();
//! let df = DataFrame::new(vec![
//!     ("x".to_string(), Vector::from_vec(x)),
//!     ("label".to_string(), Vector::from_vec(y)),
//! ])
//! .expect("frame");
//! let task = Task::classification("two-groups", df, "label").expect("task");
//!
//! let pipeline = TuningPipeline::new(TuningConfig::default().with_seed(3));
//! let space = pipeline
//!     .define_search_space(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 5))])
//!     .expect("space");
//! let result = pipeline
//!     .tune(&task, Learner::Knn, &space, SearchStrategy::grid(), &Resampling::cv(4).stratified())
//!     .expect("tune");
//!
//! let model = pipeline.train_final(&task, Learner::Knn, &result.best).expect("train");
//! let metrics = pipeline.evaluate_out_of_sample(&model, task.data()).expect("evaluate");
//! assert_eq!(metrics.accuracy(), Some(1.0));
//! ```

mod benchmark;
pub mod params;
pub mod search;
mod tuner;

pub use benchmark::{BenchmarkReport, BenchmarkRow, BenchmarkRunner, LearnerFailure, TuneWrapper};
pub use params::Param;
pub use search::{
    Assignment, Domain, HyperparameterSpec, ParamValue, SearchSpace, SearchStrategy,
    DEFAULT_RESOLUTION, MAX_GRID_SIZE,
};
pub use tuner::{SearchResult, TrialRecord, TuningConfig, TuningPipeline};
