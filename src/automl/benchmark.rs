//! Nested resampling benchmark.
//!
//! Each [`TuneWrapper`] is tuned on the training rows of every outer split,
//! refitted there with its best assignment and scored on the outer test
//! rows. A wrapper that fails is reported in its own row; the others run on.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TuneError};
use crate::learner::Learner;
use crate::metrics::Measure;
use crate::model_selection::{Resampling, Split};
use crate::task::Task;

use super::search::{Assignment, SearchSpace, SearchStrategy};
use super::tuner::{TuningConfig, TuningPipeline};

/// A learner bundled with its own search: space, strategy and inner
/// resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneWrapper {
    /// Row label in the report
    pub id: String,
    /// Learner to tune
    pub learner: Learner,
    /// Search space
    pub space: SearchSpace,
    /// Candidate enumeration
    pub strategy: SearchStrategy,
    /// Resampling used inside each outer training set
    pub inner: Resampling,
}

impl TuneWrapper {
    /// Wraps `learner` with grid search and 5-fold inner CV.
    #[must_use]
    pub fn new(learner: Learner, space: SearchSpace) -> Self {
        Self {
            id: learner.id().to_string(),
            learner,
            space,
            strategy: SearchStrategy::default(),
            inner: Resampling::default(),
        }
    }

    /// Set the report label.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the search strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the inner resampling.
    #[must_use]
    pub fn with_inner(mut self, inner: Resampling) -> Self {
        self.inner = inner;
        self
    }
}

/// Why a wrapped learner has no aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerFailure {
    /// Outer split where the learner failed
    pub split: usize,
    /// Failure description
    pub message: String,
}

/// Benchmark outcome for one wrapped learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    /// Wrapper label
    pub learner: String,
    /// Outer test score per split (stops at the failing split)
    pub fold_scores: Vec<f64>,
    /// Mean of `fold_scores`; NaN when the learner failed
    pub aggregate: f64,
    /// Tuned assignment per outer split
    pub tuned: Vec<Assignment>,
    /// Set when the learner failed on some split
    pub failure: Option<LearnerFailure>,
}

impl BenchmarkRow {
    /// True if every outer split produced a finite score.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Scores of all wrapped learners on one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Task identifier
    pub task: String,
    /// Measure used for inner tuning and outer scoring
    pub measure: Measure,
    /// Rendered outer resampling
    pub outer: String,
    /// One row per wrapped learner, in input order
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkReport {
    /// Row for the wrapper labelled `id`.
    #[must_use]
    pub fn row(&self, id: &str) -> Option<&BenchmarkRow> {
        self.rows.iter().find(|r| r.learner == id)
    }

    /// Successful row with the lowest aggregate.
    #[must_use]
    pub fn best(&self) -> Option<&BenchmarkRow> {
        self.rows
            .iter()
            .filter(|r| r.succeeded() && r.aggregate.is_finite())
            .fold(None, |best: Option<&BenchmarkRow>, row| match best {
                Some(b) if b.aggregate <= row.aggregate => Some(b),
                _ => Some(row),
            })
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "task: {}  outer: {}  measure: {}", self.task, self.outer, self.measure)?;
        let width = self
            .rows
            .iter()
            .map(|r| r.learner.len())
            .max()
            .unwrap_or(0)
            .max("learner".len());
        writeln!(f, "{:<width$}  {:>10}  {:>10}  {:>10}", "learner", "mean", "min", "max")?;
        for row in &self.rows {
            match &row.failure {
                Some(failure) => writeln!(
                    f,
                    "{:<width$}  failed on split {}: {}",
                    row.learner, failure.split, failure.message
                )?,
                None => {
                    let min = row.fold_scores.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = row.fold_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    writeln!(
                        f,
                        "{:<width$}  {:>10.4}  {:>10.4}  {:>10.4}",
                        row.learner, row.aggregate, min, max
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Runs wrapped learners under an outer resampling.
///
/// # Examples
///
/// ```
/// use aprender_tune::automl::params::Param;
/// use aprender_tune::automl::{BenchmarkRunner, Domain, HyperparameterSpec, SearchSpace, TuneWrapper, TuningConfig};
/// use aprender_tune::data::DataFrame;
/// use aprender_tune::learner::Learner;
/// use aprender_tune::model_selection::Resampling;
/// use aprender_tune::primitives::Vector;
/// use aprender_tune::task::Task;
///
/// let x: Vec<f32> = (0..30).map(|i| i as f32).collect();
/// let y: Vec<f32> = x.iter().map(|v| v * 0.5).collect();
/// let df = DataFrame::new(vec![
///     ("x".to_string(), Vector::from_vec(x)),
///     ("y".to_string(), Vector::from_vec(y)),
/// ])
/// .expect("frame");
/// let task = Task::regression("half", df, "y").expect("task");
///
/// let space = SearchSpace::new(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 3))])
///     .expect("space");
/// let wrapper = TuneWrapper::new(Learner::Knn, space).with_inner(Resampling::cv(3));
///
/// let report = BenchmarkRunner::new(TuningConfig::default())
///     .run(&task, &[wrapper], &Resampling::cv(3))
///     .expect("benchmark");
/// assert_eq!(report.rows[0].fold_scores.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRunner {
    config: TuningConfig,
}

impl BenchmarkRunner {
    /// Creates a runner; the same configuration drives every inner search.
    #[must_use]
    pub fn new(config: TuningConfig) -> Self {
        Self { config }
    }

    /// Benchmarks every wrapper on `task` under `outer`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] for an empty wrapper list, an
    /// unusable outer resampling or a measure of the wrong kind. Failures of
    /// individual learners are recorded in their rows instead.
    pub fn run(
        &self,
        task: &Task,
        wrappers: &[TuneWrapper],
        outer: &Resampling,
    ) -> Result<BenchmarkReport> {
        if wrappers.is_empty() {
            return Err(TuneError::InvalidConfig(
                "benchmark needs at least one learner".to_string(),
            ));
        }
        let measure = self.config.measure_for(task.kind())?;
        let instance = outer.instantiate(task, self.config.seed)?;
        let pipeline = TuningPipeline::new(self.config);

        let rows: Vec<BenchmarkRow> = wrappers
            .iter()
            .map(|wrapper| {
                let mut row = BenchmarkRow {
                    learner: wrapper.id.clone(),
                    fold_scores: Vec::with_capacity(instance.len()),
                    aggregate: f64::NAN,
                    tuned: Vec::with_capacity(instance.len()),
                    failure: None,
                };

                for (i, split) in instance.splits().iter().enumerate() {
                    match outer_fold(&pipeline, task, wrapper, measure, split) {
                        Ok((assignment, score)) if score.is_finite() => {
                            row.tuned.push(assignment);
                            row.fold_scores.push(score);
                        }
                        Ok((assignment, score)) => {
                            row.tuned.push(assignment);
                            row.failure = Some(LearnerFailure {
                                split: i,
                                message: TuneError::LearnerDivergence {
                                    learner: wrapper.id.clone(),
                                    split: i,
                                    reason: format!("outer {measure} is {score}"),
                                }
                                .to_string(),
                            });
                        }
                        Err(err) => {
                            row.failure = Some(LearnerFailure {
                                split: i,
                                message: err.to_string(),
                            });
                        }
                    }
                    if let Some(failure) = &row.failure {
                        warn!(
                            task = task.id(),
                            learner = %wrapper.id,
                            split = failure.split,
                            error = %failure.message,
                            "learner failed, recorded in report"
                        );
                        break;
                    }
                }

                if row.failure.is_none() {
                    row.aggregate =
                        row.fold_scores.iter().sum::<f64>() / row.fold_scores.len() as f64;
                }
                info!(
                    task = task.id(),
                    learner = %wrapper.id,
                    aggregate = row.aggregate,
                    %measure,
                    "learner benchmarked"
                );
                row
            })
            .collect();

        Ok(BenchmarkReport {
            task: task.id().to_string(),
            measure,
            outer: outer.to_string(),
            rows,
        })
    }
}

/// Tunes on the outer training rows, refits there and scores the outer
/// test rows.
fn outer_fold(
    pipeline: &TuningPipeline,
    task: &Task,
    wrapper: &TuneWrapper,
    measure: Measure,
    split: &Split,
) -> Result<(Assignment, f64)> {
    let train = task.subset(&split.train)?;
    let search = pipeline.tune(
        &train,
        wrapper.learner,
        &wrapper.space,
        wrapper.strategy,
        &wrapper.inner,
    )?;
    let model = pipeline.train_final(&train, wrapper.learner, &search.best)?;

    let test = task.data().take_rows(&split.test)?;
    let predictions = model.predict(&test)?;
    let truth = task.target_values().select(&split.test);
    let score = measure.evaluate(predictions.as_slice(), truth.as_slice())?;
    Ok((search.best, score))
}

#[cfg(test)]
#[path = "benchmark_tests.rs"]
mod tests;
