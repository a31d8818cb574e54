//! Tuning pipeline: search, select, train and evaluate.
//!
//! [`TuningPipeline::tune`] evaluates every candidate of a search strategy
//! on one shared resample instance and returns the assignment with the
//! lowest mean error. Candidate evaluations fan out over a worker pool that
//! lives only for the duration of the call.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::DataFrame;
use crate::error::{Result, TuneError};
use crate::learner::{decode, Learner, TrainedModel};
use crate::metrics::{Measure, Metrics};
use crate::model_selection::{CrossValidationResult, ResampleInstance, Resampling, Split};
use crate::primitives::Vector;
use crate::task::{Task, TaskKind};
use crate::traits::Target;

use super::search::{Assignment, HyperparameterSpec, SearchSpace, SearchStrategy};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pipeline configuration. Passed explicitly; never global.
///
/// # Examples
///
/// ```
/// use aprender_tune::automl::TuningConfig;
/// use aprender_tune::metrics::Measure;
///
/// let config = TuningConfig::default()
///     .with_seed(7)
///     .with_n_workers(2)
///     .with_measure(Measure::Mae);
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.measure, Some(Measure::Mae));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Seed for resampling, random search and backend fitting
    pub seed: u64,
    /// Worker count; 0 uses the available parallelism
    pub n_workers: usize,
    /// Tuning measure; `None` uses the task kind's default
    pub measure: Option<Measure>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_workers: 0,
            measure: None,
        }
    }
}

impl TuningConfig {
    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the worker count (0 = available parallelism).
    #[must_use]
    pub fn with_n_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers;
        self
    }

    /// Set the tuning measure.
    #[must_use]
    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = Some(measure);
        self
    }

    /// Measure used for a task of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] if the configured measure
    /// belongs to the other task kind.
    pub fn measure_for(&self, kind: TaskKind) -> Result<Measure> {
        match self.measure {
            Some(measure) => {
                measure.check_applies(kind)?;
                Ok(measure)
            }
            None => Ok(Measure::default_for(kind)),
        }
    }

    /// Effective number of worker threads, capped at the available
    /// parallelism.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        let available = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        if self.n_workers == 0 {
            available
        } else {
            self.n_workers.min(available)
        }
    }
}

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Candidate hyperparameters
    pub assignment: Assignment,
    /// Mean error over all splits
    pub mean_error: f64,
    /// Error per split, in resample instance order
    pub split_errors: Vec<f64>,
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Learner that was tuned
    pub learner: Learner,
    /// Measure that was minimised
    pub measure: Measure,
    /// Winning assignment (always one of the trace entries)
    pub best: Assignment,
    /// Mean error of the winning assignment
    pub best_error: f64,
    /// Every candidate, in evaluation order
    pub trace: Vec<TrialRecord>,
}

impl SearchResult {
    /// Number of candidates evaluated.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.trace.len()
    }

    /// Trace entry of the winning assignment.
    #[must_use]
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.trace.iter().find(|t| t.assignment == self.best)
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

/// Tuning, training and evaluation entry points.
///
/// # Examples
///
/// ```
/// use aprender_tune::automl::params::Param;
/// use aprender_tune::automl::{Domain, HyperparameterSpec, SearchStrategy, TuningConfig, TuningPipeline};
/// use aprender_tune::data::DataFrame;
/// use aprender_tune::learner::Learner;
/// use aprender_tune::model_selection::Resampling;
/// use aprender_tune::primitives::Vector;
/// use aprender_tune::task::Task;
///
/// let x: Vec<f32> = (0..40).map(|i| i as f32).collect();
/// let y: Vec<f32> = x.iter().map(|v| 3.0 * v).collect();
/// let df = DataFrame::new(vec![
///     ("x".to_string(), Vector::from_vec(x)),
///     ("y".to_string(), Vector::from_vec(y)),
/// ])
/// .expect("frame");
/// let task = Task::regression("line", df, "y").expect("task");
///
/// let pipeline = TuningPipeline::new(TuningConfig::default().with_seed(1));
/// let space = pipeline
///     .define_search_space(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 4))])
///     .expect("space");
/// let result = pipeline
///     .tune(&task, Learner::Knn, &space, SearchStrategy::grid(), &Resampling::cv(4))
///     .expect("tune");
/// assert_eq!(result.n_candidates(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TuningPipeline {
    config: TuningConfig,
}

impl TuningPipeline {
    /// Creates a pipeline with the given configuration.
    #[must_use]
    pub fn new(config: TuningConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// Validates hyperparameter specs into a search space.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidDomain`] for a malformed or duplicated
    /// spec.
    pub fn define_search_space(&self, specs: Vec<HyperparameterSpec>) -> Result<SearchSpace> {
        SearchSpace::new(specs)
    }

    /// Searches `space` for the assignment with the lowest mean resampled
    /// error.
    ///
    /// Every candidate is scored on the same splits. Ties go to the first
    /// enumerated candidate; non-finite scores never win.
    ///
    /// # Errors
    ///
    /// - [`TuneError::InvalidConfig`] for a bad resampling, an unsupported
    ///   task kind or a measure of the wrong kind
    /// - [`TuneError::EmptySearchSpace`] if the strategy yields nothing
    /// - [`TuneError::InvalidHyperparameter`] if a candidate names an
    ///   undeclared parameter or violates a backend constraint
    /// - [`TuneError::ResamplingFailure`] if a split cannot be fit or scored
    /// - [`TuneError::LearnerDivergence`] if no candidate scores finitely
    pub fn tune(
        &self,
        task: &Task,
        learner: Learner,
        space: &SearchSpace,
        strategy: SearchStrategy,
        resampling: &Resampling,
    ) -> Result<SearchResult> {
        learner.check_supports(task.kind())?;
        let measure = self.config.measure_for(task.kind())?;
        learner.check_params(space.iter().map(|spec| &spec.param))?;

        let instance = resampling.instantiate(task, self.config.seed)?;
        let candidates = strategy.candidates(space, self.config.seed)?;
        for candidate in &candidates {
            learner.validate(task.kind(), task.features().n_cols(), candidate)?;
        }

        debug!(
            learner = %learner,
            candidates = candidates.len(),
            splits = instance.len(),
            %strategy,
            %resampling,
            "starting search"
        );

        let outcomes = self.run_candidates(candidates.len(), |i| {
            evaluate_candidate(task, learner, measure, &instance, &candidates[i], self.config.seed)
        })?;

        let mut trace = Vec::with_capacity(candidates.len());
        for (assignment, outcome) in candidates.into_iter().zip(outcomes) {
            let split_errors = outcome?;
            let mean_error = mean(&split_errors);
            debug!(learner = %learner, candidate = %assignment, mean_error, "candidate evaluated");
            trace.push(TrialRecord {
                assignment,
                mean_error,
                split_errors,
            });
        }

        let best_index = select_best(&trace).ok_or_else(|| {
            let split = trace
                .first()
                .and_then(|t| t.split_errors.iter().position(|e| !e.is_finite()))
                .unwrap_or(0);
            TuneError::LearnerDivergence {
                learner: learner.id().to_string(),
                split,
                reason: format!("no candidate produced a finite {measure}"),
            }
        })?;
        let best = trace[best_index].assignment.clone();
        let best_error = trace[best_index].mean_error;

        info!(
            task = task.id(),
            learner = %learner,
            candidates = trace.len(),
            best = %best,
            best_error,
            %measure,
            "search finished"
        );

        Ok(SearchResult {
            learner,
            measure,
            best,
            best_error,
            trace,
        })
    }

    /// Fits `learner` with `assignment` on every row of `task`.
    ///
    /// # Errors
    ///
    /// See [`Learner::train`].
    pub fn train_final(
        &self,
        task: &Task,
        learner: Learner,
        assignment: &Assignment,
    ) -> Result<TrainedModel> {
        learner.train(task, assignment, self.config.seed)
    }

    /// Scores `model` on a holdout frame, selecting columns by name.
    ///
    /// Rows whose true label lies outside the training label domain count
    /// as misclassified.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::SchemaMismatch`] if `holdout` lacks a training
    /// feature or the target column.
    pub fn evaluate_out_of_sample(&self, model: &TrainedModel, holdout: &DataFrame) -> Result<Metrics> {
        let missing = model.schema().missing_in(holdout, true);
        if !missing.is_empty() {
            return Err(TuneError::SchemaMismatch { missing });
        }
        let predictions = model.predict(holdout)?;
        let truth = holdout.column(&model.schema().target)?;
        Metrics::compute(model.kind(), predictions.as_slice(), truth.as_slice())
    }

    /// Predicts for every row of `rows`.
    ///
    /// # Errors
    ///
    /// See [`TrainedModel::predict`].
    pub fn predict(&self, model: &TrainedModel, rows: &DataFrame) -> Result<Vector<f32>> {
        model.predict(rows)
    }

    /// Resampled error of one fixed assignment.
    ///
    /// # Errors
    ///
    /// Same as [`TuningPipeline::tune`] for a single candidate, except that
    /// non-finite scores are returned rather than rejected.
    pub fn resample(
        &self,
        task: &Task,
        learner: Learner,
        assignment: &Assignment,
        resampling: &Resampling,
    ) -> Result<CrossValidationResult> {
        learner.check_supports(task.kind())?;
        let measure = self.config.measure_for(task.kind())?;
        learner.validate(task.kind(), task.features().n_cols(), assignment)?;
        let instance = resampling.instantiate(task, self.config.seed)?;

        let scores = self
            .run_candidates(instance.len(), |i| {
                evaluate_split(task, learner, measure, &instance.splits()[i], i, assignment, self.config.seed)
            })?
            .into_iter()
            .collect::<Result<Vec<f64>>>()?;

        debug!(learner = %learner, %assignment, splits = scores.len(), "resampled");
        Ok(CrossValidationResult { scores })
    }

    /// Runs `job` for `0..n` on a pool scoped to this call, returning the
    /// results in index order.
    #[cfg(feature = "parallel")]
    fn run_candidates<T, F>(&self, n: usize, job: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.effective_workers())
            .build()
            .map_err(|e| TuneError::InvalidConfig(format!("cannot start worker pool: {e}")))?;
        Ok(pool.install(|| (0..n).into_par_iter().map(&job).collect()))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_candidates<T, F>(&self, n: usize, job: F) -> Result<Vec<T>>
    where
        F: Fn(usize) -> T,
    {
        Ok((0..n).map(job).collect())
    }
}

/// Seed for fitting on split `index`, shared by every candidate so that
/// candidates differ only in their hyperparameters.
fn split_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn evaluate_candidate(
    task: &Task,
    learner: Learner,
    measure: Measure,
    instance: &ResampleInstance,
    assignment: &Assignment,
    seed: u64,
) -> Result<Vec<f64>> {
    instance
        .splits()
        .iter()
        .enumerate()
        .map(|(i, split)| evaluate_split(task, learner, measure, split, i, assignment, seed))
        .collect()
}

/// Fits on the split's training rows and scores its test rows.
fn evaluate_split(
    task: &Task,
    learner: Learner,
    measure: Measure,
    split: &Split,
    index: usize,
    assignment: &Assignment,
    seed: u64,
) -> Result<f64> {
    let failure = |reason: String| TuneError::ResamplingFailure {
        split: index,
        assignment: assignment.to_string(),
        reason,
    };

    let x_train = task.features().select_rows(&split.train);
    let y_values;
    let y_labels: Vec<usize>;
    let target = match task.kind() {
        TaskKind::Regression => {
            y_values = task.target_values().select(&split.train);
            Target::Values(y_values.as_slice())
        }
        TaskKind::Classification => {
            let encoded = task.encoded_labels();
            y_labels = split.train.iter().map(|&i| encoded[i]).collect();
            Target::Classes {
                labels: &y_labels,
                n_classes: task.classes().len(),
            }
        }
    };

    let backend = learner
        .fit_backend(task.kind(), &x_train, target, assignment, split_seed(seed, index))
        .map_err(|e| failure(e.to_string()))?;
    let x_test = task.features().select_rows(&split.test);
    let output = backend.predict(&x_test).map_err(|e| failure(e.to_string()))?;
    let predictions = decode(output, task.classes());
    let truth = task.target_values().select(&split.test);

    measure
        .evaluate(&predictions, truth.as_slice())
        .map_err(|e| failure(e.to_string()))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Index of the lowest finite mean error; the first one wins ties.
fn select_best(trace: &[TrialRecord]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, trial) in trace.iter().enumerate() {
        if !trial.mean_error.is_finite() {
            continue;
        }
        match best {
            Some((_, error)) if trial.mean_error >= error => {}
            _ => best = Some((i, trial.mean_error)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
#[path = "tuner_tests.rs"]
mod tests;
