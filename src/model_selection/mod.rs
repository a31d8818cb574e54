//! Resampling strategies for tuning and benchmarking.
//!
//! This module provides tools for:
//! - K-Fold and stratified K-Fold partitioning
//! - Repeated K-Fold cross-validation
//! - Single holdout splits
//! - Per-split score summaries

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};
use crate::task::{Task, TaskKind};

/// Scores collected over the splits of a resample instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    /// Score for each split, in split order
    pub scores: Vec<f64>,
}

impl CrossValidationResult {
    /// Calculate mean score across splits
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NAN;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Calculate standard deviation of scores
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NAN;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f64>()
            / self.scores.len() as f64;
        variance.sqrt()
    }

    /// Get minimum score
    #[must_use]
    pub fn min(&self) -> f64 {
        self.scores.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Get maximum score
    #[must_use]
    pub fn max(&self) -> f64 {
        self.scores
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// K-Fold partitioner.
///
/// Splits data into K consecutive folds whose sizes differ by at most one.
/// Each fold is used once as test set while the remaining K-1 folds form the
/// training set.
///
/// # Example
///
/// ```rust
/// use aprender_tune::model_selection::KFold;
///
/// let kfold = KFold::new(5).with_random_state(7);
/// let splits = kfold.split(12);
/// assert_eq!(splits.len(), 5);
/// assert_eq!(splits[0].1.len(), 3);
/// assert_eq!(splits[4].1.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    /// Create a new K-Fold partitioner.
    ///
    /// # Arguments
    ///
    /// * `n_splits` - Number of folds. Must be at least 2.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Enable shuffling before splitting into folds.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducible shuffling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true; // Shuffle is implied when random_state is set
        self
    }

    /// Generate train/test indices for each fold.
    ///
    /// Returns a vector of (train_indices, test_indices) tuples.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = make_rng(self.random_state);
            indices.shuffle(&mut rng);
        }
        contiguous_folds(&indices, self.n_splits)
    }
}

/// Stratified K-Fold partitioner.
///
/// Keeps the number of rows of each class in every fold within one of its
/// proportional share. Labels are class indices (see
/// [`Task::encoded_labels`]).
///
/// # Example
///
/// ```rust
/// use aprender_tune::model_selection::StratifiedKFold;
///
/// let labels = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2];
/// let skfold = StratifiedKFold::new(2).with_random_state(3);
///
/// let splits = skfold.split(&labels);
/// assert_eq!(splits.len(), 2);
/// for (_, test) in &splits {
///     assert_eq!(test.iter().filter(|&&i| labels[i] == 0).count(), 2);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl StratifiedKFold {
    /// Create a new Stratified K-Fold partitioner.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Enable shuffling within each class before assignment.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducible shuffling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Generate stratified train/test indices for each fold.
    ///
    /// Rows are grouped by class, each group is (optionally) shuffled, and
    /// the concatenated groups are dealt round-robin onto the folds. Per-class
    /// fold counts are therefore `floor` or `ceil` of the class share and the
    /// total fold sizes differ by at most one.
    #[must_use]
    pub fn split(&self, labels: &[usize]) -> Vec<(Vec<usize>, Vec<usize>)> {
        let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &label) in labels.iter().enumerate() {
            by_class[label].push(i);
        }

        if self.shuffle {
            let mut rng = make_rng(self.random_state);
            for indices in &mut by_class {
                indices.shuffle(&mut rng);
            }
        }

        let mut fold_indices: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for (position, idx) in by_class.into_iter().flatten().enumerate() {
            fold_indices[position % self.n_splits].push(idx);
        }

        folds_to_splits(&fold_indices, labels.len())
    }
}

fn make_rng(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Cuts an index permutation into `k` contiguous folds, spreading the
/// remainder over the first folds.
fn contiguous_folds(indices: &[usize], k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let n_samples = indices.len();
    let fold_size = n_samples / k;
    let remainder = n_samples % k;

    let mut result = Vec::with_capacity(k);
    let mut start = 0;

    for i in 0..k {
        let current_fold_size = if i < remainder {
            fold_size + 1
        } else {
            fold_size
        };
        let end = start + current_fold_size;

        let test_indices: Vec<usize> = indices[start..end].to_vec();

        let mut train_indices = Vec::with_capacity(n_samples - current_fold_size);
        train_indices.extend_from_slice(&indices[..start]);
        train_indices.extend_from_slice(&indices[end..]);

        result.push((train_indices, test_indices));
        start = end;
    }

    result
}

fn folds_to_splits(fold_indices: &[Vec<usize>], n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let mut result = Vec::with_capacity(fold_indices.len());
    for (i, test) in fold_indices.iter().enumerate() {
        let mut train_indices = Vec::with_capacity(n_samples - test.len());
        for (j, fold) in fold_indices.iter().enumerate() {
            if i != j {
                train_indices.extend_from_slice(fold);
            }
        }
        result.push((train_indices, test.clone()));
    }
    result
}

/// How to partition a task's rows into train/test splits.
///
/// # Examples
///
/// ```
/// use aprender_tune::model_selection::Resampling;
///
/// let inner = Resampling::cv(5);
/// let outer = Resampling::repeated_cv(10, 50).stratified();
/// assert_eq!(inner.n_splits(), 5);
/// assert_eq!(outer.n_splits(), 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Resampling {
    /// K disjoint folds.
    CV {
        /// Number of folds (>= 2)
        folds: usize,
        /// Preserve class proportions per fold
        stratify: bool,
    },
    /// K-fold repeated with an independent partition per repetition.
    RepeatedCV {
        /// Number of folds per repetition (>= 2)
        folds: usize,
        /// Number of repetitions (>= 1)
        reps: usize,
        /// Preserve class proportions per fold
        stratify: bool,
    },
    /// A single random train/test split.
    Holdout {
        /// Proportion of rows used for training, in (0, 1)
        ratio: f64,
        /// Preserve class proportions on both sides
        stratify: bool,
    },
}

impl Resampling {
    /// Plain k-fold cross-validation.
    #[must_use]
    pub fn cv(folds: usize) -> Self {
        Self::CV {
            folds,
            stratify: false,
        }
    }

    /// Repeated k-fold cross-validation.
    #[must_use]
    pub fn repeated_cv(folds: usize, reps: usize) -> Self {
        Self::RepeatedCV {
            folds,
            reps,
            stratify: false,
        }
    }

    /// Single holdout split with the given training proportion.
    #[must_use]
    pub fn holdout(ratio: f64) -> Self {
        Self::Holdout {
            ratio,
            stratify: false,
        }
    }

    /// Same strategy with stratification by class enabled.
    #[must_use]
    pub fn stratified(self) -> Self {
        match self {
            Self::CV { folds, .. } => Self::CV {
                folds,
                stratify: true,
            },
            Self::RepeatedCV { folds, reps, .. } => Self::RepeatedCV {
                folds,
                reps,
                stratify: true,
            },
            Self::Holdout { ratio, .. } => Self::Holdout {
                ratio,
                stratify: true,
            },
        }
    }

    /// Whether class proportions are preserved.
    #[must_use]
    pub fn is_stratified(&self) -> bool {
        match *self {
            Self::CV { stratify, .. }
            | Self::RepeatedCV { stratify, .. }
            | Self::Holdout { stratify, .. } => stratify,
        }
    }

    /// Number of train/test splits an instance will contain.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        match *self {
            Self::CV { folds, .. } => folds,
            Self::RepeatedCV { folds, reps, .. } => folds * reps,
            Self::Holdout { .. } => 1,
        }
    }

    /// Checks the configuration against a task.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidConfig`] if `folds < 2`, `reps < 1`,
    /// `folds` exceeds the number of rows, the holdout ratio leaves either
    /// side empty, or stratification is requested on a regression task.
    pub fn validate(&self, task: &Task) -> Result<()> {
        let n = task.n_rows();
        if self.is_stratified() && task.kind() == TaskKind::Regression {
            return Err(TuneError::InvalidConfig(
                "stratified resampling requires a classification task".to_string(),
            ));
        }

        match *self {
            Self::CV { folds, .. } | Self::RepeatedCV { folds, .. } => {
                if folds < 2 {
                    return Err(TuneError::InvalidConfig(format!(
                        "cross-validation needs at least 2 folds, got {folds}"
                    )));
                }
                if folds > n {
                    return Err(TuneError::InvalidConfig(format!(
                        "{folds} folds requested for {n} rows"
                    )));
                }
                if let Self::RepeatedCV { reps, .. } = *self {
                    if reps < 1 {
                        return Err(TuneError::InvalidConfig(
                            "repeated cross-validation needs at least 1 repetition".to_string(),
                        ));
                    }
                }
            }
            Self::Holdout { ratio, .. } => {
                if !(ratio > 0.0 && ratio < 1.0) {
                    return Err(TuneError::InvalidConfig(format!(
                        "holdout ratio must be in (0, 1), got {ratio}"
                    )));
                }
                let n_train = if self.is_stratified() {
                    stratified_cut(task.encoded_labels(), ratio).iter().sum::<usize>()
                } else {
                    holdout_train_size(n, ratio)
                };
                if n_train == 0 || n_train == n {
                    return Err(TuneError::InvalidConfig(format!(
                        "holdout ratio {ratio} on {n} rows leaves an empty side"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Draws concrete splits for `task`.
    ///
    /// The same `seed` always produces the same instance.
    ///
    /// # Errors
    ///
    /// See [`Resampling::validate`].
    pub fn instantiate(&self, task: &Task, seed: u64) -> Result<ResampleInstance> {
        self.validate(task)?;
        let n = task.n_rows();
        let labels = task.encoded_labels();
        let mut rng = StdRng::seed_from_u64(seed);

        let splits = match *self {
            Self::CV { folds, stratify } => {
                partition(n, labels, folds, stratify, &mut rng, 0)
            }
            Self::RepeatedCV {
                folds,
                reps,
                stratify,
            } => (0..reps)
                .flat_map(|rep| partition(n, labels, folds, stratify, &mut rng, rep))
                .collect(),
            Self::Holdout { ratio, stratify } => {
                vec![holdout_split(n, labels, ratio, stratify, &mut rng)]
            }
        };

        Ok(ResampleInstance { splits, n_rows: n })
    }
}

impl Default for Resampling {
    fn default() -> Self {
        Self::cv(5)
    }
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strat = if self.is_stratified() { " stratified" } else { "" };
        match *self {
            Self::CV { folds, .. } => write!(f, "{folds}-fold CV{strat}"),
            Self::RepeatedCV { folds, reps, .. } => {
                write!(f, "{folds}-fold CV x {reps} reps{strat}")
            }
            Self::Holdout { ratio, .. } => write!(f, "holdout {ratio:.2}{strat}"),
        }
    }
}

fn partition(
    n: usize,
    labels: &[usize],
    folds: usize,
    stratify: bool,
    rng: &mut StdRng,
    rep: usize,
) -> Vec<Split> {
    let seed: u64 = rng.gen();
    let raw = if stratify {
        StratifiedKFold::new(folds)
            .with_random_state(seed)
            .split(labels)
    } else {
        KFold::new(folds).with_random_state(seed).split(n)
    };

    raw.into_iter()
        .enumerate()
        .map(|(fold, (train, test))| Split {
            rep,
            fold,
            train,
            test,
        })
        .collect()
}

fn holdout_train_size(n: usize, ratio: f64) -> usize {
    (n as f64 * ratio).round() as usize
}

/// Training rows taken from each class by a stratified holdout.
fn stratified_cut(labels: &[usize], ratio: f64) -> Vec<usize> {
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut totals = vec![0usize; n_classes];
    for &label in labels {
        totals[label] += 1;
    }
    totals
        .into_iter()
        .map(|total| holdout_train_size(total, ratio).min(total))
        .collect()
}

fn holdout_split(
    n: usize,
    labels: &[usize],
    ratio: f64,
    stratify: bool,
    rng: &mut StdRng,
) -> Split {
    let (mut train, mut test) = (Vec::new(), Vec::new());

    if stratify {
        let cuts = stratified_cut(labels, ratio);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); cuts.len()];
        for (i, &label) in labels.iter().enumerate() {
            by_class[label].push(i);
        }
        for (mut group, cut) in by_class.into_iter().zip(cuts) {
            group.shuffle(rng);
            train.extend_from_slice(&group[..cut]);
            test.extend_from_slice(&group[cut..]);
        }
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let cut = holdout_train_size(n, ratio);
        train.extend_from_slice(&indices[..cut]);
        test.extend_from_slice(&indices[cut..]);
    }

    Split {
        rep: 0,
        fold: 0,
        train,
        test,
    }
}

/// One train/test partition of a task's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Repetition this split belongs to (0 unless repeated CV)
    pub rep: usize,
    /// Fold index within the repetition
    pub fold: usize,
    /// Training row indices
    pub train: Vec<usize>,
    /// Test row indices
    pub test: Vec<usize>,
}

/// Concrete splits drawn from a [`Resampling`] for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleInstance {
    splits: Vec<Split>,
    n_rows: usize,
}

impl ResampleInstance {
    /// All splits, repetition-major.
    #[must_use]
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Number of splits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    /// True if there are no splits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Number of rows of the task the instance was drawn for.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Splits of a single repetition.
    pub fn repetition(&self, rep: usize) -> impl Iterator<Item = &Split> {
        self.splits.iter().filter(move |s| s.rep == rep)
    }

    /// Number of repetitions.
    #[must_use]
    pub fn n_repetitions(&self) -> usize {
        self.splits.iter().map(|s| s.rep + 1).max().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "model_selection_tests.rs"]
mod tests;
