//! Search spaces and candidate generation.
//!
//! Implements exhaustive grid search and random search [1] over typed
//! hyperparameter domains.
//!
//! # References
//!
//! [1] Bergstra & Bengio (2012). Random Search for Hyper-Parameter Optimization. JMLR.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::automl::params::Param;
use crate::error::{Result, TuneError};

/// Default number of grid points for continuous domains.
pub const DEFAULT_RESOLUTION: usize = 10;

/// Largest grid a search will enumerate.
pub const MAX_GRID_SIZE: usize = 1_000_000;

/// Admissible values of one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    /// Every integer in `[low, high]`.
    Integer { low: i64, high: i64 },
    /// Real interval `[low, high]`, optionally explored on a log scale.
    Continuous {
        low: f64,
        high: f64,
        log_scale: bool,
    },
    /// Explicit list of values.
    Discrete { values: Vec<ParamValue> },
}

impl Domain {
    /// Create integer domain.
    #[must_use]
    pub fn integer(low: i64, high: i64) -> Self {
        Self::Integer { low, high }
    }

    /// Create continuous domain.
    #[must_use]
    pub fn continuous(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: false,
        }
    }

    /// Create continuous domain with log scale.
    #[must_use]
    pub fn continuous_log(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: true,
        }
    }

    /// Create discrete domain from choices.
    #[must_use]
    pub fn discrete<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self::Discrete {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Both boolean values.
    #[must_use]
    pub fn boolean() -> Self {
        Self::discrete([false, true])
    }

    fn validate(&self, param: Param) -> Result<()> {
        let invalid = |reason: String| TuneError::InvalidDomain {
            param: param.name().to_string(),
            reason,
        };

        match self {
            Self::Integer { low, high } => {
                if low > high {
                    return Err(invalid(format!(
                        "lower bound {low} exceeds upper bound {high}"
                    )));
                }
            }
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(invalid("bounds must be finite".to_string()));
                }
                if low > high {
                    return Err(invalid(format!(
                        "lower bound {low} exceeds upper bound {high}"
                    )));
                }
                if *log_scale && *low <= 0.0 {
                    return Err(invalid(format!(
                        "log scale requires a positive lower bound, got {low}"
                    )));
                }
            }
            Self::Discrete { values } => {
                if values.is_empty() {
                    return Err(invalid("no values".to_string()));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(invalid("values must be finite".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Sample a random value from this domain.
    ///
    /// Integers are uniform over `[low, high]`, continuous values uniform
    /// (or log-uniform) and discrete values a uniform choice.
    pub fn sample(&self, rng: &mut StdRng) -> ParamValue {
        match self {
            Self::Integer { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                if low >= high {
                    return ParamValue::Float(*low);
                }
                let value = if *log_scale {
                    rng.gen_range(low.ln()..high.ln()).exp().clamp(*low, *high)
                } else {
                    rng.gen_range(*low..*high)
                };
                ParamValue::Float(value)
            }
            Self::Discrete { values } => values
                .choose(rng)
                .cloned()
                .unwrap_or(ParamValue::Int(0)),
        }
    }

    /// Generate grid points for this domain.
    ///
    /// Integer and discrete domains enumerate every value; continuous
    /// domains get `resolution` evenly spaced points (log-spaced when
    /// `log_scale`).
    #[must_use]
    pub fn grid_points(&self, resolution: usize) -> Vec<ParamValue> {
        match self {
            Self::Integer { low, high } => (*low..=*high).map(ParamValue::Int).collect(),
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                if resolution == 0 {
                    return Vec::new();
                }
                if resolution == 1 || low >= high {
                    return vec![ParamValue::Float(*low)];
                }
                (0..resolution)
                    .map(|i| {
                        let t = i as f64 / (resolution - 1) as f64;
                        let value = if *log_scale {
                            let log_low = low.ln();
                            let log_high = high.ln();
                            (log_low + t * (log_high - log_low)).exp().clamp(*low, *high)
                        } else {
                            low + t * (high - low)
                        };
                        ParamValue::Float(value)
                    })
                    .collect()
            }
            Self::Discrete { values } => values.clone(),
        }
    }
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Get as f64 if numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) => None,
        }
    }

    /// Get as i64 if integral.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::Int(_) | Self::Bool(_) => true,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:.6}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// One tunable parameter and its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpec {
    /// Parameter key
    pub param: Param,
    /// Admissible values
    pub domain: Domain,
}

impl HyperparameterSpec {
    /// Pairs a parameter with its domain.
    #[must_use]
    pub fn new(param: Param, domain: Domain) -> Self {
        Self { param, domain }
    }
}

/// Validated, ordered set of hyperparameter domains.
///
/// Declaration order is kept: in a grid the first parameter varies slowest.
///
/// # Example
///
/// ```
/// use aprender_tune::automl::params::Param;
/// use aprender_tune::automl::{Domain, HyperparameterSpec, SearchSpace};
///
/// let space = SearchSpace::new(vec![
///     HyperparameterSpec::new(Param::K, Domain::integer(1, 12)),
///     HyperparameterSpec::new(Param::DistanceWeighted, Domain::boolean()),
/// ])
/// .expect("valid domains");
///
/// assert_eq!(space.len(), 2);
/// assert_eq!(space.grid(10).len(), 24);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    specs: Vec<HyperparameterSpec>,
}

impl SearchSpace {
    /// Validates and collects hyperparameter domains.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::InvalidDomain`] if a domain is empty, has
    /// inverted or non-finite bounds, is log-scaled with a non-positive lower
    /// bound, or if a parameter appears twice.
    pub fn new(specs: Vec<HyperparameterSpec>) -> Result<Self> {
        for (i, spec) in specs.iter().enumerate() {
            spec.domain.validate(spec.param)?;
            if specs[..i].iter().any(|s| s.param == spec.param) {
                return Err(TuneError::InvalidDomain {
                    param: spec.param.name().to_string(),
                    reason: "declared more than once".to_string(),
                });
            }
        }
        Ok(Self { specs })
    }

    /// Space with no tunable parameters.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Get domain by key.
    #[must_use]
    pub fn get(&self, param: Param) -> Option<&Domain> {
        self.specs
            .iter()
            .find(|s| s.param == param)
            .map(|s| &s.domain)
    }

    /// Iterate over specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &HyperparameterSpec> {
        self.specs.iter()
    }

    /// Number of grid candidates without materialising them.
    #[must_use]
    pub fn grid_size(&self, resolution: usize) -> usize {
        self.specs
            .iter()
            .map(|s| match &s.domain {
                Domain::Integer { low, high } => {
                    usize::try_from(i128::from(*high) - i128::from(*low) + 1).unwrap_or(usize::MAX)
                }
                Domain::Continuous { low, high, .. } if low >= high => resolution.min(1),
                Domain::Continuous { .. } => resolution,
                Domain::Discrete { values } => values.len(),
            })
            .fold(1, usize::saturating_mul)
    }

    /// Sample a random assignment.
    pub fn sample(&self, rng: &mut StdRng) -> Assignment {
        let mut assignment = Assignment::new();
        for spec in &self.specs {
            assignment.insert(spec.param, spec.domain.sample(rng));
        }
        assignment
    }

    /// Generate all grid assignments.
    #[must_use]
    pub fn grid(&self, resolution: usize) -> Vec<Assignment> {
        // Cartesian product; later parameters vary fastest
        let mut configs = vec![Assignment::new()];

        for spec in &self.specs {
            let values = spec.domain.grid_points(resolution);
            let mut next = Vec::with_capacity(configs.len() * values.len());
            for config in &configs {
                for value in &values {
                    let mut extended = config.clone();
                    extended.insert(spec.param, value.clone());
                    next.push(extended);
                }
            }
            configs = next;
        }

        configs
    }
}

/// A hyperparameter configuration to evaluate.
///
/// Rendered as `{k=5, distance_weighted=true}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Parameter values, keyed in declaration order of [`Param`].
    pub values: BTreeMap<Param, ParamValue>,
}

impl Assignment {
    /// Empty assignment (every parameter at its default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, param: Param, value: impl Into<ParamValue>) -> Self {
        self.values.insert(param, value.into());
        self
    }

    /// Set a parameter value.
    pub fn insert(&mut self, param: Param, value: ParamValue) {
        self.values.insert(param, value);
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, param: Param) -> Option<&ParamValue> {
        self.values.get(&param)
    }

    /// Get parameter as f64.
    #[must_use]
    pub fn get_f64(&self, param: Param) -> Option<f64> {
        self.values.get(&param).and_then(ParamValue::as_f64)
    }

    /// Get parameter as i64.
    #[must_use]
    pub fn get_i64(&self, param: Param) -> Option<i64> {
        self.values.get(&param).and_then(ParamValue::as_i64)
    }

    /// Get parameter as bool.
    #[must_use]
    pub fn get_bool(&self, param: Param) -> Option<bool> {
        self.values.get(&param).and_then(ParamValue::as_bool)
    }

    /// Parameters set in this assignment.
    pub fn params(&self) -> impl Iterator<Item = Param> + '_ {
        self.values.keys().copied()
    }

    /// Number of parameters set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k.name(), v))
            .collect();
        write!(f, "{{{}}}", params.join(", "))
    }
}

/// How candidate assignments are enumerated.
///
/// # Example
///
/// ```
/// use aprender_tune::automl::params::Param;
/// use aprender_tune::automl::{Domain, HyperparameterSpec, SearchSpace, SearchStrategy};
///
/// let space = SearchSpace::new(vec![
///     HyperparameterSpec::new(Param::Shrinkage, Domain::continuous_log(0.001, 0.3)),
/// ])
/// .expect("valid domain");
///
/// let candidates = SearchStrategy::random(25).candidates(&space, 42).expect("candidates");
/// assert_eq!(candidates.len(), 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Exhaustive Cartesian product of per-parameter grid points.
    Grid {
        /// Points per continuous parameter
        resolution: usize,
    },
    /// Independent random samples from the space.
    Random {
        /// Number of candidates
        n_iter: usize,
    },
}

impl SearchStrategy {
    /// Grid search with the default continuous resolution.
    #[must_use]
    pub fn grid() -> Self {
        Self::Grid {
            resolution: DEFAULT_RESOLUTION,
        }
    }

    /// Grid search with `resolution` points per continuous parameter.
    #[must_use]
    pub fn grid_with_resolution(resolution: usize) -> Self {
        Self::Grid { resolution }
    }

    /// Random search with an iteration budget.
    #[must_use]
    pub fn random(n_iter: usize) -> Self {
        Self::Random { n_iter }
    }

    /// Enumerates candidate assignments.
    ///
    /// Random candidates are drawn from a generator seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`TuneError::EmptySearchSpace`] if no candidate is produced,
    /// or [`TuneError::InvalidConfig`] if a grid exceeds [`MAX_GRID_SIZE`].
    pub fn candidates(&self, space: &SearchSpace, seed: u64) -> Result<Vec<Assignment>> {
        let candidates = match *self {
            Self::Grid { resolution } => {
                let size = space.grid_size(resolution);
                if size > MAX_GRID_SIZE {
                    return Err(TuneError::InvalidConfig(format!(
                        "grid of {size} candidates exceeds the limit of {MAX_GRID_SIZE}"
                    )));
                }
                space.grid(resolution)
            }
            Self::Random { n_iter } => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..n_iter).map(|_| space.sample(&mut rng)).collect()
            }
        };

        if candidates.is_empty() {
            return Err(TuneError::EmptySearchSpace);
        }
        Ok(candidates)
    }
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self::grid()
    }
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grid { resolution } => write!(f, "grid(resolution={resolution})"),
            Self::Random { n_iter } => write!(f, "random(n_iter={n_iter})"),
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
