//! Typed hyperparameter keys.
//!
//! Each learner declares the subset of [`Param`] it accepts; see
//! [`Learner::params`](crate::learner::Learner::params).

use serde::{Deserialize, Serialize};

/// Hyperparameter key.
///
/// # Example
///
/// ```
/// use aprender_tune::automl::params::Param;
///
/// assert_eq!(Param::K.name(), "k");
/// assert_eq!(Param::NTree.to_string(), "ntree");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Param {
    /// kNN: number of neighbours.
    K,
    /// kNN: Minkowski distance exponent (2 = Euclidean).
    DistancePower,
    /// kNN: inverse-distance weighting of neighbour votes.
    DistanceWeighted,
    /// Random forest: number of trees.
    NTree,
    /// Random forest: features tried per split.
    Mtry,
    /// Random forest: minimum rows in a leaf.
    NodeSize,
    /// Random forest: maximum tree depth.
    MaxDepth,
    /// Gradient boosting: number of boosting rounds.
    NTrees,
    /// Gradient boosting: depth of each tree.
    InteractionDepth,
    /// Gradient boosting: learning rate.
    Shrinkage,
    /// Gradient boosting: minimum rows in a leaf.
    MinObsInNode,
    /// Gradient boosting: row subsample fraction per round.
    BagFraction,
    /// QDA: covariance shrinkage toward a scaled identity.
    RegParam,
}

impl Param {
    /// Name used in logs and rendered assignments.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::K => "k",
            Self::DistancePower => "distance_power",
            Self::DistanceWeighted => "distance_weighted",
            Self::NTree => "ntree",
            Self::Mtry => "mtry",
            Self::NodeSize => "nodesize",
            Self::MaxDepth => "max_depth",
            Self::NTrees => "n_trees",
            Self::InteractionDepth => "interaction_depth",
            Self::Shrinkage => "shrinkage",
            Self::MinObsInNode => "n_minobsinnode",
            Self::BagFraction => "bag_fraction",
            Self::RegParam => "reg_param",
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
