//! CART decision trees shared by the forest and boosting backends.
//!
//! Splits minimise the summed squared error (regression targets) or the
//! weighted Gini impurity (class targets). Nodes live in a flat arena;
//! index 0 is the root.

use rand::rngs::StdRng;

use crate::primitives::Matrix;
use crate::traits::Target;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeConfig {
    /// Maximum depth (None = grow until pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum rows in each leaf
    pub min_leaf: usize,
    /// Features tried per split (None = all)
    pub mtry: Option<usize>,
}

/// Prediction stored in a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Leaf {
    Value(f32),
    Class(usize),
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf(Leaf),
}

/// A fitted CART tree.
#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grows a tree on `rows` (duplicates allowed, as in a bootstrap sample).
    pub(crate) fn fit(
        x: &Matrix<f32>,
        target: Target<'_>,
        rows: &[usize],
        config: TreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = Builder {
            x,
            target,
            config,
            nodes: Vec::new(),
        };
        let mut rows = rows.to_vec();
        builder.build(&mut rows, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Arena index of the leaf `row` falls into.
    pub(crate) fn leaf_index(&self, row: &[f32]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(_) => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub(crate) fn predict_leaf(&self, row: &[f32]) -> Leaf {
        match &self.nodes[self.leaf_index(row)] {
            Node::Leaf(leaf) => *leaf,
            Node::Split { .. } => Leaf::Value(0.0),
        }
    }

    /// Regression output (class leaves read as their index).
    pub(crate) fn predict_value(&self, row: &[f32]) -> f32 {
        match self.predict_leaf(row) {
            Leaf::Value(v) => v,
            Leaf::Class(c) => c as f32,
        }
    }

    /// Class output (value leaves read as class 0).
    pub(crate) fn predict_class(&self, row: &[f32]) -> usize {
        match self.predict_leaf(row) {
            Leaf::Class(c) => c,
            Leaf::Value(_) => 0,
        }
    }

    /// Overwrites the value of a leaf.
    pub(crate) fn set_leaf_value(&mut self, leaf: usize, value: f32) {
        if let Some(node @ Node::Leaf(_)) = self.nodes.get_mut(leaf) {
            *node = Node::Leaf(Leaf::Value(value));
        }
    }

    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }

    /// Depth of the tree (a lone leaf has depth 0).
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Builder<'a> {
    x: &'a Matrix<f32>,
    target: Target<'a>,
    config: TreeConfig,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    score: f64,
}

impl Builder<'_> {
    fn build(&mut self, rows: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let idx = self.nodes.len();
        let leaf = self.make_leaf(rows);
        self.nodes.push(Node::Leaf(leaf));

        let min_leaf = self.config.min_leaf.max(1);
        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || rows.len() < 2 * min_leaf || self.is_pure(rows) {
            return idx;
        }

        let Some(best) = self.best_split(rows, min_leaf, rng) else {
            return idx;
        };

        let x = self.x;
        let mid = partition_in_place(rows, |r| x.get(r, best.feature) <= best.threshold);
        if mid == 0 || mid == rows.len() {
            return idx;
        }

        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.build(left_rows, depth + 1, rng);
        let right = self.build(right_rows, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn make_leaf(&self, rows: &[usize]) -> Leaf {
        match self.target {
            Target::Values(y) => {
                let sum: f64 = rows.iter().map(|&r| f64::from(y[r])).sum();
                Leaf::Value((sum / rows.len().max(1) as f64) as f32)
            }
            Target::Classes { labels, n_classes } => {
                let counts = class_counts(labels, n_classes, rows);
                Leaf::Class(argmax_first(&counts))
            }
        }
    }

    fn is_pure(&self, rows: &[usize]) -> bool {
        match self.target {
            Target::Values(y) => {
                let first = y[rows[0]];
                rows.iter().all(|&r| y[r] == first)
            }
            Target::Classes { labels, .. } => {
                let first = labels[rows[0]];
                rows.iter().all(|&r| labels[r] == first)
            }
        }
    }

    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let p = self.x.n_cols();
        match self.config.mtry {
            Some(m) if m < p => {
                let mut features = rand::seq::index::sample(rng, p, m.max(1)).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..p).collect(),
        }
    }

    fn best_split(&self, rows: &[usize], min_leaf: usize, rng: &mut StdRng) -> Option<BestSplit> {
        let parent = self.impurity(rows);
        let mut best: Option<BestSplit> = None;

        for feature in self.candidate_features(rng) {
            let mut order: Vec<(f32, usize)> =
                rows.iter().map(|&r| (self.x.get(r, feature), r)).collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            if let Some((threshold, score)) = self.sweep(&order, min_leaf) {
                let improves = score < parent - 1e-9;
                let better = best.as_ref().map_or(true, |b| score < b.score);
                if improves && better {
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        best
    }

    /// Impurity of a node, in the same units as [`Builder::sweep`] scores.
    fn impurity(&self, rows: &[usize]) -> f64 {
        match self.target {
            Target::Values(y) => {
                let (sum, sq) = rows.iter().fold((0.0_f64, 0.0_f64), |(s, q), &r| {
                    let v = f64::from(y[r]);
                    (s + v, q + v * v)
                });
                sq - sum * sum / rows.len() as f64
            }
            Target::Classes { labels, n_classes } => {
                let counts = class_counts(labels, n_classes, rows);
                weighted_gini(&counts, rows.len())
            }
        }
    }

    /// Best threshold on one sorted feature: `(threshold, score)`.
    fn sweep(&self, order: &[(f32, usize)], min_leaf: usize) -> Option<(f32, f64)> {
        let n = order.len();
        let mut best: Option<(f32, f64)> = None;

        match self.target {
            Target::Values(y) => {
                let (total, total_sq) = order.iter().fold((0.0_f64, 0.0_f64), |(s, q), &(_, r)| {
                    let v = f64::from(y[r]);
                    (s + v, q + v * v)
                });
                let (mut left, mut left_sq) = (0.0_f64, 0.0_f64);
                for i in 0..n - 1 {
                    let v = f64::from(y[order[i].1]);
                    left += v;
                    left_sq += v * v;
                    let (nl, nr) = (i + 1, n - i - 1);
                    if nl < min_leaf || nr < min_leaf || order[i].0 == order[i + 1].0 {
                        continue;
                    }
                    let right = total - left;
                    let right_sq = total_sq - left_sq;
                    let score = (left_sq - left * left / nl as f64)
                        + (right_sq - right * right / nr as f64);
                    if best.map_or(true, |(_, s)| score < s) {
                        best = Some((midpoint(order[i].0, order[i + 1].0), score));
                    }
                }
            }
            Target::Classes { labels, n_classes } => {
                let mut right_counts = vec![0usize; n_classes];
                for &(_, r) in order {
                    right_counts[labels[r]] += 1;
                }
                let mut left_counts = vec![0usize; n_classes];
                for i in 0..n - 1 {
                    let c = labels[order[i].1];
                    left_counts[c] += 1;
                    right_counts[c] -= 1;
                    let (nl, nr) = (i + 1, n - i - 1);
                    if nl < min_leaf || nr < min_leaf || order[i].0 == order[i + 1].0 {
                        continue;
                    }
                    let score = weighted_gini(&left_counts, nl) + weighted_gini(&right_counts, nr);
                    if best.map_or(true, |(_, s)| score < s) {
                        best = Some((midpoint(order[i].0, order[i + 1].0), score));
                    }
                }
            }
        }

        best
    }
}

/// `n * gini(counts)`, so child scores add up.
fn weighted_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n as f64 - sum_sq / n as f64
}

fn midpoint(a: f32, b: f32) -> f32 {
    let mid = a + (b - a) / 2.0;
    if mid < b {
        mid
    } else {
        a
    }
}

pub(crate) fn class_counts(labels: &[usize], n_classes: usize, rows: &[usize]) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &r in rows {
        counts[labels[r]] += 1;
    }
    counts
}

/// Index of the largest element; ties go to the lowest index.
pub(crate) fn argmax_first<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn partition_in_place(rows: &mut [usize], mut goes_left: impl FnMut(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..rows.len() {
        if goes_left(rows[j]) {
            rows.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
