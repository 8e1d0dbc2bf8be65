//! Random forest classifier
//!
//! CART trees grown on Gini impurity, with per-tree bootstrap sampling and
//! per-split feature subsampling. Leaves keep the class distribution of the
//! samples that reached them; the forest averages those distributions.

use crate::error::{AppError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of candidate features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    /// Resolve against the number of input features (always at least one)
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Log2 => write!(f, "log2"),
            MaxFeatures::All => write!(f, "all"),
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum tree depth (`None` = grow until pure or too small)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples required in each leaf
    pub min_samples_leaf: usize,

    /// Feature subsampling strategy per split
    pub max_features: MaxFeatures,

    /// Draw a bootstrap sample for each tree
    pub bootstrap: bool,

    /// Seed for bootstrap and feature sampling
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(AppError::Training("n_estimators must be positive".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(AppError::Training(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(AppError::Training(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(AppError::Training("max_depth must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}, min_samples_leaf={}, max_features={}, bootstrap={}",
            self.n_estimators,
            depth,
            self.min_samples_split,
            self.min_samples_leaf,
            self.max_features,
            self.bootstrap
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

/// Growth settings shared by every node of one tree
struct GrowContext<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// A single CART classification tree stored as a node arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: usize,
}

impl DecisionTree {
    fn fit(ctx: &GrowContext<'_>, indices: Vec<usize>, rng: &mut StdRng) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_classes: ctx.n_classes,
        };
        tree.grow(ctx, indices, 0, rng);
        tree
    }

    fn grow(
        &mut self,
        ctx: &GrowContext<'_>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let counts = class_counts(ctx.y, &indices, ctx.n_classes);
        let n = indices.len();
        let parent_impurity = gini(&counts, n);

        let depth_exhausted = ctx.max_depth.map_or(false, |max| depth >= max);
        if depth_exhausted || n < ctx.min_samples_split || parent_impurity <= 0.0 {
            return self.push_leaf(&counts, n);
        }

        let split = match best_split(ctx, &indices, rng) {
            Some(split) if split.impurity < parent_impurity - f64::EPSILON => split,
            _ => return self.push_leaf(&counts, n),
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| ctx.x[[i, split.feature]] <= split.threshold);

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow(ctx, left_indices, depth + 1, rng);
        let right = self.grow(ctx, right_indices, depth + 1, rng);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn push_leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let total = n.max(1) as f64;
        self.nodes.push(Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
        });
        self.nodes.len() - 1
    }

    /// Class distribution of the leaf reached by `row`
    fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut node_id = 0;
        loop {
            match &self.nodes[node_id] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node_id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                Node::Leaf { .. } => 0,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check the arena is a well-formed tree: children come after their
    /// parent and inside the arena, split features exist, and every leaf
    /// holds exactly `n_classes` probabilities.
    fn check_structure(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(AppError::ModelLoad("tree has no nodes".to_string()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features || threshold.is_nan() {
                        return Err(AppError::ModelLoad(format!(
                            "node {} splits on invalid feature {} at {}",
                            id, feature, threshold
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(AppError::ModelLoad(format!(
                                "node {} has invalid child {} ({} nodes)",
                                id,
                                child,
                                self.nodes.len()
                            )));
                        }
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != self.n_classes {
                        return Err(AppError::ModelLoad(format!(
                            "leaf {} has {} probabilities, expected {}",
                            id,
                            distribution.len(),
                            self.n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let total = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn best_split(ctx: &GrowContext<'_>, indices: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
    let n = indices.len();
    let n_features = ctx.x.ncols();
    let candidates = rand::seq::index::sample(rng, n_features, ctx.max_features);

    let mut best: Option<BestSplit> = None;
    let mut sorted = indices.to_vec();

    for feature in candidates.iter() {
        sorted.sort_by(|&a, &b| ctx.x[[a, feature]].total_cmp(&ctx.x[[b, feature]]));

        let mut left_counts = vec![0usize; ctx.n_classes];
        let mut right_counts = class_counts(ctx.y, &sorted, ctx.n_classes);

        for pos in 1..n {
            let moved = sorted[pos - 1];
            left_counts[ctx.y[moved]] += 1;
            right_counts[ctx.y[moved]] -= 1;

            let lo = ctx.x[[moved, feature]];
            let hi = ctx.x[[sorted[pos], feature]];
            if lo >= hi {
                continue;
            }
            if pos < ctx.min_samples_leaf || n - pos < ctx.min_samples_leaf {
                continue;
            }

            let impurity = (pos as f64 * gini(&left_counts, pos)
                + (n - pos) as f64 * gini(&right_counts, n - pos))
                / n as f64;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = lo + (hi - lo) / 2.0;
                // midpoint can round up to `hi` for adjacent floats
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

/// Bagged ensemble of [`DecisionTree`]s
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Fit a forest on `x` (rows × features) with class labels `y` in `0..n_classes`
    pub fn fit<'a>(
        x: ArrayView2<'a, f64>,
        y: &'a [usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self> {
        params.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(AppError::Training("cannot fit on an empty dataset".to_string()));
        }
        if n_samples != y.len() {
            return Err(AppError::Training(format!(
                "feature rows ({}) and labels ({}) differ",
                n_samples,
                y.len()
            )));
        }
        if let Some(bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(AppError::Training(format!(
                "label {} outside 0..{}",
                bad, n_classes
            )));
        }

        let ctx = GrowContext {
            x,
            y,
            n_classes,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.resolve(x.ncols()),
        };

        // Per-tree seeds are drawn up front so parallel growth stays reproducible
        let mut seeder = StdRng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.n_estimators).map(|_| seeder.gen()).collect();

        let trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                DecisionTree::fit(&ctx, indices, &mut rng)
            })
            .collect();

        Ok(Self {
            params: params.clone(),
            trees,
            n_features: x.ncols(),
            n_classes,
        })
    }

    /// Mean leaf class distribution over all trees (rows × classes)
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (row_idx, row) in x.outer_iter().enumerate() {
            for tree in &self.trees {
                for (class, p) in tree.leaf_distribution(row).iter().enumerate() {
                    proba[[row_idx, class]] += p;
                }
            }
        }
        proba /= self.trees.len().max(1) as f64;
        Ok(proba)
    }

    /// Most probable class per row
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.outer_iter().map(|row| argmax(row)).collect())
    }

    fn check_width(&self, n_cols: usize) -> Result<()> {
        if n_cols != self.n_features {
            return Err(AppError::Inference(format!(
                "feature length mismatch: got {}, expected {}",
                n_cols, self.n_features
            )));
        }
        Ok(())
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Reject a deserialized forest that prediction could not walk safely
    pub fn check_structure(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(AppError::ModelLoad("forest has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_classes != self.n_classes {
                return Err(AppError::ModelLoad(format!(
                    "tree {} has {} classes, forest has {}",
                    i, tree.n_classes, self.n_classes
                )));
            }
            tree.check_structure(self.n_features)?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl RandomForest {
    /// One-tree forest built from raw nodes
    fn from_nodes(nodes: Vec<Node>, n_features: usize, n_classes: usize) -> Self {
        Self {
            params: ForestParams::default(),
            trees: vec![DecisionTree { nodes, n_classes }],
            n_features,
            n_classes,
        }
    }

    /// Forest whose only split points past the end of its node arena
    pub(crate) fn dangling(n_features: usize, n_classes: usize) -> Self {
        Self::from_nodes(
            vec![Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 7,
                right: 7,
            }],
            n_features,
            n_classes,
        )
    }
}

/// Index of the largest value; ties go to the lowest index
pub fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}
