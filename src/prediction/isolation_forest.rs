//! Isolation forest outlier model.
//!
//! Small, deterministic implementation used by the anomaly detector once it
//! has enough history. Trees isolate points by recursive random splits;
//! anomalous points have short average path lengths. Scores follow the
//! standard formulation `s = 2^(-E[h(x)] / c(n))` in (0, 1), higher = more
//! anomalous. The decision threshold is placed at the contamination quantile
//! of the training scores, so roughly that fraction of the training set
//! lands on the anomalous side.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of trees in the ensemble.
const TREE_COUNT: usize = 100;

/// Maximum subsample size per tree.
const SUBSAMPLE_SIZE: usize = 256;

/// Feature dimensionality (the five sensor channels).
pub const FEATURE_DIM: usize = 5;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted isolation forest over standardized feature vectors.
pub struct IsolationForest {
    trees: Vec<Node>,
    /// Average path length normalizer for the subsample size.
    c_norm: f64,
    /// Score above which a point is classified anomalous.
    threshold: f64,
}

impl IsolationForest {
    /// Fit the forest on standardized training data.
    ///
    /// `contamination` is the expected anomaly fraction and places the
    /// decision threshold. `seed` makes the fit fully deterministic.
    pub fn fit(data: &[[f64; FEATURE_DIM]], contamination: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let psi = data.len().min(SUBSAMPLE_SIZE).max(2);
        let max_depth = (psi as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(TREE_COUNT);
        for _ in 0..TREE_COUNT {
            let sample = sample_without_replacement(data, psi, &mut rng);
            trees.push(build_tree(&sample, 0, max_depth, &mut rng));
        }

        let mut forest = Self {
            trees,
            c_norm: average_path_length(psi),
            threshold: 0.5,
        };

        // Threshold at the (1 - contamination) quantile of training scores.
        let mut scores: Vec<f64> = data.iter().map(|x| forest.score(x)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((scores.len() as f64) * (1.0 - contamination)).floor() as usize;
        forest.threshold = scores
            .get(idx.min(scores.len().saturating_sub(1)))
            .copied()
            .unwrap_or(0.5);

        forest
    }

    /// Anomaly score in (0, 1); higher = more anomalous.
    pub fn score(&self, point: &[f64; FEATURE_DIM]) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        2f64.powf(-mean_path / self.c_norm)
    }

    /// Whether the point scores above the fitted contamination threshold.
    pub fn is_anomalous(&self, point: &[f64; FEATURE_DIM]) -> bool {
        self.score(point) > self.threshold
    }

    /// The fitted decision threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn sample_without_replacement(
    data: &[[f64; FEATURE_DIM]],
    count: usize,
    rng: &mut StdRng,
) -> Vec<[f64; FEATURE_DIM]> {
    if data.len() <= count {
        return data.to_vec();
    }
    // Partial Fisher-Yates over an index vector.
    let mut indices: Vec<usize> = (0..data.len()).collect();
    for i in 0..count {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }
    indices[..count].iter().map(|&i| data[i]).collect()
}

fn build_tree(
    data: &[[f64; FEATURE_DIM]],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if data.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: data.len() };
    }

    let feature = rng.gen_range(0..FEATURE_DIM);
    let (min, max) = data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x[feature]), hi.max(x[feature]))
    });
    if max <= min {
        // All points identical on this feature; cannot split further.
        return Node::Leaf { size: data.len() };
    }

    let value = rng.gen_range(min..max);
    let (left, right): (Vec<_>, Vec<_>) = data.iter().partition(|x| x[feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(build_tree(&left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, point: &[f64; FEATURE_DIM], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if point[*feature] < *value {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points:
/// `c(n) = 2 H(n-1) - 2 (n-1)/n`, with the harmonic number approximated by
/// `ln(n) + γ`.
fn average_path_length(n: usize) -> f64 {
    const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
