use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rsf_series::{MultivariateTimeSeries, Pattern, SeriesError};
use tracing::{debug, instrument};

use crate::{
    ForestError,
    class_set::ClassSet,
    error::Stage,
    factory::PatternFactory,
    node::{Impurity, Node, NodeIndex, argmax},
    split::{SearchContext, SplitCriterion, find_best_split},
};

/// How leaf distributions are estimated from class counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LeafSmoothing {
    /// Relative frequencies `c / n`.
    None,
    /// Laplace estimate `(c + 1) / (n + K)` over all `K` classes.
    Laplace,
}

/// Configuration for a single pattern tree.
///
/// Construct via [`PatternTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default             |
/// |---------------------|---------------------|
/// | `criterion`         | `Gini`              |
/// | `pattern_count`     | 100                 |
/// | `lower_length`      | 0.025               |
/// | `upper_length`      | 1.0                 |
/// | `max_depth`         | `None` (unlimited)  |
/// | `min_samples_split` | 2                   |
/// | `smoothing`         | `None`              |
/// | `seed`              | 42                  |
#[derive(Debug, Clone)]
pub struct PatternTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) pattern_count: usize,
    pub(crate) lower_length: f64,
    pub(crate) upper_length: f64,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) smoothing: LeafSmoothing,
    pub(crate) seed: u64,
}

impl PatternTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            pattern_count: 100,
            lower_length: 0.025,
            upper_length: 1.0,
            max_depth: None,
            min_samples_split: 2,
            smoothing: LeafSmoothing::None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the number of candidate patterns drawn per node.
    #[must_use]
    pub fn with_pattern_count(mut self, pattern_count: usize) -> Self {
        self.pattern_count = pattern_count;
        self
    }

    /// Set the shapelet length bounds as fractions of the series length.
    #[must_use]
    pub fn with_length_fractions(mut self, lower: f64, upper: f64) -> Self {
        self.lower_length = lower;
        self.upper_length = upper;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the leaf distribution estimate.
    #[must_use]
    pub fn with_smoothing(mut self, smoothing: LeafSmoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the number of candidate patterns per node.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check every setting and build the pattern factory.
    pub(crate) fn validate(&self) -> Result<PatternFactory, ForestError> {
        if self.pattern_count == 0 {
            return Err(ForestError::InvalidPatternCount { pattern_count: 0 });
        }
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        PatternFactory::new(self.lower_length, self.upper_length)
    }

    /// Train a pattern tree on every example.
    ///
    /// `labels[i]` is the zero-based class of `examples[i]`.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                         |
    /// |--------------------------------------|----------------------------------------------|
    /// | [`ForestError::EmptyDataset`]        | `examples` is empty                          |
    /// | [`ForestError::LabelCountMismatch`]  | `examples.len() != labels.len()`             |
    /// | [`ForestError::InvalidPatternCount`] | `pattern_count` is zero                      |
    /// | [`ForestError::InvalidMaxDepth`]     | `max_depth` is `Some(0)`                     |
    /// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                   |
    /// | [`ForestError::InvalidLengthFraction`] / [`ForestError::LowerExceedsUpper`] | bad length fractions |
    /// | [`ForestError::DataShape`]           | an example lacks a drawn pattern's dimension |
    #[instrument(skip(self, examples, labels), fields(n_examples = examples.len()))]
    pub fn fit(
        &self,
        examples: &[MultivariateTimeSeries],
        labels: &[usize],
    ) -> Result<PatternTree, ForestError> {
        let factory = self.validate()?;
        let n_classes = validate_dataset(examples, labels)?;
        let sample_indices: Vec<usize> = (0..examples.len()).collect();
        self.fit_sample(factory, examples, labels, n_classes, &sample_indices)
    }

    /// Train on `sample_indices` (may repeat) of an already validated dataset.
    pub(crate) fn fit_sample(
        &self,
        factory: PatternFactory,
        examples: &[MultivariateTimeSeries],
        labels: &[usize],
        n_classes: usize,
        sample_indices: &[usize],
    ) -> Result<PatternTree, ForestError> {
        let mut builder = TreeBuilder {
            ctx: SearchContext {
                examples,
                labels,
                n_classes,
                criterion: self.criterion,
                factory,
                pattern_count: self.pattern_count,
            },
            config: self,
            arena: Vec::new(),
        };

        let root = builder.build(sample_indices, 0, self.seed)?;
        debug!(
            root_index = root.index(),
            n_nodes = builder.arena.len(),
            "pattern tree built"
        );

        Ok(PatternTree {
            nodes: builder.arena,
            n_classes,
        })
    }
}

impl Default for PatternTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a dataset and return its class count (`max label + 1`).
pub(crate) fn validate_dataset(
    examples: &[MultivariateTimeSeries],
    labels: &[usize],
) -> Result<usize, ForestError> {
    if examples.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    if examples.len() != labels.len() {
        return Err(ForestError::LabelCountMismatch {
            n_examples: examples.len(),
            n_labels: labels.len(),
        });
    }
    Ok(labels.iter().max().copied().unwrap_or(0) + 1)
}

struct TreeBuilder<'a> {
    ctx: SearchContext<'a>,
    config: &'a PatternTreeConfig,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Recursively grow the subtree for `sample_indices`.
    ///
    /// Each node seeds its own RNG; children get seeds drawn from it, so a
    /// subtree depends only on its seed and its samples.
    fn build(&mut self, sample_indices: &[usize], depth: usize, seed: u64) -> Result<NodeIndex, ForestError> {
        let n_samples = sample_indices.len();
        let class_set = ClassSet::from_indices(sample_indices, self.ctx.labels, self.ctx.n_classes);
        let class_counts = class_set.class_counts();
        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = class_counts.iter().filter(|&&c| c > 0).count() <= 1;

        if too_few || pure || depth_exceeded {
            return Ok(self.push_leaf(&class_counts, impurity, n_samples));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let Some(split) = find_best_split(&self.ctx, sample_indices, &class_set, &mut rng)? else {
            return Ok(self.push_leaf(&class_counts, impurity, n_samples));
        };
        if split.left_indices.is_empty() || split.right_indices.is_empty() {
            return Ok(self.push_leaf(&class_counts, impurity, n_samples));
        }

        let left_seed: u64 = rng.r#gen();
        let right_seed: u64 = rng.r#gen();

        // Arena pattern: reserve index, recurse, then overwrite with the branch.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            distribution: Vec::new(),
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1, left_seed)?;
        let right = self.build(&split.right_indices, depth + 1, right_seed)?;

        self.arena[node_idx] = Node::Branch {
            pattern: split.pattern,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };

        Ok(NodeIndex::new(node_idx))
    }

    fn push_leaf(&mut self, class_counts: &[usize], impurity: Impurity, n_samples: usize) -> NodeIndex {
        let distribution = match self.config.smoothing {
            LeafSmoothing::None => {
                let total = n_samples.max(1) as f64;
                class_counts.iter().map(|&c| c as f64 / total).collect()
            }
            LeafSmoothing::Laplace => {
                let total = (n_samples + class_counts.len()) as f64;
                class_counts.iter().map(|&c| (c + 1) as f64 / total).collect()
            }
        };
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            distribution,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted pattern tree.
///
/// Stored as an arena of [`Node`]s with the root at [`NodeIndex::ROOT`].
#[derive(Debug, Clone)]
pub struct PatternTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_classes: usize,
}

impl PatternTree {
    /// Predict the class ordinal for one example.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] (example index 0) when the example
    /// lacks a dimension used on its path.
    pub fn predict(&self, example: &MultivariateTimeSeries) -> Result<usize, ForestError> {
        Ok(argmax(self.predict_proba(example)?))
    }

    /// Return the class distribution of the leaf `example` reaches.
    ///
    /// The slice has length `n_classes` and sums to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] (example index 0) when the example
    /// lacks a dimension used on its path.
    pub fn predict_proba(&self, example: &MultivariateTimeSeries) -> Result<&[f64], ForestError> {
        self.traverse(example).map_err(|source| ForestError::DataShape {
            stage: Stage::Prediction,
            example_index: 0,
            source,
        })
    }

    /// Return the number of classes the tree was trained with.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of branch nodes.
    #[must_use]
    pub fn n_branches(&self) -> usize {
        self.nodes.len() - self.n_leaves()
    }

    /// Borrow the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeIndex::ROOT.index()]
    }

    /// Borrow a node by index, e.g. a branch's child.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Return the maximum depth of the tree. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((NodeIndex::ROOT, 0usize));

        while let Some((idx, d)) = queue.pop_front() {
            match self.node(idx) {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Branch { left, right, .. } => {
                    queue.push_back((*left, d + 1));
                    queue.push_back((*right, d + 1));
                }
            }
        }

        max_depth
    }

    /// Collect the pattern of every branch, in pre-order from the root.
    #[must_use]
    pub fn branch_patterns(&self) -> Vec<&Pattern> {
        let mut patterns = Vec::new();
        let mut stack = vec![NodeIndex::ROOT];
        while let Some(idx) = stack.pop() {
            if let Node::Branch {
                pattern, left, right, ..
            } = self.node(idx)
            {
                patterns.push(pattern);
                stack.push(*right);
                stack.push(*left);
            }
        }
        patterns
    }

    /// Walk from the root to a leaf and return its distribution.
    fn traverse(&self, example: &MultivariateTimeSeries) -> Result<&[f64], SeriesError> {
        let mut idx = NodeIndex::ROOT;
        loop {
            match self.node(idx) {
                Node::Leaf { distribution, .. } => return Ok(distribution),
                Node::Branch {
                    pattern,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if pattern.distance(example)?.value() <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rsf_series::TimeSeries;

    use super::*;

    /// Noisy sine series; class 0 carries a bump, class 1 a dip, at a random position.
    pub(crate) fn make_events(
        n_per_class: usize,
        len: usize,
        seed: u64,
    ) -> (Vec<MultivariateTimeSeries>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut examples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..2 * n_per_class {
            let class = i % 2;
            let at = rng.gen_range(2..len - 6);
            let values: Vec<f64> = (0..len)
                .map(|t| {
                    let noise = rng.gen_range(-0.1..0.1);
                    let event = if (at..at + 4).contains(&t) {
                        if class == 0 { 2.0 } else { -2.0 }
                    } else {
                        0.0
                    };
                    (t as f64 * 0.2).sin() * 0.3 + event + noise
                })
                .collect();
            examples.push(TimeSeries::new(values).unwrap().into());
            labels.push(class);
        }
        (examples, labels)
    }

    fn univariate(values: &[f64]) -> MultivariateTimeSeries {
        TimeSeries::new(values.to_vec()).unwrap().into()
    }

    fn assert_leaves_sum_to_one(tree: &PatternTree) {
        for node in &tree.nodes {
            if let Node::Leaf { distribution, .. } = node {
                let sum: f64 = distribution.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "leaf sums to {sum}");
            }
        }
    }

    #[test]
    fn empty_dataset_error() {
        let err = PatternTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let examples = vec![univariate(&[1.0, 2.0, 3.0])];
        let err = PatternTreeConfig::new().fit(&examples, &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LabelCountMismatch { n_examples: 1, n_labels: 2 }
        ));
    }

    #[test]
    fn pure_dataset_single_one_hot_leaf() {
        let examples = vec![
            univariate(&[1.0, 2.0, 3.0, 1.0]),
            univariate(&[3.0, 4.0, 1.0, 0.0]),
            univariate(&[5.0, 6.0, 2.0, 2.0]),
        ];
        let tree = PatternTreeConfig::new().fit(&examples, &[1, 1, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        match tree.root() {
            Node::Leaf { distribution, .. } => assert_eq!(distribution, &vec![0.0, 1.0]),
            Node::Branch { .. } => panic!("pure node must be a leaf"),
        }
        assert_eq!(tree.predict(&examples[0]).unwrap(), 1);
    }

    #[test]
    fn separable_events_are_learned() {
        let (examples, labels) = make_events(10, 40, 1);
        let tree = PatternTreeConfig::new()
            .with_length_fractions(0.1, 0.5)
            .with_pattern_count(20)
            .fit(&examples, &labels)
            .unwrap();
        assert!(tree.n_branches() >= 1);
        let correct = examples
            .iter()
            .zip(&labels)
            .filter(|&(e, &l)| tree.predict(e).unwrap() == l)
            .count();
        assert!(correct >= 18, "training accuracy {correct}/20");
    }

    #[test]
    fn leaves_are_one_more_than_branches() {
        let (examples, labels) = make_events(15, 30, 2);
        let tree = PatternTreeConfig::new()
            .with_pattern_count(5)
            .fit(&examples, &labels)
            .unwrap();
        assert_eq!(tree.n_leaves(), tree.n_branches() + 1);
        assert_eq!(tree.branch_patterns().len(), tree.n_branches());
        assert_leaves_sum_to_one(&tree);
    }

    #[test]
    fn laplace_leaves_sum_to_one() {
        let (examples, labels) = make_events(8, 30, 3);
        let tree = PatternTreeConfig::new()
            .with_smoothing(LeafSmoothing::Laplace)
            .with_max_depth(Some(1))
            .fit(&examples, &labels)
            .unwrap();
        assert_leaves_sum_to_one(&tree);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (examples, labels) = make_events(10, 30, 4);
        let config = PatternTreeConfig::new().with_pattern_count(10).with_seed(123);
        let a = config.fit(&examples, &labels).unwrap();
        let b = config.fit(&examples, &labels).unwrap();
        assert_eq!(a.n_nodes(), b.n_nodes());
        for (x, y) in a.branch_patterns().iter().zip(b.branch_patterns()) {
            assert_eq!(*x, y);
        }
    }

    #[test]
    fn too_short_series_force_a_leaf() {
        let examples = vec![univariate(&[1.0]), univariate(&[2.0])];
        let tree = PatternTreeConfig::new().fit(&examples, &[0, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert!(tree.root().is_leaf());
    }

    /// Two-dimensional examples whose first dimension is the same flat
    /// series everywhere, so only the second dimension can split.
    fn second_dimension_events() -> (Vec<MultivariateTimeSeries>, Vec<usize>) {
        let flat = TimeSeries::new(vec![1.0; 8]).unwrap();
        let mut examples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..8 {
            let class = i % 2;
            let mut signal = vec![0.0; 8];
            signal[1 + i % 5] = if class == 0 { 5.0 } else { -5.0 };
            examples.push(
                MultivariateTimeSeries::new(vec![flat.clone(), TimeSeries::new(signal).unwrap()])
                    .unwrap(),
            );
            labels.push(class);
        }
        (examples, labels)
    }

    #[test]
    fn missing_dimension_at_prediction() {
        let (examples, labels) = second_dimension_events();
        let tree = PatternTreeConfig::new()
            .with_pattern_count(50)
            .fit(&examples, &labels)
            .unwrap();
        assert!(tree.n_branches() >= 1);
        assert!(tree.branch_patterns().iter().all(|p| p.dimension() == 1));

        let short = univariate(&[1.0; 8]);
        let err = tree.predict(&short).unwrap_err();
        assert!(matches!(
            err,
            ForestError::DataShape {
                stage: Stage::Prediction,
                source: SeriesError::DimensionOutOfRange { dimension: 1, n_dimensions: 1 },
                ..
            }
        ));
    }

    #[test]
    fn missing_dimension_at_training() {
        let two_dim = |signal: [f64; 6]| {
            MultivariateTimeSeries::new(vec![
                TimeSeries::new(vec![0.0, 0.1, 0.0, 0.1, 0.0, 0.1]).unwrap(),
                TimeSeries::new(signal.to_vec()).unwrap(),
            ])
            .unwrap()
        };
        let examples = vec![
            two_dim([0.0, 5.0, 0.0, 0.0, 0.0, 0.0]),
            univariate(&[0.0, 0.1, 0.0, 0.1, 0.0, 0.1]),
            two_dim([0.0, 0.0, 5.0, 0.0, 0.0, 0.0]),
            two_dim([0.0, 0.0, 0.0, 0.0, -5.0, 0.0]),
        ];
        let err = PatternTreeConfig::new()
            .with_pattern_count(50)
            .fit(&examples, &[0, 1, 0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::DataShape {
                stage: Stage::Training,
                example_index: 1,
                source: SeriesError::DimensionOutOfRange { dimension: 1, n_dimensions: 1 },
            }
        ));
    }

    #[test]
    fn invalid_config_errors() {
        let examples = vec![univariate(&[1.0, 2.0, 3.0])];
        let labels = [0];
        assert!(matches!(
            PatternTreeConfig::new().with_pattern_count(0).fit(&examples, &labels),
            Err(ForestError::InvalidPatternCount { .. })
        ));
        assert!(matches!(
            PatternTreeConfig::new().with_max_depth(Some(0)).fit(&examples, &labels),
            Err(ForestError::InvalidMaxDepth { .. })
        ));
        assert!(matches!(
            PatternTreeConfig::new().with_min_samples_split(1).fit(&examples, &labels),
            Err(ForestError::InvalidMinSamplesSplit { .. })
        ));
        assert!(matches!(
            PatternTreeConfig::new()
                .with_length_fractions(0.8, 0.2)
                .fit(&examples, &labels),
            Err(ForestError::LowerExceedsUpper { .. })
        ));
    }
}
