//! Configuration builder for pattern forest training.

use std::time::Duration;

use rsf_series::MultivariateTimeSeries;

use crate::error::ForestError;
use crate::result::PatternForestResult;
use crate::split::SplitCriterion;
use crate::tree::{LeafSmoothing, PatternTreeConfig};

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OobMode {
    /// Compute OOB accuracy and confusion matrix.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for pattern forest training.
///
/// Construct via [`PatternForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default     |
/// |---------------------|-------------|
/// | `pattern_count`     | 100         |
/// | `lower_length`      | 0.025       |
/// | `upper_length`      | 1.0         |
/// | `max_depth`         | `None`      |
/// | `min_samples_split` | 2           |
/// | `criterion`         | `Gini`      |
/// | `smoothing`         | `None`      |
/// | `oob_mode`          | `Disabled`  |
/// | `time_budget`       | `None`      |
/// | `seed`              | 42          |
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) pattern_count: usize,
    pub(crate) lower_length: f64,
    pub(crate) upper_length: f64,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) smoothing: LeafSmoothing,
    pub(crate) oob_mode: OobMode,
    #[serde(skip)]
    pub(crate) time_budget: Option<Duration>,
    pub(crate) seed: u64,
}

impl PatternForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            pattern_count: 100,
            lower_length: 0.025,
            upper_length: 1.0,
            max_depth: None,
            min_samples_split: 2,
            criterion: SplitCriterion::Gini,
            smoothing: LeafSmoothing::None,
            oob_mode: OobMode::Disabled,
            time_budget: None,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the number of candidate patterns drawn per node.
    #[must_use]
    pub fn with_pattern_count(mut self, pattern_count: usize) -> Self {
        self.pattern_count = pattern_count;
        self
    }

    /// Set the shapelet length bounds as fractions of the series length.
    ///
    /// A fraction `<= 0` disables its bound.
    #[must_use]
    pub fn with_length_fractions(mut self, lower: f64, upper: f64) -> Self {
        self.lower_length = lower;
        self.upper_length = upper;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
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

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the leaf distribution estimate.
    #[must_use]
    pub fn with_smoothing(mut self, smoothing: LeafSmoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Stop starting new trees once `budget` has elapsed. The first tree
    /// is always trained.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the number of candidate patterns per node.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Return the `(lower, upper)` shapelet length fractions.
    #[must_use]
    pub fn length_fractions(&self) -> (f64, f64) {
        (self.lower_length, self.upper_length)
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the leaf distribution estimate.
    #[must_use]
    pub fn smoothing(&self) -> LeafSmoothing {
        self.smoothing
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the training time budget, if any.
    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Tree settings shared by every member; the seed is set per tree.
    pub(crate) fn tree_config(&self) -> PatternTreeConfig {
        PatternTreeConfig::new()
            .with_criterion(self.criterion)
            .with_pattern_count(self.pattern_count)
            .with_length_fractions(self.lower_length, self.upper_length)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_smoothing(self.smoothing)
    }

    /// Train a pattern forest on the provided dataset.
    ///
    /// `labels[i]` is the zero-based class of `examples[i]`; the class count
    /// is `max(labels) + 1`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                          |
    /// |------------------------------------------|-----------------------------------------------|
    /// | [`ForestError::EmptyDataset`]            | `examples` is empty                           |
    /// | [`ForestError::LabelCountMismatch`]      | `examples.len() != labels.len()`              |
    /// | [`ForestError::InvalidPatternCount`]     | `pattern_count` is zero                       |
    /// | [`ForestError::InvalidLengthFraction`]   | a length fraction is NaN or above 1.0         |
    /// | [`ForestError::LowerExceedsUpper`]       | `lower > upper` with both bounds active       |
    /// | [`ForestError::InvalidMaxDepth`]         | `max_depth` is `Some(0)`                      |
    /// | [`ForestError::InvalidMinSamplesSplit`]  | `min_samples_split` < 2                       |
    /// | [`ForestError::DataShape`]               | an example lacks a drawn pattern's dimension  |
    /// | [`ForestError::OobEvaluationFailed`]     | OOB enabled but no example has any OOB tree   |
    pub fn fit(
        &self,
        examples: &[MultivariateTimeSeries],
        labels: &[usize],
    ) -> Result<PatternForestResult, ForestError> {
        crate::forest::train(self, examples, labels)
    }
}
