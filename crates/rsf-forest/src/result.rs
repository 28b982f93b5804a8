//! Training result types for the pattern forest.

use std::time::Duration;

use crate::forest::RandomPatternForest;
use crate::oob::OobScore;

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Number of trees actually trained.
    pub n_trees: usize,
    /// Trees skipped because the time budget ran out.
    pub n_skipped_trees: usize,
    /// Number of distinct classes.
    pub n_classes: usize,
    /// Number of training examples.
    pub n_examples: usize,
    /// Total node count over all trees.
    pub n_nodes: usize,
    /// Wall-clock time spent training.
    pub training_time: Duration,
}

/// Result of pattern forest training.
///
/// Contains the fitted forest, optional OOB score, per-tree OOB indices
/// and training metadata.
#[derive(Debug)]
pub struct PatternForestResult {
    forest: RandomPatternForest,
    oob_score: Option<OobScore>,
    oob_indices_per_tree: Vec<Vec<usize>>,
    metadata: TrainingMetadata,
}

impl PatternForestResult {
    pub(crate) fn new(
        forest: RandomPatternForest,
        oob_score: Option<OobScore>,
        oob_indices_per_tree: Vec<Vec<usize>>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob_score,
            oob_indices_per_tree,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomPatternForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomPatternForest {
        self.forest
    }

    /// Return the OOB score, if computed.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the per-tree OOB example indices.
    #[must_use]
    pub fn oob_indices_per_tree(&self) -> &[Vec<usize>] {
        &self.oob_indices_per_tree
    }
}
