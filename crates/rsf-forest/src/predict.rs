//! Prediction methods for the pattern forest ensemble.

use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rsf_series::{MultivariateTimeSeries, Pattern};

use crate::error::ForestError;
use crate::forest::RandomPatternForest;
use crate::node::argmax;
use crate::tree::PatternTree;

/// Class probability distribution from a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class. Ties go to the lowest class ordinal.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// Return the top-k classes sorted by descending probability.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        // Stable sort keeps lower ordinals first among equal probabilities.
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    /// Consume and return the probabilities.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.probs
    }
}

impl RandomPatternForest {
    /// Predict the class ordinal for a single example.
    ///
    /// Returns the argmax of the averaged probability distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] when the example lacks a dimension
    /// some member tree routes on.
    pub fn predict(&self, example: &MultivariateTimeSeries) -> Result<usize, ForestError> {
        Ok(self.predict_proba(example)?.predicted_class())
    }

    /// Return the class distribution for a single example: the uniform
    /// average of every member's leaf distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] when the example lacks a dimension
    /// some member tree routes on.
    pub fn predict_proba(&self, example: &MultivariateTimeSeries) -> Result<ClassDistribution, ForestError> {
        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (slot, p) in avg.iter_mut().zip(tree.predict_proba(example)?) {
                *slot += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Return every member's leaf distribution for `example`, in tree order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] when the example lacks a dimension
    /// some member tree routes on.
    pub fn member_distributions(&self, example: &MultivariateTimeSeries) -> Result<Vec<Vec<f64>>, ForestError> {
        self.trees
            .iter()
            .map(|tree| tree.predict_proba(example).map(<[f64]>::to_vec))
            .collect()
    }

    /// Predict class ordinals for a batch of examples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] carrying the index of an offending example.
    pub fn predict_batch(&self, examples: &[MultivariateTimeSeries]) -> Result<Vec<usize>, ForestError> {
        examples
            .into_par_iter()
            .enumerate()
            .map(|(i, example)| self.predict(example).map_err(|e| e.at_example(i)))
            .collect()
    }

    /// Return probability distributions for a batch of examples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DataShape`] carrying the index of an offending example.
    pub fn predict_proba_batch(
        &self,
        examples: &[MultivariateTimeSeries],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        examples
            .into_par_iter()
            .enumerate()
            .map(|(i, example)| self.predict_proba(example).map_err(|e| e.at_example(i)))
            .collect()
    }

    /// Every pattern used by every branch of every member, tree by tree.
    #[must_use]
    pub fn branch_patterns(&self) -> Vec<&Pattern> {
        self.trees.iter().flat_map(PatternTree::branch_patterns).collect()
    }

    /// Borrow the member trees in training order.
    #[must_use]
    pub fn trees(&self) -> &[PatternTree] {
        &self.trees
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
