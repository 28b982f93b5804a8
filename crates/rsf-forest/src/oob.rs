//! Out-of-bag (OOB) evaluation for the pattern forest.

use rsf_series::MultivariateTimeSeries;

use crate::error::ForestError;
use crate::measures::ConfusionMatrix;
use crate::node::argmax;
use crate::tree::PatternTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// OOB accuracy (fraction of correctly predicted OOB examples).
    pub accuracy: f64,
    /// OOB confusion matrix over the examples that had an OOB tree.
    pub confusion_matrix: ConfusionMatrix,
    /// Number of examples that had at least one OOB tree.
    pub n_oob_examples: usize,
}

/// Compute out-of-bag predictions and accuracy.
///
/// Each example is scored by averaging the leaf distributions of the trees
/// whose bootstrap did not draw it. Examples with no OOB tree are skipped.
pub(crate) fn compute_oob(
    trees: &[PatternTree],
    examples: &[MultivariateTimeSeries],
    labels: &[usize],
    n_classes: usize,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let n_examples = examples.len();

    let mut sums: Vec<Vec<f64>> = vec![vec![0.0; n_classes]; n_examples];
    let mut has_oob = vec![false; n_examples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &i in oob_indices {
            let proba = tree
                .predict_proba(&examples[i])
                .map_err(|e| e.at_example(i))?;
            for (slot, p) in sums[i].iter_mut().zip(proba) {
                *slot += p;
            }
            has_oob[i] = true;
        }
    }

    let mut truth = Vec::new();
    let mut predicted = Vec::new();
    for (i, sum) in sums.iter().enumerate() {
        if has_oob[i] {
            truth.push(labels[i]);
            predicted.push(argmax(sum));
        }
    }

    if truth.is_empty() {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no example has any OOB tree".to_string(),
        });
    }

    let confusion_matrix = ConfusionMatrix::from_labels(&truth, &predicted, n_classes)?;

    Ok(OobScore {
        accuracy: confusion_matrix.accuracy(),
        n_oob_examples: truth.len(),
        confusion_matrix,
    })
}
