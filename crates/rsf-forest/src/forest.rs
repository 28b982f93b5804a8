//! Pattern forest training with parallel tree construction.

use std::time::Instant;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rsf_series::MultivariateTimeSeries;
use tracing::{debug, info, instrument, warn};

use crate::class_set::ClassSet;
use crate::config::{OobMode, PatternForestConfig};
use crate::error::ForestError;
use crate::oob::compute_oob;
use crate::result::{PatternForestResult, TrainingMetadata};
use crate::tree::{PatternTree, validate_dataset};

/// A fitted random pattern forest.
#[derive(Debug, Clone)]
pub struct RandomPatternForest {
    pub(crate) trees: Vec<PatternTree>,
    pub(crate) n_classes: usize,
}

/// Train the pattern forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_examples = examples.len()))]
pub(crate) fn train(
    config: &PatternForestConfig,
    examples: &[MultivariateTimeSeries],
    labels: &[usize],
) -> Result<PatternForestResult, ForestError> {
    // --- Validate config and inputs before any tree is grown ---
    let tree_config = config.tree_config();
    let factory = tree_config.validate()?;
    let n_classes = validate_dataset(examples, labels)?;
    let n_examples = examples.len();

    info!(
        n_trees = config.n_trees,
        n_examples,
        n_classes,
        pattern_count = config.pattern_count,
        lower = config.lower_length,
        upper = config.upper_length,
        "training pattern forest"
    );

    // Per-tree seeds from the master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let class_set = ClassSet::new(labels, n_classes);
    let started = Instant::now();
    let budget = config.time_budget;

    // Parallel tree training; collect keeps seed order.
    let tree_results: Vec<Option<(PatternTree, Vec<usize>)>> = tree_seeds
        .into_par_iter()
        .enumerate()
        .map(|(tree_index, seed)| {
            if tree_index > 0 && budget.is_some_and(|b| started.elapsed() >= b) {
                return Ok(None);
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (in_bag, out_of_bag) = class_set.bootstrap(&mut rng).into_parts();
            let tree = tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit_sample(factory, examples, labels, n_classes, &in_bag)?;
            debug!(
                tree_index,
                n_nodes = tree.n_nodes(),
                depth = tree.depth(),
                n_out_of_bag = out_of_bag.len(),
                "tree trained"
            );
            Ok(Some((tree, out_of_bag)))
        })
        .collect::<Result<_, ForestError>>()?;

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut oob_indices_per_tree = Vec::with_capacity(config.n_trees);
    for (tree, oob) in tree_results.into_iter().flatten() {
        trees.push(tree);
        oob_indices_per_tree.push(oob);
    }

    let n_skipped_trees = config.n_trees - trees.len();
    if n_skipped_trees > 0 {
        warn!(
            n_skipped_trees,
            trained = trees.len(),
            "time budget exhausted, forest is smaller than requested"
        );
    }

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(
            &trees,
            examples,
            labels,
            n_classes,
            &oob_indices_per_tree,
        )?)
    } else {
        None
    };

    let metadata = TrainingMetadata {
        n_trees: trees.len(),
        n_skipped_trees,
        n_classes,
        n_examples,
        n_nodes: trees.iter().map(PatternTree::n_nodes).sum(),
        training_time: started.elapsed(),
    };

    let forest = RandomPatternForest { trees, n_classes };

    info!(
        n_trees = metadata.n_trees,
        n_nodes = metadata.n_nodes,
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        "pattern forest training complete"
    );

    Ok(PatternForestResult::new(forest, oob_score, oob_indices_per_tree, metadata))
}
