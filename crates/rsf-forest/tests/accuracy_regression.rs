//! Accuracy regression tests for rsf-forest.
//!
//! These tests verify that algorithmic changes do not degrade pattern forest
//! classification accuracy on deterministic synthetic time series.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rsf_forest::{CrossValidation, Holdout, OobMode, PatternForestConfig};
use rsf_series::{MultivariateTimeSeries, TimeSeries};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic time series dataset
// ---------------------------------------------------------------------------

/// Generate `n_per_class` series per class of length `len`.
///
/// Every series is low-amplitude noise. Class 0 contains a triangular bump
/// and class 1 a square pulse, each placed at a random offset, so only a
/// shift-invariant shape comparison separates them.
fn make_shapes(n_per_class: usize, len: usize, seed: u64) -> (Vec<MultivariateTimeSeries>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let width = 8;
    let mut examples = Vec::with_capacity(2 * n_per_class);
    let mut labels = Vec::with_capacity(2 * n_per_class);
    for i in 0..2 * n_per_class {
        let class = i % 2;
        let at = rng.gen_range(0..len - width);
        let values: Vec<f64> = (0..len)
            .map(|t| {
                let noise = rng.r#gen::<f64>() * 0.2 - 0.1;
                let shape = if (at..at + width).contains(&t) {
                    let k = (t - at) as f64;
                    if class == 0 {
                        1.0 - (k - 3.5).abs() / 3.5
                    } else {
                        1.0
                    }
                } else {
                    0.0
                };
                3.0 * shape + noise
            })
            .collect();
        examples.push(TimeSeries::new(values).unwrap().into());
        labels.push(class);
    }
    (examples, labels)
}

fn scenario_config() -> PatternForestConfig {
    PatternForestConfig::new(10)
        .unwrap()
        .with_length_fractions(0.1, 0.5)
        .with_pattern_count(20)
        .with_seed(42)
}

// ---------------------------------------------------------------------------
// a) end_to_end_scenario
// ---------------------------------------------------------------------------

/// 20 series of length 50, two classes, 10 trees, shapelets between 10% and
/// 50% of the length, 20 candidates per node.
#[test]
fn end_to_end_scenario() {
    let (examples, labels) = make_shapes(10, 50, 7);
    let result = scenario_config().fit(&examples, &labels).unwrap();
    let forest = result.forest();

    assert_eq!(forest.n_trees(), 10);
    for tree in forest.trees() {
        assert!(tree.n_branches() >= 1, "every member must split at least once");
        assert_eq!(tree.n_leaves(), tree.n_branches() + 1);
        for pattern in tree.branch_patterns() {
            let len = pattern.shapelet().len();
            assert!((5..=25).contains(&len), "shapelet length {len} outside [5, 25]");
        }
    }

    let predictions = forest.predict_batch(&examples).unwrap();
    let correct = predictions.iter().zip(&labels).filter(|&(&p, &l)| p == l).count();
    let accuracy = correct as f64 / labels.len() as f64;
    assert!((0.0..=1.0).contains(&accuracy));
    assert!(accuracy > 0.9, "training accuracy {accuracy} <= 0.9");

    for example in &examples {
        let proba = forest.predict_proba(example).unwrap();
        let members = forest.member_distributions(example).unwrap();
        let sum: f64 = proba.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for class in 0..2 {
            let mean = members.iter().map(|m| m[class]).sum::<f64>() / members.len() as f64;
            assert!((proba.as_slice()[class] - mean).abs() < 1e-12);
        }
    }
}

// ---------------------------------------------------------------------------
// b) deterministic_predictions
// ---------------------------------------------------------------------------

/// Same config and seed must produce identical forests across two runs.
#[test]
fn deterministic_predictions() {
    let (examples, labels) = make_shapes(10, 50, 8);
    let first = scenario_config().fit(&examples, &labels).unwrap();
    let second = scenario_config().fit(&examples, &labels).unwrap();

    assert_eq!(
        first.forest().branch_patterns(),
        second.forest().branch_patterns(),
        "patterns differ across runs with the same seed"
    );
    let a = first.forest().predict_proba_batch(&examples).unwrap();
    let b = second.forest().predict_proba_batch(&examples).unwrap();
    assert_eq!(a, b, "probabilities differ across runs with the same seed");
}

// ---------------------------------------------------------------------------
// c) holdout_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// Holdout accuracy on an independent test draw must exceed 0.85.
#[test]
fn holdout_accuracy_above_threshold() {
    let (train, train_labels) = make_shapes(20, 60, 9);
    let (test, test_labels) = make_shapes(20, 60, 10);
    let config = PatternForestConfig::new(30).unwrap().with_pattern_count(20);
    let result = Holdout::new(&test, &test_labels)
        .evaluate(&config, &train, &train_labels)
        .unwrap();

    let means = result.mean_measures();
    assert!(means["accuracy"] > 0.85, "holdout accuracy {} <= 0.85", means["accuracy"]);
    assert!(means["auc"] > 0.85, "holdout auc {} <= 0.85", means["auc"]);
    assert!(means["brier_score"] < 0.5);
}

// ---------------------------------------------------------------------------
// d) cv_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// 5-fold cross-validation mean accuracy must exceed 0.8.
#[test]
fn cv_accuracy_above_threshold() {
    let (examples, labels) = make_shapes(20, 50, 11);
    let config = PatternForestConfig::new(20).unwrap().with_pattern_count(15);
    let cv = CrossValidation::new(5).unwrap().with_seed(42);
    let result = cv.evaluate(&config, &examples, &labels).unwrap();

    let accuracy = result.mean_measures()["accuracy"];
    assert!(accuracy > 0.8, "cv mean accuracy {accuracy} <= 0.8");
    assert_eq!(result.folds().len(), 5);
}

// ---------------------------------------------------------------------------
// e) oob_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// OOB accuracy with 50 trees must exceed 0.75.
#[test]
fn oob_accuracy_above_threshold() {
    let (examples, labels) = make_shapes(20, 50, 12);
    let config = PatternForestConfig::new(50)
        .unwrap()
        .with_pattern_count(15)
        .with_oob_mode(OobMode::Enabled);
    let result = config.fit(&examples, &labels).unwrap();

    let oob = result.oob_score().expect("OOB score must be computed when OobMode::Enabled");
    assert!(oob.accuracy > 0.75, "oob_accuracy {} <= 0.75", oob.accuracy);
}

// ---------------------------------------------------------------------------
// f) full_length_shapelets
// ---------------------------------------------------------------------------

/// With both fractions at 1.0, every shapelet spans the whole series.
#[test]
fn full_length_shapelets() {
    let (examples, labels) = make_shapes(6, 10, 13);
    let result = PatternForestConfig::new(5)
        .unwrap()
        .with_length_fractions(1.0, 1.0)
        .with_pattern_count(5)
        .fit(&examples, &labels)
        .unwrap();
    for pattern in result.forest().branch_patterns() {
        assert_eq!(pattern.shapelet().len(), 10);
        assert_eq!(pattern.shapelet().start(), 0);
    }
}
