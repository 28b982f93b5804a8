//! Holdout and stratified k-fold evaluation of pattern forests.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rsf_series::MultivariateTimeSeries;
use tracing::{info, instrument};

use crate::config::PatternForestConfig;
use crate::error::ForestError;
use crate::measures::{ConfusionMatrix, Measures, base_accuracy};

/// Outcome of one train/test split.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FoldResult {
    /// Zero-based fold number (always 0 for holdout).
    pub fold: usize,
    /// Ensemble measures on the test part.
    pub measures: Measures,
    /// Wall-clock time of `fit`, in milliseconds.
    pub fit_time_ms: f64,
    /// Wall-clock time of predicting the test part, in milliseconds.
    pub predict_time_ms: f64,
    /// Number of training examples.
    pub n_train: usize,
    /// Number of test examples.
    pub n_test: usize,
    /// Number of trees actually trained.
    pub n_trees: usize,
}

/// Per-split measures and timings of an evaluation run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvaluationResult {
    folds: Vec<FoldResult>,
    n_classes: usize,
    confusion_matrix: ConfusionMatrix,
}

impl EvaluationResult {
    fn from_folds(folds: Vec<FoldResult>, n_classes: usize) -> Self {
        let mut confusion_matrix = ConfusionMatrix::zeros(n_classes);
        for fold in &folds {
            confusion_matrix.accumulate(&fold.measures.confusion_matrix);
        }
        Self {
            folds,
            n_classes,
            confusion_matrix,
        }
    }

    /// Return the result of every split, in fold order.
    #[must_use]
    pub fn folds(&self) -> &[FoldResult] {
        &self.folds
    }

    /// Return the number of classes seen during evaluation.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean of every scalar measure over the folds, keyed by measure name.
    ///
    /// `oob_accuracy` is averaged over the folds that report it.
    #[must_use]
    pub fn mean_measures(&self) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for fold in &self.folds {
            for (name, value) in fold.measures.scalars() {
                let entry = sums.entry(name.to_string()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(name, (sum, n))| (name, sum / n as f64))
            .collect()
    }

    /// Standard deviation of the fold accuracies.
    #[must_use]
    pub fn std_accuracy(&self) -> f64 {
        let n = self.folds.len() as f64;
        let mean = self.folds.iter().map(|f| f.measures.accuracy).sum::<f64>() / n;
        let variance = self
            .folds
            .iter()
            .map(|f| (f.measures.accuracy - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }

    /// Mean `fit` time over the folds, in milliseconds.
    #[must_use]
    pub fn mean_fit_time_ms(&self) -> f64 {
        self.folds.iter().map(|f| f.fit_time_ms).sum::<f64>() / self.folds.len() as f64
    }

    /// Mean prediction time over the folds, in milliseconds.
    #[must_use]
    pub fn mean_predict_time_ms(&self) -> f64 {
        self.folds.iter().map(|f| f.predict_time_ms).sum::<f64>() / self.folds.len() as f64
    }

    /// Confusion matrix summed over all folds.
    #[must_use]
    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.confusion_matrix
    }
}

/// Train once, then evaluate on a fixed test set.
#[derive(Debug, Clone, Copy)]
pub struct Holdout<'a> {
    test_examples: &'a [MultivariateTimeSeries],
    test_labels: &'a [usize],
}

impl<'a> Holdout<'a> {
    /// Create a holdout validator over the given test set.
    #[must_use]
    pub fn new(test_examples: &'a [MultivariateTimeSeries], test_labels: &'a [usize]) -> Self {
        Self {
            test_examples,
            test_labels,
        }
    }

    /// Fit `config` on the training data and score it on the test set.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | The training or test set is empty |
    /// | [`ForestError::LabelCountMismatch`] | Test examples and labels differ in length |
    /// | [`ForestError::UnknownLabel`] | A test label was never seen in training |
    /// | Other forest errors | From training or prediction |
    #[instrument(skip_all, fields(n_train = train_examples.len(), n_test = self.test_examples.len()))]
    pub fn evaluate(
        &self,
        config: &PatternForestConfig,
        train_examples: &[MultivariateTimeSeries],
        train_labels: &[usize],
    ) -> Result<EvaluationResult, ForestError> {
        let fold = evaluate_split(
            config,
            0,
            train_examples,
            train_labels,
            self.test_examples,
            self.test_labels,
        )?;
        let n_classes = fold.measures.confusion_matrix.n_classes();

        info!(
            accuracy = fold.measures.accuracy,
            fit_time_ms = fold.fit_time_ms,
            predict_time_ms = fold.predict_time_ms,
            "holdout evaluation complete"
        );

        Ok(EvaluationResult::from_folds(vec![fold], n_classes))
    }
}

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, ForestError> {
        if n_folds < 2 {
            return Err(ForestError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Run stratified k-fold cross-validation.
    ///
    /// Each fold trains a fresh forest on the other folds with seed
    /// `config.seed() + fold` and scores it on the held-out fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero examples |
    /// | [`ForestError::LabelCountMismatch`] | Examples and labels differ in length |
    /// | [`ForestError::TooFewSamplesForFolds`] | A class has fewer examples than folds |
    /// | Other forest errors | From underlying training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_examples = examples.len()))]
    pub fn evaluate(
        &self,
        config: &PatternForestConfig,
        examples: &[MultivariateTimeSeries],
        labels: &[usize],
    ) -> Result<EvaluationResult, ForestError> {
        if examples.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if examples.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_examples: examples.len(),
                n_labels: labels.len(),
            });
        }

        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let fold_assignments = self.stratified_split(labels, n_classes)?;

        let mut folds = Vec::with_capacity(self.n_folds);
        for fold in 0..self.n_folds {
            let mut train_examples = Vec::new();
            let mut train_labels = Vec::new();
            let mut test_examples = Vec::new();
            let mut test_labels = Vec::new();

            for (i, &assigned_fold) in fold_assignments.iter().enumerate() {
                if assigned_fold == fold {
                    test_examples.push(examples[i].clone());
                    test_labels.push(labels[i]);
                } else {
                    train_examples.push(examples[i].clone());
                    train_labels.push(labels[i]);
                }
            }

            // Each fold trains with different randomness.
            let fold_config = config.clone().with_seed(config.seed.wrapping_add(fold as u64));
            let result = evaluate_split(
                &fold_config,
                fold,
                &train_examples,
                &train_labels,
                &test_examples,
                &test_labels,
            )?;

            info!(
                fold,
                accuracy = result.measures.accuracy,
                fit_time_ms = result.fit_time_ms,
                "fold completed"
            );
            folds.push(result);
        }

        let evaluation = EvaluationResult::from_folds(folds, n_classes);
        info!(
            mean_accuracy = evaluation.mean_measures().get("accuracy").copied(),
            std_accuracy = evaluation.std_accuracy(),
            "cross-validation complete"
        );
        Ok(evaluation)
    }

    /// Create stratified fold assignments.
    ///
    /// Groups examples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    fn stratified_split(&self, labels: &[usize], n_classes: usize) -> Result<Vec<usize>, ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(ForestError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok(fold_assignments)
    }
}

/// Fit on `train`, time it, then predict and score `test`.
fn evaluate_split(
    config: &PatternForestConfig,
    fold: usize,
    train_examples: &[MultivariateTimeSeries],
    train_labels: &[usize],
    test_examples: &[MultivariateTimeSeries],
    test_labels: &[usize],
) -> Result<FoldResult, ForestError> {
    if test_examples.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    if test_examples.len() != test_labels.len() {
        return Err(ForestError::LabelCountMismatch {
            n_examples: test_examples.len(),
            n_labels: test_labels.len(),
        });
    }

    let fit_started = Instant::now();
    let result = config.fit(train_examples, train_labels)?;
    let fit_time_ms = fit_started.elapsed().as_secs_f64() * 1000.0;

    let forest = result.forest();
    let n_classes = forest.n_classes();
    if let Some((example_index, &label)) = test_labels.iter().enumerate().find(|&(_, &l)| l >= n_classes) {
        return Err(ForestError::UnknownLabel {
            example_index,
            label,
            n_classes,
        });
    }

    let predict_started = Instant::now();
    let distributions = forest.predict_proba_batch(test_examples)?;
    let predict_time_ms = predict_started.elapsed().as_secs_f64() * 1000.0;

    let measures = Measures::from_distributions(test_labels, &distributions, n_classes)?
        .with_base_accuracy(base_accuracy(forest, test_examples, test_labels)?)
        .with_oob_accuracy(result.oob_score().map(|s| s.accuracy));

    Ok(FoldResult {
        fold,
        measures,
        fit_time_ms,
        predict_time_ms,
        n_train: train_examples.len(),
        n_test: test_examples.len(),
        n_trees: forest.n_trees(),
    })
}
