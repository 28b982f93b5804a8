use rsf_series::SeriesError;

/// Where in the pipeline a data-shape problem was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Growing a pattern tree.
    Training,
    /// Routing an example through a trained tree.
    Prediction,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Training => f.write_str("training"),
            Stage::Prediction => f.write_str("prediction"),
        }
    }
}

/// Errors from pattern forest configuration, training and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when the number of candidate patterns per node is zero.
    #[error("pattern_count must be at least 1, got {pattern_count}")]
    InvalidPatternCount {
        /// The invalid pattern_count value provided.
        pattern_count: usize,
    },

    /// Returned when a shapelet length fraction is above 1 or not a number.
    #[error("{bound} length fraction must be at most 1.0, got {fraction}")]
    InvalidLengthFraction {
        /// Which bound was invalid ("lower" or "upper").
        bound: &'static str,
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when the lower length fraction exceeds the upper one.
    #[error("lower length fraction {lower} exceeds upper length fraction {upper}")]
    LowerExceedsUpper {
        /// The lower fraction.
        lower: f64,
        /// The upper fraction.
        upper: f64,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when the training dataset has zero examples.
    #[error("dataset has zero examples")]
    EmptyDataset,

    /// Returned when examples and labels differ in length.
    #[error("got {n_examples} examples but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of examples supplied.
        n_examples: usize,
        /// Number of labels supplied.
        n_labels: usize,
    },

    /// Returned when a label is not below the declared class count.
    #[error("example {example_index} has label {label}, but only {n_classes} classes are known")]
    UnknownLabel {
        /// The zero-based index of the offending example.
        example_index: usize,
        /// The offending label.
        label: usize,
        /// Number of classes the model knows.
        n_classes: usize,
    },

    /// Returned when an example does not have the shape a pattern needs.
    #[error("data shape mismatch during {stage} at example {example_index}")]
    DataShape {
        /// Pipeline stage where the mismatch surfaced.
        stage: Stage,
        /// The zero-based index of the offending example.
        example_index: usize,
        /// The underlying series error.
        source: SeriesError,
    },

    /// Returned when a class has fewer examples than the number of folds.
    #[error("class {class} has only {count} examples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The class label with insufficient examples.
        class: usize,
        /// The number of examples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when OOB evaluation fails (no example has any OOB tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },
}

impl ForestError {
    /// Re-point a [`ForestError::DataShape`] at `example_index`; other variants pass through.
    pub(crate) fn at_example(self, example_index: usize) -> Self {
        match self {
            ForestError::DataShape { stage, source, .. } => ForestError::DataShape {
                stage,
                example_index,
                source,
            },
            other => other,
        }
    }
}
