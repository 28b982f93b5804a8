//! Random shapelet forests: train, evaluate, predict.
//!
//! Trees split on the z-normalized sliding distance between an example and
//! a shapelet drawn at random from the training data. Provides stratified
//! bootstrap, Gini/Entropy scoring, parallel training via rayon, out-of-bag
//! evaluation, holdout and stratified k-fold validation, and ensemble
//! measures.

mod class_set;
mod config;
mod error;
mod eval;
mod factory;
mod forest;
mod measures;
mod node;
mod oob;
mod predict;
mod result;
mod split;
mod tree;

pub use class_set::{Bootstrap, ClassSet};
pub use config::{OobMode, PatternForestConfig};
pub use error::{ForestError, Stage};
pub use eval::{CrossValidation, EvaluationResult, FoldResult, Holdout};
pub use factory::PatternFactory;
pub use forest::RandomPatternForest;
pub use measures::{ClassMetrics, ConfusionMatrix, Measures, base_accuracy};
pub use node::{Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use predict::ClassDistribution;
pub use result::{PatternForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{LeafSmoothing, PatternTree, PatternTreeConfig};
