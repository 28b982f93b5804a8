use rand::Rng;
use rsf_series::{MultivariateTimeSeries, Pattern};

use crate::class_set::ClassSet;
use crate::error::{ForestError, Stage};
use crate::factory::PatternFactory;
use crate::node::Impurity;

/// Smallest weighted impurity decrease accepted as a real gain.
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                1.0 - class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Best threshold found for one candidate pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Threshold {
    pub(crate) value: f64,
    pub(crate) impurity_decrease: f64,
}

/// Scan every midpoint between adjacent distinct distances and return the
/// threshold with the largest weighted impurity decrease.
///
/// `sorted` holds `(distance, label)` pairs in ascending distance order.
/// The decrease is `n·I(parent) - n_l·I(left) - n_r·I(right)`.
pub(crate) fn best_threshold(
    sorted: &[(f64, usize)],
    parent_counts: &[usize],
    parent_impurity: Impurity,
    criterion: SplitCriterion,
) -> Option<Threshold> {
    let n_samples = sorted.len();
    if n_samples < 2 {
        return None;
    }

    let mut left_counts = vec![0usize; parent_counts.len()];
    let mut right_counts = parent_counts.to_vec();
    let mut best: Option<Threshold> = None;

    for i in 0..n_samples - 1 {
        let (dist_i, class_i) = sorted[i];
        left_counts[class_i] += 1;
        right_counts[class_i] -= 1;

        let dist_next = sorted[i + 1].0;
        if dist_i == dist_next {
            continue;
        }

        let n_left = i + 1;
        let n_right = n_samples - n_left;
        let decrease = (n_samples as f64) * parent_impurity.value()
            - (n_left as f64) * criterion.impurity(&left_counts, n_left).value()
            - (n_right as f64) * criterion.impurity(&right_counts, n_right).value();

        if best.is_none_or(|b| decrease > b.impurity_decrease) {
            best = Some(Threshold {
                value: (dist_i + dist_next) / 2.0,
                impurity_decrease: decrease,
            });
        }
    }

    best.filter(|b| b.impurity_decrease > MIN_IMPURITY_DECREASE)
}

/// Result of the best-of-k pattern search at one node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) pattern: Pattern,
    pub(crate) threshold: f64,
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Everything the node search reads but never changes.
pub(crate) struct SearchContext<'a> {
    pub(crate) examples: &'a [MultivariateTimeSeries],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) factory: PatternFactory,
    pub(crate) pattern_count: usize,
}

/// Draw `pattern_count` candidate patterns and keep the one whose best
/// threshold decreases impurity the most. Ties keep the first candidate.
///
/// Returns `Ok(None)` when no candidate could be drawn or none improves on
/// the parent.
///
/// # Errors
///
/// Returns [`ForestError::DataShape`] when an example lacks a pattern's dimension.
pub(crate) fn find_best_split(
    ctx: &SearchContext<'_>,
    sample_indices: &[usize],
    class_set: &ClassSet,
    rng: &mut impl Rng,
) -> Result<Option<SplitResult>, ForestError> {
    let parent_counts = class_set.class_counts();
    let parent_impurity = ctx.criterion.impurity(&parent_counts, sample_indices.len());

    let mut best: Option<(Pattern, Threshold, Vec<f64>)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(sample_indices.len());

    for _ in 0..ctx.pattern_count {
        let Some(pattern) = ctx.factory.create(ctx.examples, class_set, rng) else {
            continue;
        };

        let distances = sample_indices
            .iter()
            .map(|&si| {
                pattern
                    .distance(&ctx.examples[si])
                    .map(|d| d.value())
                    .map_err(|source| ForestError::DataShape {
                        stage: Stage::Training,
                        example_index: si,
                        source,
                    })
            })
            .collect::<Result<Vec<f64>, ForestError>>()?;

        sorted.clear();
        sorted.extend(
            distances
                .iter()
                .zip(sample_indices)
                .map(|(&d, &si)| (d, ctx.labels[si])),
        );
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let Some(threshold) = best_threshold(&sorted, &parent_counts, parent_impurity, ctx.criterion)
        else {
            continue;
        };

        if best
            .as_ref()
            .is_none_or(|(_, b, _)| threshold.impurity_decrease > b.impurity_decrease)
        {
            best = Some((pattern, threshold, distances));
        }
    }

    let Some((pattern, threshold, distances)) = best else {
        return Ok(None);
    };

    let mut left_indices = Vec::with_capacity(sample_indices.len() / 2);
    let mut right_indices = Vec::with_capacity(sample_indices.len() / 2);
    for (&si, &d) in sample_indices.iter().zip(&distances) {
        if d <= threshold.value {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Ok(Some(SplitResult {
        pattern,
        threshold: threshold.value,
        impurity_decrease: threshold.impurity_decrease,
        left_indices,
        right_indices,
    }))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rsf_series::TimeSeries;

    use super::*;

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[10, 0, 0], 10);
        assert!(imp.value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5, 5], 10);
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5, 5], 10);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn threshold_separates_sorted_distances() {
        let sorted = vec![(0.1, 0), (0.2, 0), (0.3, 0), (1.0, 1), (1.1, 1), (1.2, 1)];
        let parent = SplitCriterion::Gini.impurity(&[3, 3], 6);
        let t = best_threshold(&sorted, &[3, 3], parent, SplitCriterion::Gini).unwrap();
        assert!((t.value - 0.65).abs() < 1e-12);
        assert!((t.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn equal_distances_give_no_threshold() {
        let sorted = vec![(0.5, 0), (0.5, 1), (0.5, 0), (0.5, 1)];
        let parent = SplitCriterion::Gini.impurity(&[2, 2], 4);
        assert!(best_threshold(&sorted, &[2, 2], parent, SplitCriterion::Gini).is_none());
    }

    #[test]
    fn ties_keep_first_threshold() {
        // Splitting after index 0 or index 2 gives the same gain.
        let sorted = vec![(0.0, 0), (1.0, 1), (2.0, 1), (3.0, 0)];
        let parent = SplitCriterion::Gini.impurity(&[2, 2], 4);
        let t = best_threshold(&sorted, &[2, 2], parent, SplitCriterion::Gini).unwrap();
        assert!((t.value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn finds_a_separating_pattern() {
        // Class 0 has a spike, class 1 a dip; any window over the event separates them.
        let mut examples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..8 {
            let mut values: Vec<f64> = (0..20).map(|t| (t as f64 * 0.1).sin() * 0.1).collect();
            let class = i % 2;
            values[10] += if class == 0 { 3.0 } else { -3.0 };
            examples.push(TimeSeries::new(values).unwrap().into());
            labels.push(class);
        }
        let indices: Vec<usize> = (0..8).collect();
        let set = ClassSet::from_indices(&indices, &labels, 2);
        let ctx = SearchContext {
            examples: &examples,
            labels: &labels,
            n_classes: 2,
            criterion: SplitCriterion::Gini,
            factory: PatternFactory::new(0.1, 0.5).unwrap(),
            pattern_count: 30,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = find_best_split(&ctx, &indices, &set, &mut rng)
            .unwrap()
            .expect("a separating pattern exists");
        assert_eq!(split.left_indices.len() + split.right_indices.len(), 8);
        assert!(!split.left_indices.is_empty() && !split.right_indices.is_empty());
        assert!(split.impurity_decrease > 0.0);
    }
}
