//! Random candidate pattern generation.

use rand::Rng;
use rsf_series::{MIN_SHAPELET_LEN, MultivariateTimeSeries, Pattern, Shapelet};

use crate::class_set::ClassSet;
use crate::error::ForestError;

/// Draws random shapelets whose length is bounded by fractions of the
/// source series length.
///
/// A fraction `<= 0` disables its bound: the lower bound falls back to 2
/// and the upper bound to the full series length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternFactory {
    lower: f64,
    upper: f64,
}

impl PatternFactory {
    /// Create a factory from lower/upper length fractions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidLengthFraction`] | a fraction is NaN or above 1.0 |
    /// | [`ForestError::LowerExceedsUpper`] | both fractions are active and `lower > upper` |
    pub fn new(lower: f64, upper: f64) -> Result<Self, ForestError> {
        for (bound, fraction) in [("lower", lower), ("upper", upper)] {
            if fraction.is_nan() || fraction > 1.0 {
                return Err(ForestError::InvalidLengthFraction { bound, fraction });
            }
        }
        if lower > 0.0 && upper > 0.0 && lower > upper {
            return Err(ForestError::LowerExceedsUpper { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Return the lower length fraction.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Return the upper length fraction.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Length range `[min_len, max_len)` for a series of `series_len` values,
    /// or `None` when the series is too short for any shapelet.
    ///
    /// `max_len` may exceed `series_len`; drawn lengths are clamped to it.
    #[must_use]
    pub fn length_bounds(&self, series_len: usize) -> Option<(usize, usize)> {
        if series_len < MIN_SHAPELET_LEN {
            return None;
        }
        let n = series_len as f64;
        let min_len = if self.lower > 0.0 {
            MIN_SHAPELET_LEN.max((n * self.lower).round() as usize)
        } else {
            MIN_SHAPELET_LEN
        };
        let upper_len = if self.upper > 0.0 {
            (n * self.upper).round() as usize
        } else {
            series_len
        };
        Some((min_len, (min_len + 1).max(upper_len)))
    }

    /// Draw `(start, length)` for a series of `series_len` values.
    ///
    /// The start is uniform over every offset where the window fits, so the
    /// range is never empty once a length exists.
    pub fn sample_window(&self, series_len: usize, rng: &mut impl Rng) -> Option<(usize, usize)> {
        let (min_len, max_len) = self.length_bounds(series_len)?;
        let length = rng.gen_range(min_len..max_len).min(series_len);
        let start = rng.gen_range(0..=series_len - length);
        Some((start, length))
    }

    /// Draw one candidate pattern from the examples listed in `class_set`.
    ///
    /// Picks a class, an example of that class, a dimension of that example
    /// and a window of that dimension. Returns `None` when the set is empty
    /// or the chosen dimension is too short.
    pub fn create(
        &self,
        examples: &[MultivariateTimeSeries],
        class_set: &ClassSet,
        rng: &mut impl Rng,
    ) -> Option<Pattern> {
        let example = &examples[class_set.sample(rng)?];
        let dimension = rng.gen_range(0..example.n_dimensions());
        let series = &example.dimensions()[dimension];
        let (start, length) = self.sample_window(series.len(), rng)?;
        let shapelet = Shapelet::extract(series, start, length).ok()?;
        Some(Pattern::new(shapelet, dimension))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rsf_series::TimeSeries;

    use super::*;

    fn univariate(n: usize, phase: f64) -> MultivariateTimeSeries {
        let values = (0..n).map(|i| (i as f64 * 0.4 + phase).sin()).collect();
        TimeSeries::new(values).unwrap().into()
    }

    #[test]
    fn bounds_follow_fractions() {
        let f = PatternFactory::new(0.1, 0.5).unwrap();
        assert_eq!(f.length_bounds(50), Some((5, 25)));
    }

    #[test]
    fn inactive_fractions_fall_back() {
        let f = PatternFactory::new(0.0, -1.0).unwrap();
        assert_eq!(f.length_bounds(40), Some((2, 40)));
    }

    #[test]
    fn tiny_lower_fraction_clamps_to_two() {
        let f = PatternFactory::new(0.025, 1.0).unwrap();
        assert_eq!(f.length_bounds(20), Some((2, 20)));
    }

    #[test]
    fn too_short_series_has_no_bounds() {
        let f = PatternFactory::new(0.1, 1.0).unwrap();
        assert_eq!(f.length_bounds(1), None);
    }

    #[test]
    fn invalid_fractions_rejected() {
        assert!(matches!(
            PatternFactory::new(0.6, 0.5),
            Err(ForestError::LowerExceedsUpper { .. })
        ));
        assert!(matches!(
            PatternFactory::new(0.1, 1.5),
            Err(ForestError::InvalidLengthFraction { bound: "upper", .. })
        ));
        assert!(matches!(
            PatternFactory::new(f64::NAN, 0.5),
            Err(ForestError::InvalidLengthFraction { bound: "lower", .. })
        ));
        // An inactive upper bound does not conflict with the lower one.
        assert!(PatternFactory::new(0.6, 0.0).is_ok());
    }

    #[test]
    fn windows_always_fit() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for (lower, upper) in [(0.025, 1.0), (0.1, 0.5), (0.5, 1.0), (0.0, 0.0), (0.9, 0.95)] {
            let f = PatternFactory::new(lower, upper).unwrap();
            for n in 2..80 {
                for _ in 0..20 {
                    let (start, length) = f.sample_window(n, &mut rng).unwrap();
                    assert!(length >= 2 && length <= n, "n={n} length={length}");
                    assert!(start + length <= n);
                }
            }
        }
    }

    #[test]
    fn full_length_fractions_give_full_length_shapelets() {
        let f = PatternFactory::new(1.0, 1.0).unwrap();
        assert_eq!(f.length_bounds(10), Some((10, 11)));
        let examples: Vec<_> = (0..4).map(|i| univariate(10, i as f64)).collect();
        let set = ClassSet::new(&[0, 0, 1, 1], 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..50 {
            let p = f.create(&examples, &set, &mut rng).unwrap();
            assert_eq!(p.shapelet().len(), 10);
            assert_eq!(p.shapelet().start(), 0);
        }
    }

    #[test]
    fn multivariate_dimension_is_drawn() {
        let example = MultivariateTimeSeries::new(vec![
            TimeSeries::new((0..12).map(f64::from).collect()).unwrap(),
            TimeSeries::new((0..6).map(|i| f64::from(i * i)).collect()).unwrap(),
        ])
        .unwrap();
        let examples = vec![example];
        let set = ClassSet::new(&[0], 1);
        let f = PatternFactory::new(0.2, 0.8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut seen = [false; 2];
        for _ in 0..100 {
            let p = f.create(&examples, &set, &mut rng).unwrap();
            seen[p.dimension()] = true;
            let len = examples[0].dimensions()[p.dimension()].len();
            assert!(p.shapelet().start() + p.shapelet().len() <= len);
        }
        assert!(seen[0] && seen[1]);
    }
}
