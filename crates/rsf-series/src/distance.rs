//! Early-abandoning, z-normalized sliding distance between a shapelet and a series.

use std::cmp::Ordering;
use std::fmt;

use crate::normalize::{WindowStats, is_constant, magnitude_order, z_normalize};
use crate::shapelet::Shapelet;

/// Squared-difference sum of a constant window against a non-constant
/// shapelet, per value: the largest possible between two z-normalized vectors.
const MAX_SQUARED_DIFF_PER_VALUE: f64 = 4.0;

/// A non-negative shapelet distance. Smaller means more similar.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ShapeletDistance(f64);

impl ShapeletDistance {
    /// Largest value the sliding distance can take.
    pub const MAX: Self = Self(2.0);

    /// Create a distance from a raw value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for ShapeletDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// The normalized sequence that slides over the longer one.
struct Query<'a> {
    values: &'a [f64],
    order: &'a [usize],
    constant: bool,
}

/// Minimum distance between `shapelet` and every equal-length window of `series`.
///
/// Each window is z-normalized on the fly. Squared differences are summed in
/// the shapelet's magnitude order and a window is abandoned as soon as its
/// partial sum reaches the best sum found so far; the result equals
/// [`brute_force_distance`].
///
/// The distance is `sqrt(min_ssd / m)` where `m` is the compared length.
/// A constant window scores [`ShapeletDistance::MAX`] against a non-constant
/// shapelet and zero against a constant one. When `series` is shorter than
/// the shapelet, the series is normalized and slides over the shapelet instead.
#[must_use]
pub fn sliding_distance(series: &[f64], shapelet: &Shapelet) -> ShapeletDistance {
    compare(series, shapelet, true)
}

/// Same result as [`sliding_distance`], without early abandonment.
#[must_use]
pub fn brute_force_distance(series: &[f64], shapelet: &Shapelet) -> ShapeletDistance {
    compare(series, shapelet, false)
}

fn compare(series: &[f64], shapelet: &Shapelet, abandon: bool) -> ShapeletDistance {
    if series.len() >= shapelet.len() {
        let query = Query {
            values: shapelet.values(),
            order: shapelet.order(),
            constant: shapelet.is_constant(),
        };
        return finish(min_squared_distance(series, &query, abandon), shapelet.len());
    }

    if series.is_empty() {
        return ShapeletDistance::MAX;
    }
    let values = z_normalize(series);
    let order = magnitude_order(&values);
    let query = Query {
        values: &values,
        order: &order,
        constant: is_constant(series),
    };
    finish(
        min_squared_distance(shapelet.values(), &query, abandon),
        series.len(),
    )
}

fn finish(min_ssd: f64, m: usize) -> ShapeletDistance {
    ShapeletDistance::new((min_ssd / m as f64).sqrt())
}

fn min_squared_distance(target: &[f64], query: &Query<'_>, abandon: bool) -> f64 {
    let m = query.values.len();
    let stats = WindowStats::new(target);
    let mut best = f64::INFINITY;

    for start in 0..=target.len() - m {
        let ssd = match stats.window(start, m) {
            None if query.constant => 0.0,
            None => MAX_SQUARED_DIFF_PER_VALUE * m as f64,
            Some((mean, std)) => {
                let window = &target[start..start + m];
                if abandon {
                    let mut sum = 0.0;
                    for &i in query.order {
                        let d = query.values[i] - (window[i] - mean) / std;
                        sum += d * d;
                        if sum >= best {
                            break;
                        }
                    }
                    sum
                } else {
                    window
                        .iter()
                        .zip(query.values)
                        .map(|(&x, &s)| {
                            let d = s - (x - mean) / std;
                            d * d
                        })
                        .sum()
                }
            }
        };

        if ssd < best {
            best = ssd;
            if best == 0.0 {
                break;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::series::TimeSeries;

    fn shapelet(values: &[f64]) -> Shapelet {
        let ts = TimeSeries::new(values.to_vec()).unwrap();
        Shapelet::extract(&ts, 0, values.len()).unwrap()
    }

    #[test]
    fn display_format() {
        let d = ShapeletDistance::new(1.234567);
        assert_eq!(format!("{d}"), "1.234567");
    }

    #[test]
    fn total_cmp_ordering() {
        let a = ShapeletDistance::new(1.0);
        let b = ShapeletDistance::new(2.0);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(b.total_cmp(&a), Ordering::Greater);
    }

    #[test]
    fn contained_copy_has_zero_distance() {
        let s = shapelet(&[1.0, 3.0, 2.0, 5.0]);
        // Scaled and shifted copy embedded at offset 3.
        let series = [9.0, -1.0, 0.5, 12.0, 16.0, 14.0, 20.0, 0.0, 3.0];
        let d = sliding_distance(&series, &s);
        assert!(d.value() < 1e-6, "distance was {d}");
    }

    #[test]
    fn contained_copy_far_from_series_mean_has_zero_distance() {
        for (offset, amp) in [(1e3, 0.01), (1e5, 0.01), (1e6, 1e-3), (1e8, 0.01)] {
            let mut values = vec![0.0; 30];
            values.extend((0..30).map(|t| offset + amp * (0.7 * t as f64).sin()));
            let ts = TimeSeries::new(values).unwrap();
            let s = Shapelet::extract(&ts, 40, 10).unwrap();
            let d = sliding_distance(ts.as_slice(), &s).value();
            assert!(d < 1e-9, "offset {offset} amp {amp}: distance was {d}");
        }
    }

    #[test]
    fn distance_is_non_negative_and_bounded() {
        let s = shapelet(&[0.0, 1.0, 0.0, -1.0]);
        let series = [1.0, 0.0, -1.0, 0.0, 1.0, 2.0, -3.0];
        let d = sliding_distance(&series, &s).value();
        assert!((0.0..=ShapeletDistance::MAX.value()).contains(&d));
    }

    #[test]
    fn constant_window_against_non_constant_shapelet_is_maximal() {
        let s = shapelet(&[0.0, 1.0, 2.0]);
        let d = sliding_distance(&[5.0, 5.0, 5.0], &s);
        assert_eq!(d, ShapeletDistance::MAX);
    }

    #[test]
    fn constant_window_against_constant_shapelet_is_zero() {
        let s = shapelet(&[2.0, 2.0, 2.0]);
        let d = sliding_distance(&[1.0, 7.0, 7.0, 7.0, 3.0], &s);
        assert_eq!(d.value(), 0.0);
    }

    #[test]
    fn shorter_series_slides_over_shapelet() {
        let s = shapelet(&[0.0, 1.0, 4.0, 9.0, 16.0]);
        let d = sliding_distance(&[1.0, 4.0, 9.0], &s);
        assert!(d.value() < 1e-6, "distance was {d}");
    }

    #[test]
    fn early_abandon_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let n = rng.gen_range(2..60);
            let series: Vec<f64> = (0..n).map(|_| rng.gen_range(-5.0..5.0)).collect();
            let m = rng.gen_range(2..=70);
            let raw: Vec<f64> = (0..m).map(|_| rng.gen_range(-5.0..5.0)).collect();
            let s = shapelet(&raw);
            let fast = sliding_distance(&series, &s).value();
            let slow = brute_force_distance(&series, &s).value();
            assert!(
                (fast - slow).abs() < 1e-9,
                "abandoned {fast} vs brute force {slow}"
            );
        }
    }

    #[test]
    fn early_abandon_matches_brute_force_with_plateaus() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let n = rng.gen_range(4..40);
            // Values from a tiny alphabet give many constant windows.
            let series: Vec<f64> = (0..n).map(|_| f64::from(rng.gen_range(0..2))).collect();
            let m = rng.gen_range(2..=n);
            let raw: Vec<f64> = (0..m).map(|_| f64::from(rng.gen_range(0..2))).collect();
            let s = shapelet(&raw);
            let fast = sliding_distance(&series, &s).value();
            let slow = brute_force_distance(&series, &s).value();
            assert!((fast - slow).abs() < 1e-9);
        }
    }
}
