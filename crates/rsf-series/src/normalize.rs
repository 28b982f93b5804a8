//! Z-normalization of subsequences and per-window statistics for sliding comparisons.

/// Population mean and standard deviation of `values` (divides by n, not n-1).
///
/// Returns `(0.0, 0.0)` for an empty slice.
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Return true if every value equals the first one.
#[must_use]
pub fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Z-normalize a subsequence to zero mean and unit variance.
///
/// A constant subsequence normalizes to all zeros.
#[must_use = "returns a new normalized vector; the input is unchanged"]
pub fn z_normalize(values: &[f64]) -> Vec<f64> {
    if is_constant(values) {
        return vec![0.0; values.len()];
    }
    let (mean, std) = mean_std(values);
    values.iter().map(|&x| (x - mean) / std).collect()
}

/// Indices of `values` ordered by descending absolute value.
///
/// Ties keep their positional order, so the ordering is deterministic.
#[must_use]
pub fn magnitude_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].abs().total_cmp(&values[a].abs()));
    order
}

/// Per-window mean/std queries over a series, with constant runs
/// precomputed so constant windows are detected in O(1).
///
/// Each window's statistics are computed in two passes over that window
/// alone, so a window far from the series mean keeps full precision.
#[derive(Debug, Clone)]
pub(crate) struct WindowStats<'a> {
    values: &'a [f64],
    // run_end[i]: last index j >= i with values[i..=j] all equal.
    run_end: Vec<usize>,
}

impl<'a> WindowStats<'a> {
    pub(crate) fn new(values: &'a [f64]) -> Self {
        let n = values.len();
        let mut run_end = vec![0usize; n];
        for i in (0..n).rev() {
            run_end[i] = if i + 1 < n && values[i + 1] == values[i] {
                run_end[i + 1]
            } else {
                i
            };
        }
        Self { values, run_end }
    }

    /// Mean and population std of `values[start..start + len]`, or `None`
    /// when the window is constant.
    pub(crate) fn window(&self, start: usize, len: usize) -> Option<(f64, f64)> {
        if self.run_end[start] >= start + len - 1 {
            return None;
        }
        let (mean, std) = mean_std(&self.values[start..start + len]);
        if std == 0.0 {
            return None;
        }
        Some((mean, std))
    }
}
