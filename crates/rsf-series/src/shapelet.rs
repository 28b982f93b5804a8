//! Shapelets and patterns: normalized subsequences cut out of training series.

use crate::distance::{ShapeletDistance, sliding_distance};
use crate::error::SeriesError;
use crate::normalize::{is_constant, magnitude_order, z_normalize};
use crate::series::{MultivariateTimeSeries, TimeSeries};

/// Shortest subsequence that can form a shapelet.
pub const MIN_SHAPELET_LEN: usize = 2;

/// A z-normalized copy of a contiguous subsequence of a time series.
///
/// The values are copied at extraction time, so a shapelet stays valid
/// after its source series is dropped.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Shapelet {
    start: usize,
    values: Vec<f64>,
    #[serde(skip)]
    order: Vec<usize>,
    constant: bool,
}

impl Shapelet {
    /// Extract `series[start..start + length]`, z-normalize it and precompute
    /// its magnitude order.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidWindow`] when `length < 2` or the window
    /// does not fit inside `series`.
    pub fn extract(series: &TimeSeries, start: usize, length: usize) -> Result<Self, SeriesError> {
        let series_len = series.len();
        if length < MIN_SHAPELET_LEN || start + length > series_len {
            return Err(SeriesError::InvalidWindow {
                start,
                length,
                series_len,
            });
        }
        let window = &series.as_slice()[start..start + length];
        Ok(Self::from_window(start, window))
    }

    pub(crate) fn from_window(start: usize, window: &[f64]) -> Self {
        let values = z_normalize(window);
        let order = magnitude_order(&values);
        Self {
            start,
            values,
            order,
            constant: is_constant(window),
        }
    }

    /// Offset of the first value in the source series.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; shapelets hold at least two values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The z-normalized values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value indices sorted by descending absolute normalized value.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// True if the source window was constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.constant
    }
}

/// A shapelet bound to the dimension it must be compared against.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Pattern {
    shapelet: Shapelet,
    dimension: usize,
}

impl Pattern {
    /// Bind `shapelet` to `dimension`.
    #[must_use]
    pub fn new(shapelet: Shapelet, dimension: usize) -> Self {
        Self {
            shapelet,
            dimension,
        }
    }

    /// The shapelet.
    #[must_use]
    pub fn shapelet(&self) -> &Shapelet {
        &self.shapelet
    }

    /// The dimension index.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Sliding distance between this pattern and the matching dimension of `example`.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::DimensionOutOfRange`] when `example` lacks the dimension.
    pub fn distance(&self, example: &MultivariateTimeSeries) -> Result<ShapeletDistance, SeriesError> {
        let series = example.dimension(self.dimension)?;
        Ok(sliding_distance(series.as_slice(), &self.shapelet))
    }
}
