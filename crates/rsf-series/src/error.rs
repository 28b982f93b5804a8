//! Error types for series construction, shapelet extraction and pattern distance.

/// Errors from time series validation and shapelet operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    /// Returned when an empty slice is provided as a time series.
    #[error("time series must be non-empty")]
    EmptySeries,

    /// Returned when a time series contains NaN, infinity, or negative infinity.
    #[error("time series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when a multivariate series is built from zero dimensions.
    #[error("multivariate series must have at least one dimension")]
    NoDimensions,

    /// Returned when dimension names do not match the number of dimensions.
    #[error("got {names} dimension names for {dimensions} dimensions")]
    DimensionNameCount {
        /// Number of names supplied.
        names: usize,
        /// Number of dimensions supplied.
        dimensions: usize,
    },

    /// Returned when a pattern refers to a dimension the example does not have.
    #[error("dimension {dimension} requested, but the series has {n_dimensions} dimension(s)")]
    DimensionOutOfRange {
        /// The requested dimension.
        dimension: usize,
        /// Number of dimensions in the series.
        n_dimensions: usize,
    },

    /// Returned when a shapelet window does not fit inside its source series.
    #[error("shapelet window [{start}, {start}+{length}) does not fit a series of length {series_len}")]
    InvalidWindow {
        /// Requested start offset.
        start: usize,
        /// Requested shapelet length.
        length: usize,
        /// Length of the source series.
        series_len: usize,
    },
}
