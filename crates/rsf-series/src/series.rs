//! Time series types with validation guarantees.

use std::ops::Index;

use crate::error::SeriesError;

/// Owned, validated time series. Guaranteed non-empty with all finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries(Vec<f64>);

impl TimeSeries {
    /// Create a new time series, validating that it is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::EmptySeries`] | `values` is empty |
    /// | [`SeriesError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(values: Vec<f64>) -> Result<Self, SeriesError> {
        if values.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(SeriesError::NonFiniteValue { index });
        }
        Ok(Self(values))
    }

    /// Return the number of time steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the series has no time steps.
    ///
    /// Always `false` for instances built through [`TimeSeries::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consume and return the inner vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Index<usize> for TimeSeries {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[f64]> for TimeSeries {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = SeriesError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

/// An example made of one or more named dimensions.
///
/// Dimensions are ordered and need not share a length. A univariate series
/// is a multivariate series with a single dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateTimeSeries {
    dimensions: Vec<TimeSeries>,
    names: Vec<String>,
}

impl MultivariateTimeSeries {
    /// Build a multivariate series with positional names (`"0"`, `"1"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::NoDimensions`] if `dimensions` is empty.
    pub fn new(dimensions: Vec<TimeSeries>) -> Result<Self, SeriesError> {
        let names = (0..dimensions.len()).map(|d| d.to_string()).collect();
        Self::with_names(dimensions, names)
    }

    /// Build a multivariate series with explicit dimension names.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NoDimensions`] | `dimensions` is empty |
    /// | [`SeriesError::DimensionNameCount`] | `names.len() != dimensions.len()` |
    pub fn with_names(dimensions: Vec<TimeSeries>, names: Vec<String>) -> Result<Self, SeriesError> {
        if dimensions.is_empty() {
            return Err(SeriesError::NoDimensions);
        }
        if names.len() != dimensions.len() {
            return Err(SeriesError::DimensionNameCount {
                names: names.len(),
                dimensions: dimensions.len(),
            });
        }
        Ok(Self { dimensions, names })
    }

    /// Return the number of dimensions.
    #[must_use]
    pub fn n_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Borrow one dimension.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::DimensionOutOfRange`] if the dimension does not exist.
    pub fn dimension(&self, dimension: usize) -> Result<&TimeSeries, SeriesError> {
        self.dimensions
            .get(dimension)
            .ok_or(SeriesError::DimensionOutOfRange {
                dimension,
                n_dimensions: self.dimensions.len(),
            })
    }

    /// Borrow all dimensions in order.
    #[must_use]
    pub fn dimensions(&self) -> &[TimeSeries] {
        &self.dimensions
    }

    /// Return the dimension names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl From<TimeSeries> for MultivariateTimeSeries {
    fn from(series: TimeSeries) -> Self {
        Self {
            dimensions: vec![series],
            names: vec!["0".to_string()],
        }
    }
}
