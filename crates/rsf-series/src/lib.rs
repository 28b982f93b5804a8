//! Time series containers, shapelets and the sliding shapelet distance.
//!
//! Pure math library with zero I/O. Provides validated univariate and
//! multivariate series, z-normalized shapelets bound to a dimension
//! ([`Pattern`]), and the early-abandoning sliding-window distance used to
//! route examples through pattern trees.

mod distance;
mod error;
mod normalize;
mod series;
mod shapelet;

pub use distance::{ShapeletDistance, brute_force_distance, sliding_distance};
pub use error::SeriesError;
pub use normalize::{magnitude_order, mean_std, z_normalize};
pub use series::{MultivariateTimeSeries, TimeSeries};
pub use shapelet::{MIN_SHAPELET_LEN, Pattern, Shapelet};
