//! Dataset readers, label encoding, and JSON reporting for the rsf pipeline.

mod domain;
mod error;
mod multivariate;
mod reader;
mod writer;

pub use domain::{ClassLabels, Dataset, ExperimentName};
pub use error::IoError;
pub use multivariate::MultivariateReader;
pub use reader::{Delimiter, UcrReader};
pub use writer::ResultWriter;
