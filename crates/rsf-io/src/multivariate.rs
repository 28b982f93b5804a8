//! Multivariate dataset reader: one UCR-format file per dimension.

use std::fs;
use std::path::{Path, PathBuf};

use rsf_series::MultivariateTimeSeries;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ClassLabels, Dataset};
use crate::reader::{Delimiter, Row, UcrReader};

/// Reads a multivariate dataset from a directory.
///
/// Every regular file in the directory, sorted by file name, is one
/// dimension in UCR format. Row `i` of each file belongs to example `i`,
/// and all files must agree on its label. A dimension is named after its
/// file stem.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::ReadDir`] | The directory cannot be listed |
/// | [`IoError::EmptyDataset`] | The directory has no files |
/// | [`IoError::DimensionRowCount`] | Files differ in row count |
/// | [`IoError::LabelDisagreement`] | Files differ in the label of a row |
/// | Any [`UcrReader`] error | From reading a dimension file |
pub struct MultivariateReader {
    dir: PathBuf,
    delimiter: Delimiter,
}

impl MultivariateReader {
    /// Create a new reader for the given directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            delimiter: Delimiter::default(),
        }
    }

    /// Set the column separator used by every dimension file.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read every dimension file and zip them into multivariate examples.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let files = self.dimension_files()?;
        if files.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.dir.clone(),
            });
        }

        let mut names = Vec::with_capacity(files.len());
        let mut per_dimension: Vec<Vec<Row>> = Vec::with_capacity(files.len());
        for path in &files {
            let rows = UcrReader::new(path).with_delimiter(self.delimiter).read_rows()?;
            if let Some(first) = per_dimension.first() {
                check_agreement(path, first, &rows)?;
            }
            debug!(path = %path.display(), n_rows = rows.len(), "dimension read");
            let name = path
                .file_stem()
                .map_or_else(|| format!("dim{}", names.len()), |s| s.to_string_lossy().into_owned());
            names.push(name);
            per_dimension.push(rows);
        }

        let n_examples = per_dimension[0].len();
        let raw_labels: Vec<String> = per_dimension[0].iter().map(|(label, _)| label.clone()).collect();
        let mut columns: Vec<_> = per_dimension.into_iter().map(Vec::into_iter).collect();

        let mut examples = Vec::with_capacity(n_examples);
        for _ in 0..n_examples {
            let dimensions = columns
                .iter_mut()
                .filter_map(|rows| rows.next().map(|(_, series)| series))
                .collect();
            let example = MultivariateTimeSeries::with_names(dimensions, names.clone())
                .map_err(|_| IoError::EmptyDataset {
                    path: self.dir.clone(),
                })?;
            examples.push(example);
        }

        let dataset = Dataset::new(examples, raw_labels)?;
        info!(
            n_examples = dataset.n_examples(),
            n_dimensions = names.len(),
            n_classes = dataset.classes().len(),
            "multivariate dataset loaded"
        );
        Ok(dataset)
    }

    /// Regular files of the directory, sorted by name.
    fn dimension_files(&self) -> Result<Vec<PathBuf>, IoError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| IoError::ReadDir {
            path: self.dir.clone(),
            source: e,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IoError::ReadDir {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn check_agreement(path: &Path, first: &[Row], rows: &[Row]) -> Result<(), IoError> {
    if first.len() != rows.len() {
        return Err(IoError::DimensionRowCount {
            path: path.to_path_buf(),
            expected: first.len(),
            got: rows.len(),
        });
    }
    // Labels agree when they name the same class, so "1" matches "1.0".
    let classes = ClassLabels::from_raw(&first.iter().map(|(label, _)| label.as_str()).collect::<Vec<_>>());
    for (row_index, ((expected, _), (got, _))) in first.iter().zip(rows).enumerate() {
        if classes.ordinal(expected) != classes.ordinal(got) {
            return Err(IoError::LabelDisagreement {
                path: path.to_path_buf(),
                row_index,
                expected: expected.clone(),
                got: got.clone(),
            });
        }
    }
    Ok(())
}
