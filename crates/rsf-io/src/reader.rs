//! UCR-format time series reader with full input validation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rsf_series::{MultivariateTimeSeries, TimeSeries};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::Dataset;

/// Column separator of a UCR data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Runs of spaces or tabs (the classic "Matlab" layout).
    #[default]
    Whitespace,
    /// A single comma.
    Comma,
    /// A single tab.
    Tab,
}

/// One parsed row: raw label and its values.
pub(crate) type Row = (String, TimeSeries);

/// Reads a univariate dataset in UCR format.
///
/// Expected format:
/// - No header row
/// - Column 0 is the class label, remaining columns are time steps
/// - Rows may differ in length; trailing `NaN` cells are padding and dropped
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or can't be opened |
/// | [`IoError::ReadFile`] | A line fails to read or is not UTF-8 (whitespace layout) |
/// | [`IoError::CsvParse`] | Malformed record (comma and tab layouts) |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | [`IoError::EmptySeries`] | A row has a label but no values |
/// | [`IoError::NonFiniteValue`] | Unparseable value, or NaN/Inf before the padding |
pub struct UcrReader {
    path: PathBuf,
    delimiter: Delimiter,
}

impl UcrReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: Delimiter::default(),
        }
    }

    /// Set the column separator.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read and validate the file, returning a univariate [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let rows = self.read_rows()?;

        let (raw_labels, examples): (Vec<String>, Vec<MultivariateTimeSeries>) = rows
            .into_iter()
            .map(|(label, series)| (label, MultivariateTimeSeries::from(series)))
            .unzip();

        let dataset = Dataset::new(examples, raw_labels)?;
        info!(
            n_examples = dataset.n_examples(),
            n_classes = dataset.classes().len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Read every row as `(label, series)`, in file order.
    pub(crate) fn read_rows(&self) -> Result<Vec<Row>, IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let records = match self.delimiter {
            Delimiter::Whitespace => self.whitespace_records(file)?,
            Delimiter::Comma => self.csv_records(file, b',')?,
            Delimiter::Tab => self.csv_records(file, b'\t')?,
        };

        let mut rows = Vec::with_capacity(records.len());
        for (row_index, record) in records.iter().enumerate() {
            let Some((label, cells)) = record.split_first() else {
                continue;
            };
            let series = self.parse_values(row_index, cells)?;
            rows.push((label.clone(), series));
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        debug!(
            n_rows = rows.len(),
            max_len = rows.iter().map(|(_, s)| s.len()).max().unwrap_or(0),
            "rows parsed"
        );
        Ok(rows)
    }

    fn whitespace_records(&self, file: File) -> Result<Vec<Vec<String>>, IoError> {
        let mut records = Vec::new();
        for (line_index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| IoError::ReadFile {
                path: self.path.clone(),
                line: line_index + 1,
                source: e,
            })?;
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if !fields.is_empty() {
                records.push(fields);
            }
        }
        Ok(records)
    }

    fn csv_records(&self, file: File, delimiter: u8) -> Result<Vec<Vec<String>>, IoError> {
        // flexible(true): variable-length rows are legal in this format.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(delimiter)
            .from_reader(file);

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            if fields.iter().any(|f| !f.is_empty()) {
                records.push(fields);
            }
        }
        Ok(records)
    }

    /// Parse value cells, dropping trailing empty or NaN padding.
    fn parse_values(&self, row_index: usize, cells: &[String]) -> Result<TimeSeries, IoError> {
        let mut values = Vec::with_capacity(cells.len());
        for (col_index, raw) in cells.iter().enumerate() {
            let value: f64 = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse().map_err(|_| IoError::NonFiniteValue {
                    path: self.path.clone(),
                    row_index,
                    col_index,
                    raw: raw.clone(),
                })?
            };
            values.push(value);
        }

        while values.last().is_some_and(|v| v.is_nan()) {
            values.pop();
        }

        if let Some(col_index) = values.iter().position(|v| !v.is_finite()) {
            return Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                col_index,
                raw: cells[col_index].clone(),
            });
        }

        TimeSeries::new(values).map_err(|_| IoError::EmptySeries {
            path: self.path.clone(),
            row_index,
        })
    }
}
