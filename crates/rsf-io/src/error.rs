//! I/O error types for rsf-io.

use std::path::PathBuf;

/// Errors from dataset reading, label encoding, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a line of an opened file cannot be read or is not valid UTF-8.
    #[error("failed to read line {line} of {path}")]
    ReadFile {
        /// File being read.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a multivariate dataset directory cannot be listed.
    #[error("cannot read directory {path}")]
    ReadDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the data file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a file (or directory) holds zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the data file or directory.
        path: PathBuf,
    },

    /// Returned when a row has a label but no values after stripping padding.
    #[error("row {row_index} in {path} has no values")]
    EmptySeries {
        /// Path to the data file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when a value is unparseable, or NaN/Inf before the end of the row.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the data file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based value column (the label column excluded).
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the dimension files of a multivariate dataset disagree on row count.
    #[error("dimension file {path} has {got} rows, expected {expected}")]
    DimensionRowCount {
        /// The disagreeing dimension file.
        path: PathBuf,
        /// Rows in the first dimension file.
        expected: usize,
        /// Rows in this file.
        got: usize,
    },

    /// Returned when dimension files disagree on the label of a row.
    #[error("row {row_index} of {path} has label \"{got}\", expected \"{expected}\"")]
    LabelDisagreement {
        /// The disagreeing dimension file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Label in the first dimension file.
        expected: String,
        /// Label in this file.
        got: String,
    },

    /// Returned when a label is not among the known class labels.
    #[error("label \"{label}\" at row {row_index} is not a known class")]
    UnknownLabel {
        /// Zero-based row index.
        row_index: usize,
        /// The unknown label.
        label: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be serialized to JSON.
    #[error("cannot serialize {path}")]
    Serialize {
        /// Destination path of the artifact.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
