//! Domain types for rsf-io.

use std::cmp::Ordering;

use rsf_series::MultivariateTimeSeries;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping between raw class labels and zero-based class ordinals.
///
/// When every label parses as a number, classes are ordered numerically and
/// matched by value (`"1"` and `"1.0"` are the same class). Otherwise they
/// are ordered and matched as strings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassLabels {
    names: Vec<String>,
    #[serde(skip)]
    numeric: Option<Vec<f64>>,
}

impl ClassLabels {
    /// Collect the distinct labels of `raw`, sorted.
    #[must_use]
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Self {
        let parsed: Option<Vec<f64>> = raw.iter().map(|s| s.as_ref().trim().parse::<f64>().ok()).collect();

        match parsed {
            Some(values) if values.iter().all(|v| v.is_finite()) => {
                let mut pairs: Vec<(f64, &str)> = values
                    .iter()
                    .copied()
                    .zip(raw.iter().map(AsRef::as_ref))
                    .collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
                pairs.dedup_by(|a, b| a.0 == b.0);
                Self {
                    names: pairs.iter().map(|(_, s)| s.trim().to_string()).collect(),
                    numeric: Some(pairs.iter().map(|(v, _)| *v).collect()),
                }
            }
            _ => {
                let mut names: Vec<String> = raw.iter().map(|s| s.as_ref().trim().to_string()).collect();
                names.sort();
                names.dedup();
                Self { names, numeric: None }
            }
        }
    }

    /// Return the ordinal of `label`, if known.
    #[must_use]
    pub fn ordinal(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        match &self.numeric {
            Some(values) => {
                let value: f64 = label.parse().ok()?;
                values
                    .binary_search_by(|v| v.partial_cmp(&value).unwrap_or(Ordering::Less))
                    .ok()
            }
            None => self.names.binary_search_by(|n| n.as_str().cmp(label)).ok(),
        }
    }

    /// Encode every raw label as an ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownLabel`] for the first label not in this set.
    pub fn encode<S: AsRef<str>>(&self, raw: &[S]) -> Result<Vec<usize>, IoError> {
        raw.iter()
            .enumerate()
            .map(|(row_index, label)| {
                self.ordinal(label.as_ref()).ok_or_else(|| IoError::UnknownLabel {
                    row_index,
                    label: label.as_ref().to_string(),
                })
            })
            .collect()
    }

    /// Return the label name of `ordinal`.
    #[must_use]
    pub fn name(&self, ordinal: usize) -> Option<&str> {
        self.names.get(ordinal).map(String::as_str)
    }

    /// Return every label name in ordinal order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` if there are no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A labelled dataset of (possibly multivariate) time series.
///
/// Produced by [`UcrReader`](crate::UcrReader) and
/// [`MultivariateReader`](crate::MultivariateReader). `examples[i]` carries
/// raw label `raw_labels[i]` and ordinal `labels[i]`.
#[derive(Debug, Clone)]
pub struct Dataset {
    examples: Vec<MultivariateTimeSeries>,
    raw_labels: Vec<String>,
    labels: Vec<usize>,
    classes: ClassLabels,
}

impl Dataset {
    /// Build a dataset whose classes are the distinct raw labels.
    pub(crate) fn new(examples: Vec<MultivariateTimeSeries>, raw_labels: Vec<String>) -> Result<Self, IoError> {
        let classes = ClassLabels::from_raw(&raw_labels);
        let labels = classes.encode(&raw_labels)?;
        Ok(Self {
            examples,
            raw_labels,
            labels,
            classes,
        })
    }

    /// Re-encode the labels with another class mapping, e.g. the training
    /// set's when this is a test set.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownLabel`] if a label is not in `classes`.
    pub fn with_classes(self, classes: &ClassLabels) -> Result<Self, IoError> {
        let labels = classes.encode(&self.raw_labels)?;
        Ok(Self {
            labels,
            classes: classes.clone(),
            ..self
        })
    }

    /// Return the examples.
    #[must_use]
    pub fn examples(&self) -> &[MultivariateTimeSeries] {
        &self.examples
    }

    /// Return the class ordinals, parallel to [`Dataset::examples`].
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the raw labels as read from disk.
    #[must_use]
    pub fn raw_labels(&self) -> &[String] {
        &self.raw_labels
    }

    /// Return the class mapping.
    #[must_use]
    pub fn classes(&self) -> &ClassLabels {
        &self.classes
    }

    /// Return the number of examples.
    #[must_use]
    pub fn n_examples(&self) -> usize {
        self.examples.len()
    }

    /// Return the largest dimension count over all examples.
    #[must_use]
    pub fn n_dimensions(&self) -> usize {
        self.examples
            .iter()
            .map(MultivariateTimeSeries::n_dimensions)
            .max()
            .unwrap_or(0)
    }
}
