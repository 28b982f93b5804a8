//! JSON result writer for evaluation and shapelet reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rsf_forest::{ClassMetrics, EvaluationResult, FoldResult, PatternForestConfig, RandomPatternForest};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ClassLabels, ExperimentName};

/// Writes evaluation results and forest shapelets to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluation.json` and
/// `{experiment}_shapelets.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write an evaluation result to `{experiment}_evaluation.json`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        config: &PatternForestConfig,
        classes: &ClassLabels,
        result: &EvaluationResult,
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("evaluation");

        let artifact = EvaluationArtifact {
            experiment: self.experiment.as_str(),
            parameters: config,
            classes: classes.names(),
            n_folds: result.folds().len(),
            mean_measures: result.mean_measures(),
            std_accuracy: result.std_accuracy(),
            mean_fit_time_ms: result.mean_fit_time_ms(),
            mean_predict_time_ms: result.mean_predict_time_ms(),
            confusion_matrix: result.confusion_matrix().as_rows(),
            class_metrics: result.confusion_matrix().class_metrics(),
            folds: result.folds(),
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }

    /// Write every shapelet used by `forest` to `{experiment}_shapelets.json`.
    ///
    /// `dimension_names` labels the dimension of each pattern; patterns whose
    /// dimension has no name are written without one.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all)]
    pub fn write_shapelets(
        &self,
        forest: &RandomPatternForest,
        dimension_names: &[String],
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("shapelets");

        let shapelets: Vec<ShapeletEntry> = forest
            .trees()
            .iter()
            .enumerate()
            .flat_map(|(tree, t)| {
                t.branch_patterns().into_iter().map(move |pattern| {
                    let shapelet = pattern.shapelet();
                    ShapeletEntry {
                        tree,
                        dimension: pattern.dimension(),
                        dimension_name: dimension_names.get(pattern.dimension()).map(String::as_str),
                        start: shapelet.start(),
                        length: shapelet.len(),
                        values: shapelet.values(),
                    }
                })
            })
            .collect();

        let artifact = ShapeletArtifact {
            experiment: self.experiment.as_str(),
            n_trees: forest.n_trees(),
            n_shapelets: shapelets.len(),
            shapelets,
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), n_shapelets = artifact.n_shapelets, "shapelets written");
        Ok(path)
    }

    fn artifact_path(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }
}

fn write_json(path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, &json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluationArtifact<'a> {
    experiment: &'a str,
    parameters: &'a PatternForestConfig,
    classes: &'a [String],
    n_folds: usize,
    mean_measures: BTreeMap<String, f64>,
    std_accuracy: f64,
    mean_fit_time_ms: f64,
    mean_predict_time_ms: f64,
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassMetrics>,
    folds: &'a [FoldResult],
}

#[derive(Serialize)]
struct ShapeletArtifact<'a> {
    experiment: &'a str,
    n_trees: usize,
    n_shapelets: usize,
    shapelets: Vec<ShapeletEntry<'a>>,
}

#[derive(Serialize)]
struct ShapeletEntry<'a> {
    tree: usize,
    dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension_name: Option<&'a str>,
    start: usize,
    length: usize,
    values: &'a [f64],
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsf_forest::{CrossValidation, Holdout};
    use rsf_series::{MultivariateTimeSeries, TimeSeries};
    use tempfile::TempDir;

    fn toy_data() -> (Vec<MultivariateTimeSeries>, Vec<usize>) {
        let mut examples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..12 {
            let class = i % 2;
            let mut values: Vec<f64> = (0..16).map(|t| ((t + i) as f64 * 0.7).sin() * 0.1).collect();
            values[4 + i % 6] += if class == 0 { 2.0 } else { -2.0 };
            examples.push(TimeSeries::new(values).unwrap().into());
            labels.push(class);
        }
        (examples, labels)
    }

    fn small_config() -> PatternForestConfig {
        PatternForestConfig::new(4).unwrap().with_pattern_count(5)
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_evaluation_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("eval_run".into()).unwrap()).unwrap();

        let (examples, labels) = toy_data();
        let config = small_config();
        let result = CrossValidation::new(3)
            .unwrap()
            .evaluate(&config, &examples, &labels)
            .unwrap();
        let classes = ClassLabels::from_raw(&["a", "b"]);

        let path = writer.write_evaluation(&config, &classes, &result).unwrap();
        assert_eq!(path, dir.path().join("eval_run_evaluation.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "eval_run");
        assert_eq!(content["n_folds"], 3);
        assert_eq!(content["parameters"]["n_trees"], 4);
        assert_eq!(content["classes"].as_array().unwrap().len(), 2);
        assert!(content["mean_measures"]["accuracy"].is_number());
        assert!(content["mean_fit_time_ms"].is_number());
        assert_eq!(content["folds"].as_array().unwrap().len(), 3);
        assert_eq!(content["confusion_matrix"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn write_shapelets_lists_every_branch() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("shp".into()).unwrap()).unwrap();

        let (examples, labels) = toy_data();
        let forest = small_config().fit(&examples, &labels).unwrap().into_forest();
        let path = writer.write_shapelets(&forest, &["dim0".to_string()]).unwrap();

        let content = read_json(&path);
        let shapelets = content["shapelets"].as_array().unwrap();
        assert_eq!(shapelets.len(), forest.branch_patterns().len());
        assert_eq!(content["n_trees"], 4);
        for entry in shapelets {
            assert_eq!(entry["dimension_name"], "dim0");
            assert_eq!(
                entry["values"].as_array().unwrap().len() as u64,
                entry["length"].as_u64().unwrap()
            );
        }
    }

    #[test]
    fn writer_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = ResultWriter::new(&nested, ExperimentName::new("nested_test".into()).unwrap()).unwrap();

        let (examples, labels) = toy_data();
        let result = Holdout::new(&examples, &labels)
            .evaluate(&small_config(), &examples, &labels)
            .unwrap();
        writer
            .write_evaluation(&small_config(), &ClassLabels::from_raw(&["0", "1"]), &result)
            .unwrap();

        assert!(nested.join("nested_test_evaluation.json").exists());
    }
}
