//! Trained artifacts served by the API.
//!
//! The training pipeline exports two JSON documents: a regression model and a
//! menu label encoder. Both are validated once at load time so that
//! prediction never has to re-check their structure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{ArtifactError, ArtifactResult};

/// Number of columns the model was trained on.
pub const FEATURE_COUNT: usize = 4;

/// Column order used at training time.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["day_of_week", "is_weekend", "prev_day_sales", "menu_encoded"];

pub type FeatureRow = [f64; FEATURE_COUNT];

/// Anything that can turn a batch of feature rows into continuous predictions.
///
/// Implementations return exactly one value per input row.
pub trait Regressor: Send + Sync {
    fn predict(&self, batch: &[FeatureRow]) -> Vec<f64>;
}

/// Serialized model, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

/// Mean of independent regression trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<RegressionTree>,
}

/// Flat node array; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go left when `row[feature] <= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl ModelArtifact {
    /// Load and validate a model artifact from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ArtifactResult<Self> {
        let model: ModelArtifact = read_json(path.as_ref())?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> ArtifactResult<()> {
        match self {
            ModelArtifact::Linear(linear) => linear.validate(),
            ModelArtifact::TreeEnsemble(ensemble) => ensemble.validate(),
        }
    }
}

impl Regressor for ModelArtifact {
    fn predict(&self, batch: &[FeatureRow]) -> Vec<f64> {
        match self {
            ModelArtifact::Linear(linear) => linear.predict(batch),
            ModelArtifact::TreeEnsemble(ensemble) => ensemble.predict(batch),
        }
    }
}

fn validate_feature_names(names: Option<&Vec<String>>) -> ArtifactResult<()> {
    let Some(names) = names else {
        return Ok(());
    };
    if names.iter().map(String::as_str).ne(FEATURE_NAMES) {
        return Err(ArtifactError::InvalidModel(format!(
            "model was trained on features {:?}, expected {:?}",
            names, FEATURE_NAMES
        )));
    }
    Ok(())
}

impl LinearModel {
    pub fn validate(&self) -> ArtifactResult<()> {
        validate_feature_names(self.feature_names.as_ref())?;
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(ArtifactError::InvalidModel(format!(
                "linear model has {} coefficients, expected {}",
                self.coefficients.len(),
                FEATURE_COUNT
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::InvalidModel(
                "linear model contains non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

impl Regressor for LinearModel {
    fn predict(&self, batch: &[FeatureRow]) -> Vec<f64> {
        batch
            .iter()
            .map(|row| {
                self.intercept
                    + self
                        .coefficients
                        .iter()
                        .zip(row.iter())
                        .map(|(coef, x)| coef * x)
                        .sum::<f64>()
            })
            .collect()
    }
}

impl TreeEnsemble {
    pub fn validate(&self) -> ArtifactResult<()> {
        validate_feature_names(self.feature_names.as_ref())?;
        if self.trees.is_empty() {
            return Err(ArtifactError::InvalidModel(
                "tree ensemble has no trees".to_string(),
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|msg| ArtifactError::InvalidModel(format!("tree {}: {}", i, msg)))?;
        }
        Ok(())
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, batch: &[FeatureRow]) -> Vec<f64> {
        let n_trees = self.trees.len() as f64;
        batch
            .iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect()
    }
}

impl RegressionTree {
    /// Children must point strictly forward, which rules out cycles and
    /// guarantees traversal terminates.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("node {} splits on unknown feature {}", idx, feature));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has a non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &FeatureRow) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncoderArtifact {
    classes: Vec<String>,
}

/// Bidirectional mapping between menu names and their integer codes.
///
/// A label's code is its position in `classes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "EncoderArtifact")]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl TryFrom<EncoderArtifact> for LabelEncoder {
    type Error = ArtifactError;

    fn try_from(artifact: EncoderArtifact) -> ArtifactResult<Self> {
        LabelEncoder::from_classes(artifact.classes)
    }
}

impl LabelEncoder {
    pub fn from_classes<I, S>(classes: I) -> ArtifactResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        if classes.is_empty() {
            return Err(ArtifactError::InvalidEncoder("encoder has no classes".to_string()));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (code, label) in classes.iter().enumerate() {
            if label.is_empty() {
                return Err(ArtifactError::InvalidEncoder(format!(
                    "class {} is an empty label",
                    code
                )));
            }
            let code = u32::try_from(code)
                .map_err(|_| ArtifactError::InvalidEncoder("too many classes".to_string()))?;
            if codes.insert(label.clone(), code).is_some() {
                return Err(ArtifactError::InvalidEncoder(format!(
                    "duplicate class '{}'",
                    label
                )));
            }
        }

        Ok(Self { classes, codes })
    }

    /// Load and validate an encoder artifact from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ArtifactResult<Self> {
        read_json(path.as_ref())
    }

    pub fn encode(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// The model and encoder, loaded together and never mutated afterwards.
pub struct Artifacts {
    model: Box<dyn Regressor>,
    encoder: LabelEncoder,
}

impl Artifacts {
    pub fn new(model: impl Regressor + 'static, encoder: LabelEncoder) -> Self {
        Self {
            model: Box::new(model),
            encoder,
        }
    }

    /// Load both artifacts. Either one failing fails the whole load.
    pub fn load(model_path: impl AsRef<Path>, encoder_path: impl AsRef<Path>) -> ArtifactResult<Self> {
        let model = ModelArtifact::load(model_path)?;
        let encoder = LabelEncoder::load(encoder_path)?;
        Ok(Self::new(model, encoder))
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ArtifactResult<T> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn weekend_tree() -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: 10.0 },
                TreeNode::Leaf { value: 14.0 },
            ],
        }
    }

    #[test]
    fn test_encoder_round_trips_known_labels() {
        let encoder = LabelEncoder::from_classes(["Baguette", "Croissant", "Donut"]).unwrap();
        assert_eq!(encoder.encode("Croissant"), Some(1));
        assert_eq!(encoder.decode(2), Some("Donut"));
        assert_eq!(encoder.len(), 3);
    }

    #[test]
    fn test_encoder_unknown_label_is_none() {
        let encoder = LabelEncoder::from_classes(["Croissant"]).unwrap();
        assert_eq!(encoder.encode("croissant"), None);
        assert_eq!(encoder.encode("Unknown Item"), None);
        assert_eq!(encoder.decode(1), None);
    }

    #[test]
    fn test_encoder_rejects_duplicates_and_empty() {
        assert!(matches!(
            LabelEncoder::from_classes(["Donut", "Donut"]),
            Err(ArtifactError::InvalidEncoder(_))
        ));
        assert!(LabelEncoder::from_classes(Vec::<String>::new()).is_err());
        assert!(LabelEncoder::from_classes(["Donut", ""]).is_err());
    }

    #[test]
    fn test_linear_prediction() {
        let model = LinearModel {
            feature_names: None,
            coefficients: vec![1.0, 2.0, 0.5, 0.0],
            intercept: 3.0,
        };
        let out = model.predict(&[[5.0, 1.0, 10.0, 7.0]]);
        assert_eq!(out, vec![15.0]);
    }

    #[test]
    fn test_linear_rejects_wrong_coefficient_count() {
        let model = ModelArtifact::Linear(LinearModel {
            feature_names: None,
            coefficients: vec![1.0, 2.0, 3.0],
            intercept: 0.0,
        });
        assert!(matches!(model.validate(), Err(ArtifactError::InvalidModel(_))));
    }

    #[test]
    fn test_feature_name_mismatch_rejected() {
        let model = LinearModel {
            feature_names: Some(
                ["is_weekend", "day_of_week", "prev_day_sales", "menu_encoded"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            coefficients: vec![0.0; FEATURE_COUNT],
            intercept: 0.0,
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_tree_ensemble_averages_trees() {
        let ensemble = TreeEnsemble {
            feature_names: None,
            trees: vec![
                weekend_tree(),
                RegressionTree {
                    nodes: vec![TreeNode::Leaf { value: 20.0 }],
                },
            ],
        };
        ensemble.validate().unwrap();
        let out = ensemble.predict(&[[0.0, 0.0, 5.0, 1.0], [5.0, 1.0, 5.0, 1.0]]);
        assert_eq!(out, vec![15.0, 17.0]);
    }

    #[test]
    fn test_tree_split_goes_left_on_equal_threshold() {
        let tree = weekend_tree();
        assert_eq!(tree.predict_row(&[0.0, 0.5, 0.0, 0.0]), 10.0);
    }

    #[test]
    fn test_tree_rejects_backward_or_out_of_bounds_children() {
        let backward = RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        assert!(backward.validate().is_err());

        let dangling = RegressionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 1,
                right: 2,
            }],
        };
        assert!(dangling.validate().is_err());

        let bad_feature = RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 4,
                    threshold: 1.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
            ],
        };
        assert!(bad_feature.validate().is_err());
    }

    #[test]
    fn test_load_tree_ensemble_from_json() {
        let file = write_temp(
            r#"{
                "kind": "tree_ensemble",
                "feature_names": ["day_of_week", "is_weekend", "prev_day_sales", "menu_encoded"],
                "trees": [{ "nodes": [
                    { "feature": 1, "threshold": 0.5, "left": 1, "right": 2 },
                    { "value": 10.0 },
                    { "value": 14.0 }
                ]}]
            }"#,
        );
        let model = ModelArtifact::load(file.path()).unwrap();
        assert!(matches!(model, ModelArtifact::TreeEnsemble(_)));
        assert_eq!(model.predict(&[[5.0, 1.0, 3.0, 0.0]]), vec![14.0]);
    }

    #[test]
    fn test_load_encoder_validates_classes() {
        let good = write_temp(r#"{ "classes": ["Baguette", "Croissant"] }"#);
        let encoder = LabelEncoder::load(good.path()).unwrap();
        assert_eq!(encoder.encode("Baguette"), Some(0));

        let dup = write_temp(r#"{ "classes": ["Baguette", "Baguette"] }"#);
        assert!(matches!(
            LabelEncoder::load(dup.path()),
            Err(ArtifactError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Artifacts::load("/nonexistent/single_model.json", "/nonexistent/menu_encoder.json")
            .err()
            .unwrap();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    const VALID_MODEL: &str =
        r#"{ "kind": "linear", "coefficients": [0.0, 6.0, 1.0, 0.0], "intercept": 2.0 }"#;
    const VALID_ENCODER: &str = r#"{ "classes": ["Baguette", "Croissant"] }"#;

    #[test]
    fn test_load_fails_when_only_encoder_is_bad() {
        let model = write_temp(VALID_MODEL);
        let encoder = write_temp(VALID_ENCODER);
        assert!(Artifacts::load(model.path(), encoder.path()).is_ok());

        let missing = Artifacts::load(model.path(), "/nonexistent/menu_encoder.json")
            .err()
            .unwrap();
        assert!(matches!(missing, ArtifactError::Io { .. }));

        let empty = write_temp(r#"{ "classes": [] }"#);
        let invalid = Artifacts::load(model.path(), empty.path()).err().unwrap();
        assert!(matches!(invalid, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_load_fails_when_only_model_is_bad() {
        let encoder = write_temp(VALID_ENCODER);

        let short = write_temp(r#"{ "kind": "linear", "coefficients": [1.0] }"#);
        let err = Artifacts::load(short.path(), encoder.path()).err().unwrap();
        assert!(matches!(err, ArtifactError::InvalidModel(_)));

        let garbage = write_temp("not json");
        let err = Artifacts::load(garbage.path(), encoder.path()).err().unwrap();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }
}
