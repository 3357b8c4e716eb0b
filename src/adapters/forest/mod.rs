//! Random forest adapter: Implementation of StatusPredictor.
//!
//! Loads a forest exported by the offline training pipeline as JSON and
//! scores feature vectors with the same semantics as scikit-learn's
//! `predict_proba`: each tree contributes its normalized leaf distribution,
//! the distributions are averaged, and the label is the argmax.
//!
//! # Label encoding
//!
//! The artifact carries its own `labels` list (index -> label). Each label
//! is resolved to a [`NutritionStatus`] at load time, so the serving code
//! never relies on a hard-coded index mapping. Unknown or repeated labels
//! reject the artifact.
//!
//! # Integrity
//!
//! When `manifest.json` sits next to the model, it must bind `forest.json`
//! by SHA-256 and the digest must match. Without a manifest the model still
//! loads, with a warning. Use the `hash_model` binary to write one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{NutritionStatus, Prediction, PredictorFeatures, FEATURE_NAMES};
use crate::ports::{ModelError, StatusPredictor};

/// File name of the exported forest inside a model directory.
pub const MODEL_FILE: &str = "forest.json";

/// File name of the integrity manifest inside a model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Supported export format.
pub const FORMAT_VERSION: u32 = 1;

/// Forest as written by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedForest {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    /// Class labels in the order of leaf `value` entries
    pub labels: Vec<String>,
    pub trees: Vec<ExportedTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTree {
    /// Node 0 is the root; children always have larger indices than parents
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (sample counts or fractions).
    Leaf { value: Vec<f64> },
}

/// Integrity manifest binding model files to their digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the manifest was written
    pub created_at: i64,
    /// Relative file name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: Vec<f64>,
    },
}

/// Validated forest ready for inference.
#[derive(Debug, Clone)]
pub struct ForestModel {
    statuses: Vec<NutritionStatus>,
    trees: Vec<Vec<Node>>,
}

impl ForestModel {
    /// Load `forest.json` from a model directory (or a direct file path).
    ///
    /// # Errors
    /// Returns `ModelError` if the file is missing, fails the manifest
    /// check, or does not describe a valid forest.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let (base_dir, model_path) = if model_dir.is_file() {
            (
                model_dir.parent().unwrap_or(model_dir),
                model_dir.to_path_buf(),
            )
        } else {
            (model_dir, model_dir.join(MODEL_FILE))
        };

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }

        let bytes = fs::read(&model_path)
            .map_err(|e| ModelError::Read(format!("{}: {e}", model_path.display())))?;

        let file_name = model_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(MODEL_FILE);
        Self::verify_manifest(base_dir, file_name, &bytes)?;

        let model = Self::from_json_slice(&bytes)?;
        tracing::info!(
            "Loaded forest from {:?} (trees={}, labels={:?})",
            model_path,
            model.trees.len(),
            model.statuses
        );
        Ok(model)
    }

    fn verify_manifest(
        base_dir: &Path,
        file_name: &str,
        model_bytes: &[u8],
    ) -> Result<(), ModelError> {
        let manifest_path = base_dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            tracing::warn!(
                "No {} next to model; loading without integrity check",
                MANIFEST_FILE
            );
            return Ok(());
        }

        let content = fs::read(&manifest_path)
            .map_err(|e| ModelError::Read(format!("Failed to read manifest: {e}")))?;
        let manifest: ModelManifest = serde_json::from_slice(&content)
            .map_err(|e| ModelError::Integrity(format!("Invalid manifest format: {e}")))?;

        if manifest.version != 1 {
            return Err(ModelError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }

        let expected = manifest.files.get(file_name).ok_or_else(|| {
            ModelError::Integrity(format!("Manifest does not bind {file_name}"))
        })?;

        if !expected.eq_ignore_ascii_case(&sha256_hex(model_bytes)) {
            return Err(ModelError::Integrity(format!(
                "File hash mismatch for {file_name}"
            )));
        }

        tracing::debug!("Model digest matches manifest");
        Ok(())
    }

    /// Parse and validate an exported forest.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` on malformed JSON or a failed check.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let exported: ExportedForest =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Invalid(e.to_string()))?;
        Self::from_exported(exported)
    }

    /// Validate an exported forest.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the first failed check.
    pub fn from_exported(exported: ExportedForest) -> Result<Self, ModelError> {
        if exported.format_version != FORMAT_VERSION {
            return Err(ModelError::Invalid(format!(
                "Unsupported format_version {} (expected {FORMAT_VERSION})",
                exported.format_version
            )));
        }

        if exported.feature_names != FEATURE_NAMES {
            return Err(ModelError::Invalid(format!(
                "Feature order {:?} does not match {:?}",
                exported.feature_names, FEATURE_NAMES
            )));
        }

        let mut statuses = Vec::with_capacity(exported.labels.len());
        for label in &exported.labels {
            let status = NutritionStatus::from_model_label(label)
                .ok_or_else(|| ModelError::Invalid(format!("Unknown label '{label}'")))?;
            if statuses.contains(&status) {
                return Err(ModelError::Invalid(format!("Duplicate label '{label}'")));
            }
            statuses.push(status);
        }
        if statuses.is_empty() {
            return Err(ModelError::Invalid("Model has no labels".into()));
        }

        if exported.trees.is_empty() {
            return Err(ModelError::Invalid("Model has no trees".into()));
        }

        let n_classes = statuses.len();
        let trees = exported
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| compile_tree(t, tree, n_classes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { statuses, trees })
    }

    /// Averaged class probabilities, in label order.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` on non-finite features.
    pub fn predict_proba(&self, features: &PredictorFeatures) -> Result<Vec<f64>, ModelError> {
        let x = features.to_vec();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Inference("Non-finite feature value".into()));
        }

        let mut proba = vec![0.0; self.statuses.len()];
        for tree in &self.trees {
            let mut idx = 0;
            loop {
                match &tree[idx] {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        idx = if x[*feature] <= *threshold { *left } else { *right };
                    }
                    Node::Leaf { proba: leaf } => {
                        for (acc, p) in proba.iter_mut().zip(leaf) {
                            *acc += p;
                        }
                        break;
                    }
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        Ok(proba)
    }

    /// Statuses in label-index order, as declared by the artifact.
    #[must_use]
    pub fn labels(&self) -> &[NutritionStatus] {
        &self.statuses
    }
}

fn compile_tree(t: usize, tree: ExportedTree, n_classes: usize) -> Result<Vec<Node>, ModelError> {
    let n_nodes = tree.nodes.len();
    if n_nodes == 0 {
        return Err(ModelError::Invalid(format!("Tree {t} is empty")));
    }

    tree.nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= FEATURE_NAMES.len() {
                    return Err(ModelError::Invalid(format!(
                        "Tree {t} node {i}: feature index {feature} out of range"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::Invalid(format!(
                        "Tree {t} node {i}: non-finite threshold"
                    )));
                }
                // Children must point forward, which also rules out cycles.
                for child in [left, right] {
                    if child <= i || child >= n_nodes {
                        return Err(ModelError::Invalid(format!(
                            "Tree {t} node {i}: invalid child index {child}"
                        )));
                    }
                }
                Ok(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                })
            }
            TreeNode::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(ModelError::Invalid(format!(
                        "Tree {t} node {i}: expected {n_classes} class weights, got {}",
                        value.len()
                    )));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(ModelError::Invalid(format!(
                        "Tree {t} node {i}: class weights must be finite and non-negative"
                    )));
                }
                let total: f64 = value.iter().sum();
                if total <= 0.0 {
                    return Err(ModelError::Invalid(format!(
                        "Tree {t} node {i}: class weights sum to zero"
                    )));
                }
                Ok(Node::Leaf {
                    proba: value.iter().map(|v| v / total).collect(),
                })
            }
        })
        .collect()
}

impl StatusPredictor for ForestModel {
    fn predict(&self, features: &PredictorFeatures) -> Result<Prediction, ModelError> {
        let proba = self.predict_proba(features)?;

        // First maximum wins on ties, as numpy's argmax does.
        let (best, confidence) = proba
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            });

        Ok(Prediction {
            status: self.statuses[best],
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    fn leaf(value: &[f64]) -> TreeNode {
        TreeNode::Leaf {
            value: value.to_vec(),
        }
    }

    fn exported(labels: &[&str]) -> ExportedForest {
        ExportedForest {
            format_version: FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            trees: vec![
                ExportedTree {
                    nodes: vec![
                        split(2, 80.0, 1, 2),
                        leaf(&[0.0, 2.0, 8.0]),
                        leaf(&[10.0, 0.0, 0.0]),
                    ],
                },
                ExportedTree {
                    nodes: vec![
                        split(1, 9.0, 1, 2),
                        leaf(&[1.0, 1.0, 2.0]),
                        leaf(&[4.0, 0.0, 0.0]),
                    ],
                },
            ],
        }
    }

    fn features(age_years: u32, weight_kg: f64, height_cm: f64) -> PredictorFeatures {
        PredictorFeatures {
            age_years,
            weight_kg,
            height_cm,
        }
    }

    fn write_model(dir: &Path, forest: &ExportedForest) -> Vec<u8> {
        let bytes = serde_json::to_vec(forest).expect("serialize model");
        fs::write(dir.join(MODEL_FILE), &bytes).expect("write model");
        bytes
    }

    fn write_manifest(dir: &Path, digest: String) {
        let manifest = ModelManifest {
            version: 1,
            created_at: 0,
            files: BTreeMap::from([(MODEL_FILE.to_string(), digest)]),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("serialize manifest"),
        )
        .expect("write manifest");
    }

    #[test]
    fn test_predict_averages_trees() {
        let model = ForestModel::from_exported(exported(&["Normal", "Risk", "Stunted"]))
            .expect("Valid forest");

        let proba = model.predict_proba(&features(2, 8.0, 70.0)).expect("Should score");
        assert!((proba[0] - 0.125).abs() < 1e-12);
        assert!((proba[1] - 0.225).abs() < 1e-12);
        assert!((proba[2] - 0.65).abs() < 1e-12);

        let prediction = model.predict(&features(2, 8.0, 70.0)).expect("Should predict");
        assert_eq!(prediction.status, NutritionStatus::Severe);
        assert!((prediction.confidence - 0.65).abs() < 1e-12);

        let healthy = model.predict(&features(2, 12.0, 88.0)).expect("Should predict");
        assert_eq!(healthy.status, NutritionStatus::Normal);
        assert!((healthy.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_label_metadata_drives_mapping() {
        // Same trees, labels declared in a different order.
        let model = ForestModel::from_exported(exported(&["Stunted", "Berisiko", "Normal"]))
            .expect("Valid forest");
        assert_eq!(
            model.labels(),
            &[NutritionStatus::Severe, NutritionStatus::Risk, NutritionStatus::Normal]
        );
        let prediction = model.predict(&features(2, 12.0, 88.0)).expect("Should predict");
        assert_eq!(prediction.status, NutritionStatus::Severe);
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        assert!(matches!(
            ForestModel::from_exported(exported(&["Normal", "Risk", "Obese"])),
            Err(ModelError::Invalid(_))
        ));
        assert!(matches!(
            ForestModel::from_exported(exported(&["Normal", "Normal", "Stunted"])),
            Err(ModelError::Invalid(_))
        ));

        let mut wrong_order = exported(&["Normal", "Risk", "Stunted"]);
        wrong_order.feature_names.reverse();
        assert!(ForestModel::from_exported(wrong_order).is_err());

        let mut cyclic = exported(&["Normal", "Risk", "Stunted"]);
        cyclic.trees[0].nodes[0] = split(2, 80.0, 0, 2);
        assert!(ForestModel::from_exported(cyclic).is_err());

        let mut short_leaf = exported(&["Normal", "Risk", "Stunted"]);
        short_leaf.trees[1].nodes[2] = leaf(&[1.0, 0.0]);
        assert!(ForestModel::from_exported(short_leaf).is_err());

        let mut version = exported(&["Normal", "Risk", "Stunted"]);
        version.format_version = 2;
        assert!(ForestModel::from_exported(version).is_err());
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let model = ForestModel::from_exported(exported(&["Normal", "Risk", "Stunted"]))
            .expect("Valid forest");
        assert!(matches!(
            model.predict(&features(1, f64::NAN, 70.0)),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn test_load_without_manifest() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &exported(&["Normal", "Risk", "Stunted"]));

        let model = ForestModel::load(temp.path()).expect("Should load");
        assert_eq!(model.labels().len(), 3);
    }

    #[test]
    fn test_load_with_matching_manifest() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &exported(&["Normal", "Risk", "Stunted"]));
        write_manifest(temp.path(), sha256_hex(&bytes));

        ForestModel::load(temp.path()).expect("Should load");
        ForestModel::load(&temp.path().join(MODEL_FILE)).expect("Should load by file path");
    }

    #[test]
    fn test_load_rejects_tampered_model() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &exported(&["Normal", "Risk", "Stunted"]));
        write_manifest(temp.path(), sha256_hex(b"something else"));

        assert!(matches!(
            ForestModel::load(temp.path()),
            Err(ModelError::Integrity(_))
        ));
    }

    #[test]
    fn test_load_missing_model() {
        let temp = tempdir().expect("tempdir");
        assert!(matches!(
            ForestModel::load(temp.path()),
            Err(ModelError::NotFound(_))
        ));
    }
}
