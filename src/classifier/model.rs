//! Model backends and artifact loading.
//!
//! The backend is picked from the artifact's file extension:
//! - `.onnx`: ONNX graph run through ONNX Runtime
//! - `.json`: dense softmax layer (`softmax(W·x + b)`)

use ndarray::{Array1, Array2, Array3};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::onnx::OnnxModel;
use super::{ClassifierConfig, EmotionLabel};
use crate::error::EmotionError;

/// A loaded, immutable classifier producing one score per class
pub trait EmotionModel: Send + Sync {
    /// Forward pass on a `[1, features, 1]` tensor
    fn infer(&self, input: &Array3<f32>) -> Result<Vec<f32>, EmotionError>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Load a model artifact, choosing the backend by extension
pub fn load_model(
    model_path: &Path,
    config: &ClassifierConfig,
) -> Result<Arc<dyn EmotionModel>, EmotionError> {
    if !model_path.exists() {
        return Err(EmotionError::ModelLoadError(format!(
            "Model not found at {:?}",
            model_path
        )));
    }

    let extension = model_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let model: Arc<dyn EmotionModel> = match extension.as_deref() {
        Some("onnx") => Arc::new(OnnxModel::load(model_path, config.onnx_threads)?),
        Some("json") => Arc::new(DenseModel::load(model_path)?),
        _ => {
            return Err(EmotionError::ModelLoadError(format!(
                "Unsupported model format: {:?} (expected .onnx or .json)",
                model_path
            )))
        }
    };

    info!(
        "Loaded {} emotion model from {:?}",
        model.backend(),
        model_path
    );

    Ok(model)
}

#[derive(Debug, Deserialize)]
struct DenseArtifact {
    input_dim: usize,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    /// Class names in output order, checked against the fixed label table
    #[serde(default)]
    labels: Option<Vec<String>>,
}

/// Single dense layer followed by softmax
#[derive(Debug, Clone)]
pub struct DenseModel {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl DenseModel {
    /// Build from row-major weights (`classes × input_dim`) and a bias per class
    pub fn from_parts(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self, EmotionError> {
        let n_classes = weights.len();
        let input_dim = weights.first().map(|row| row.len()).unwrap_or(0);

        if n_classes == 0 || input_dim == 0 {
            return Err(EmotionError::ModelLoadError(
                "Dense model has no weights".to_string(),
            ));
        }
        if let Some((i, row)) = weights.iter().enumerate().find(|(_, r)| r.len() != input_dim) {
            return Err(EmotionError::ModelLoadError(format!(
                "Weight row {} has {} columns (expected {})",
                i,
                row.len(),
                input_dim
            )));
        }
        if bias.len() != n_classes {
            return Err(EmotionError::ModelLoadError(format!(
                "Bias has {} entries (expected {})",
                bias.len(),
                n_classes
            )));
        }

        let flat: Vec<f32> = weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((n_classes, input_dim), flat)
            .map_err(|e| EmotionError::ModelLoadError(e.to_string()))?;

        Ok(Self {
            weights,
            bias: Array1::from(bias),
        })
    }

    /// Load a JSON dense-layer artifact
    pub fn load(path: &Path) -> Result<Self, EmotionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmotionError::ModelLoadError(format!("Failed to read {:?}: {}", path, e)))?;
        let artifact: DenseArtifact = serde_json::from_str(&content).map_err(|e| {
            EmotionError::ModelLoadError(format!("Malformed model artifact {:?}: {}", path, e))
        })?;

        let model = Self::from_parts(artifact.weights, artifact.bias)?;
        if model.input_dim() != artifact.input_dim {
            return Err(EmotionError::ModelLoadError(format!(
                "Declared input_dim {} does not match weights ({} columns)",
                artifact.input_dim,
                model.input_dim()
            )));
        }

        if let Some(labels) = &artifact.labels {
            check_label_order(labels, model.n_classes())?;
        }

        Ok(model)
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.weights.nrows()
    }
}

impl EmotionModel for DenseModel {
    fn infer(&self, input: &Array3<f32>) -> Result<Vec<f32>, EmotionError> {
        let x: Array1<f32> = input.iter().copied().collect();
        if x.len() != self.input_dim() {
            return Err(EmotionError::InferenceError(format!(
                "Input has {} features (model expects {})",
                x.len(),
                self.input_dim()
            )));
        }

        let logits = self.weights.dot(&x) + &self.bias;
        softmax(&logits.to_vec())
    }

    fn backend(&self) -> &'static str {
        "dense"
    }
}

/// The artifact's class names must follow the fixed class-index order
fn check_label_order(labels: &[String], n_classes: usize) -> Result<(), EmotionError> {
    if labels.len() != n_classes {
        return Err(EmotionError::ModelLoadError(format!(
            "Artifact lists {} labels for {} classes",
            labels.len(),
            n_classes
        )));
    }

    for (index, name) in labels.iter().enumerate() {
        let label = name
            .parse::<EmotionLabel>()
            .map_err(EmotionError::ModelLoadError)?;
        let expected = EmotionLabel::from_class_index(index);
        if label != expected {
            return Err(EmotionError::ModelLoadError(format!(
                "Class {} is labelled {:?} but the label table has {}",
                index, name, expected
            )));
        }
    }
    Ok(())
}

/// Numerically stable softmax; non-finite logits are an inference failure
fn softmax(logits: &[f32]) -> Result<Vec<f32>, EmotionError> {
    if logits.iter().any(|v| !v.is_finite()) {
        return Err(EmotionError::InferenceError(
            "Model produced non-finite logits".to_string(),
        ));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}
