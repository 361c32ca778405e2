//! Emotion classification over MFCC feature vectors.
//!
//! This module provides:
//! 1. Loading a model artifact once per process ([`ModelCell`])
//! 2. Running the forward pass on a `[1, 40, 1]` tensor
//! 3. Arg-max over the class scores and mapping to an [`EmotionLabel`]

pub mod cell;
pub mod label;
pub mod model;
pub mod onnx;

pub use cell::{ModelCell, ModelState};
pub use label::{classify, EmotionLabel, EMOTION_LABELS};
pub use model::{load_model, DenseModel, EmotionModel};

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::EmotionError;
use crate::features::{FeatureVector, N_MFCC};

/// Configuration for model loading
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Number of threads for ONNX inference
    pub onnx_threads: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: EmotionLabel,
    pub class_index: usize,
    pub scores: Vec<f32>,
}

impl Prediction {
    /// Score of the winning class
    pub fn confidence(&self) -> f32 {
        self.scores.get(self.class_index).copied().unwrap_or(0.0)
    }
}

/// Index of the highest score; ties resolve to the lowest index
pub fn argmax(scores: &[f32]) -> Result<usize, EmotionError> {
    if scores.is_empty() {
        return Err(EmotionError::InferenceError(
            "Model returned no scores".to_string(),
        ));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(EmotionError::InferenceError(format!(
            "Model returned non-finite score at class {}",
            i
        )));
    }

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    Ok(best)
}

/// A loaded model plus the label mapping
///
/// Cloning shares the underlying model.
#[derive(Clone)]
pub struct EmotionClassifier {
    model: Arc<dyn EmotionModel>,
}

impl EmotionClassifier {
    /// Load the artifact at `model_path`
    pub fn load(model_path: &Path, config: &ClassifierConfig) -> Result<Self, EmotionError> {
        Ok(Self {
            model: load_model(model_path, config)?,
        })
    }

    pub fn from_model(model: Arc<dyn EmotionModel>) -> Self {
        Self { model }
    }

    pub fn backend(&self) -> &'static str {
        self.model.backend()
    }

    /// True when both handles share one loaded model
    pub fn same_instance(&self, other: &EmotionClassifier) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }

    /// Predict the emotion label for a feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<EmotionLabel, EmotionError> {
        Ok(self.predict_detailed(features)?.label)
    }

    /// Predict and keep the class index and raw scores
    pub fn predict_detailed(&self, features: &FeatureVector) -> Result<Prediction, EmotionError> {
        if features.len() != N_MFCC {
            return Err(EmotionError::InferenceError(format!(
                "Feature shape mismatch: expected {} coefficients, got {}",
                N_MFCC,
                features.len()
            )));
        }

        let scores = self.model.infer(&features.to_tensor())?;
        let class_index = argmax(&scores)?;
        let label = EmotionLabel::from_class_index(class_index);

        debug!(
            "Predicted {} (class {}, score {:.3}, {} classes)",
            label,
            class_index,
            scores[class_index],
            scores.len()
        );

        Ok(Prediction {
            label,
            class_index,
            scores,
        })
    }
}

impl std::fmt::Debug for EmotionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionClassifier")
            .field("backend", &self.model.backend())
            .finish()
    }
}
