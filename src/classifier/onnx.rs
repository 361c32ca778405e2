//! ONNX Runtime backend for exported emotion classifiers.

use ndarray::Array3;
use std::path::Path;

use super::model::EmotionModel;
use crate::error::EmotionError;

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
#[cfg(feature = "onnx")]
use std::sync::Mutex;

/// Emotion classifier running an ONNX graph
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// mutex. The graph and its weights are never modified.
#[cfg(feature = "onnx")]
pub struct OnnxModel {
    session: Mutex<Session>,
}

#[cfg(feature = "onnx")]
impl OnnxModel {
    /// Load an ONNX model file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `n_threads` - Number of intra-op threads for inference
    pub fn load(model_path: &Path, n_threads: usize) -> Result<Self, EmotionError> {
        if !model_path.exists() {
            return Err(EmotionError::ModelLoadError(format!(
                "Model not found at {:?}",
                model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmotionError::ModelLoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmotionError::ModelLoadError(e.to_string()))?
            .with_intra_threads(n_threads.max(1))
            .map_err(|e: ort::Error| EmotionError::ModelLoadError(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| EmotionError::ModelLoadError(e.to_string()))?;

        tracing::info!("ONNX session ready for {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[cfg(feature = "onnx")]
impl EmotionModel for OnnxModel {
    fn infer(&self, input: &Array3<f32>) -> Result<Vec<f32>, EmotionError> {
        let (batch, features, channels) = input.dim();
        let input_shape = [batch, features, channels];
        let input_data: Vec<f32> = input.iter().copied().collect();

        let input_tensor = Value::from_array((input_shape, input_data))
            .map_err(|e: ort::Error| EmotionError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmotionError::InferenceError("ONNX session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e: ort::Error| EmotionError::InferenceError(e.to_string()))?;

        // Output shape is [batch, classes] = [1, 8]
        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| EmotionError::InferenceError("No output from model".to_string()))?;

        let scores = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| EmotionError::InferenceError(e.to_string()))?;

        let scores: Vec<f32> = scores.1.iter().copied().collect();
        Ok(scores)
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "onnx"))]
pub struct OnnxModel;

#[cfg(not(feature = "onnx"))]
impl OnnxModel {
    pub fn load(_model_path: &Path, _n_threads: usize) -> Result<Self, EmotionError> {
        Err(EmotionError::ModelLoadError(
            "ONNX models require the 'onnx' feature".to_string(),
        ))
    }
}

#[cfg(not(feature = "onnx"))]
impl EmotionModel for OnnxModel {
    fn infer(&self, _input: &Array3<f32>) -> Result<Vec<f32>, EmotionError> {
        Err(EmotionError::InferenceError(
            "ONNX models require the 'onnx' feature".to_string(),
        ))
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}
