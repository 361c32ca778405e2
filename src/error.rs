//! Error taxonomy for the inference pipeline.

use thiserror::Error;

/// Errors that can occur while extracting features or classifying them
///
/// `Clone` so a failed model load can be handed to every later caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmotionError {
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    #[error("Decoded audio contains no samples")]
    EmptySignalError,

    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),
}

impl EmotionError {
    /// True when the request itself was bad (undecodable or empty audio)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::DecodeError(_) | Self::EmptySignalError)
    }
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for EmotionError {
    fn from(e: ort::Error) -> Self {
        EmotionError::InferenceError(e.to_string())
    }
}
