//! The single operation outer layers call: audio bytes in, emotion out.

use std::path::{Path, PathBuf};

use crate::classifier::{EmotionLabel, ModelCell, ModelState, Prediction};
use crate::config::Config;
use crate::error::EmotionError;
use crate::features::{FeatureExtractor, FeatureVector, MfccConfig};

/// Feature extraction plus the shared classifier
///
/// All methods are synchronous and may block on decoding or inference;
/// async callers should run them on a blocking thread.
pub struct EmotionPipeline {
    extractor: FeatureExtractor,
    model: ModelCell,
}

impl EmotionPipeline {
    pub fn new(extractor: FeatureExtractor, model: ModelCell) -> Self {
        Self { extractor, model }
    }

    /// Pipeline over the model at `model_path`, loaded on first use
    pub fn from_config(config: &Config, model_path: PathBuf) -> Self {
        let extractor = FeatureExtractor::new(MfccConfig::default())
            .with_expected_sample_rate(config.expected_sample_rate);
        let model = ModelCell::new(model_path, config.classifier_config());
        Self::new(extractor, model)
    }

    /// Load the model now instead of on the first request
    pub fn preload(&self) -> Result<(), EmotionError> {
        self.model.get().map(|_| ())
    }

    /// Predict the emotion label of an encoded audio file
    pub fn predict(&self, audio_bytes: &[u8]) -> Result<EmotionLabel, EmotionError> {
        Ok(self.predict_detailed(audio_bytes)?.label)
    }

    /// Predict and keep the class index and scores
    pub fn predict_detailed(&self, audio_bytes: &[u8]) -> Result<Prediction, EmotionError> {
        // Fail fast on a broken model before decoding anything
        let classifier = self.model.get()?;
        let features = self.extractor.extract(audio_bytes)?;
        classifier.predict_detailed(&features)
    }

    /// Feature vector only; does not touch the model
    pub fn extract(&self, audio_bytes: &[u8]) -> Result<FeatureVector, EmotionError> {
        self.extractor.extract(audio_bytes)
    }

    pub fn model_state(&self) -> ModelState {
        self.model.state()
    }

    pub fn model_path(&self) -> &Path {
        self.model.model_path()
    }
}
