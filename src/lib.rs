//! Speech emotion recognition.
//!
//! Decodes an uploaded audio file, summarizes it as 40 time-averaged MFCCs
//! and classifies the vector into one of eight emotions with a pre-trained
//! model that is loaded once per process.

pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod pipeline;
pub mod server;

#[cfg(test)]
mod test_support;

pub use classifier::{EmotionClassifier, EmotionLabel, ModelCell, ModelState, Prediction};
pub use config::Config;
pub use error::EmotionError;
pub use features::{FeatureExtractor, FeatureVector, MfccConfig, N_MFCC};
pub use pipeline::EmotionPipeline;
