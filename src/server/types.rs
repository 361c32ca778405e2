//! Request and response bodies for the HTTP interface.

use serde::{Deserialize, Serialize};

use crate::classifier::{EmotionLabel, ModelState, Prediction};

/// `POST /predict` success body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: EmotionLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f32>>,
}

impl PredictResponse {
    pub fn from_prediction(prediction: Prediction, with_scores: bool) -> Self {
        if with_scores {
            Self {
                prediction: prediction.label,
                class_index: Some(prediction.class_index),
                confidence: Some(prediction.confidence()),
                scores: Some(prediction.scores),
            }
        } else {
            Self {
                prediction: prediction.label,
                class_index: None,
                confidence: None,
                scores: None,
            }
        }
    }
}

/// Error body shared by every route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `POST /predict` query string
#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    pub scores: bool,
}

/// `GET /health` body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub model_state: ModelState,
    pub model_path: String,
    pub timestamp: String,
}
