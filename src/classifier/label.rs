//! Emotion labels and the class-index mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotion predicted for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgust,
    Surprised,
    /// Class index outside the label table
    Unknown,
}

/// Labels in class-index order
pub const EMOTION_LABELS: [EmotionLabel; 8] = [
    EmotionLabel::Neutral,
    EmotionLabel::Calm,
    EmotionLabel::Happy,
    EmotionLabel::Sad,
    EmotionLabel::Angry,
    EmotionLabel::Fearful,
    EmotionLabel::Disgust,
    EmotionLabel::Surprised,
];

/// Map a class index to its label; anything outside 0..=7 is `Unknown`
pub fn classify(index: i64) -> EmotionLabel {
    match index {
        0 => EmotionLabel::Neutral,
        1 => EmotionLabel::Calm,
        2 => EmotionLabel::Happy,
        3 => EmotionLabel::Sad,
        4 => EmotionLabel::Angry,
        5 => EmotionLabel::Fearful,
        6 => EmotionLabel::Disgust,
        7 => EmotionLabel::Surprised,
        _ => EmotionLabel::Unknown,
    }
}

impl EmotionLabel {
    pub fn from_class_index(index: usize) -> Self {
        i64::try_from(index)
            .map(classify)
            .unwrap_or(EmotionLabel::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Calm => "calm",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgust => "disgust",
            Self::Surprised => "surprised",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "calm" => Ok(Self::Calm),
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            "fearful" => Ok(Self::Fearful),
            "disgust" => Ok(Self::Disgust),
            "surprised" => Ok(Self::Surprised),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown emotion label: {}", s)),
        }
    }
}
