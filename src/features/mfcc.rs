//! MFCC computation on top of the power mel spectrogram.

use std::f64::consts::PI;

use super::config::MfccConfig;
use super::mel::MelSpectrogramGenerator;
use crate::error::EmotionError;

/// Short-time MFCC extractor bound to one sample rate
pub struct MfccExtractor {
    mel: MelSpectrogramGenerator,
    dct: Vec<Vec<f32>>,
    amin: f32,
    top_db: Option<f32>,
}

impl MfccExtractor {
    pub fn new(config: &MfccConfig, sample_rate: u32) -> Result<Self, EmotionError> {
        if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
            return Err(EmotionError::DecodeError(format!(
                "n_mfcc ({}) must be between 1 and n_mels ({})",
                config.n_mfcc, config.n_mels
            )));
        }

        Ok(Self {
            mel: MelSpectrogramGenerator::new(config, sample_rate)?,
            dct: dct_ortho_matrix(config.n_mfcc, config.n_mels),
            amin: config.amin,
            top_db: config.top_db,
        })
    }

    /// Compute the MFCC matrix, one row of `n_mfcc` coefficients per frame
    pub fn compute(&mut self, audio: &[f32]) -> Result<Vec<Vec<f32>>, EmotionError> {
        let mut mel_spec = self.mel.compute(audio)?;
        power_to_db(&mut mel_spec, self.amin, self.top_db);

        Ok(mel_spec
            .iter()
            .map(|frame| {
                self.dct
                    .iter()
                    .map(|basis| basis.iter().zip(frame).map(|(b, x)| b * x).sum())
                    .collect()
            })
            .collect())
    }
}

/// Convert a power spectrogram to decibels in place (reference power 1.0)
///
/// Values are floored at `amin` before the log and, when `top_db` is set,
/// clipped to `top_db` below the loudest bin of the whole spectrogram.
pub fn power_to_db(spec: &mut [Vec<f32>], amin: f32, top_db: Option<f32>) {
    let mut peak = f32::NEG_INFINITY;
    for value in spec.iter_mut().flat_map(|frame| frame.iter_mut()) {
        *value = 10.0 * value.max(amin).log10();
        peak = peak.max(*value);
    }

    if let Some(top_db) = top_db {
        let floor = peak - top_db;
        for value in spec.iter_mut().flat_map(|frame| frame.iter_mut()) {
            *value = value.max(floor);
        }
    }
}

/// Orthonormal DCT-II basis, truncated to the first `n_out` coefficients
fn dct_ortho_matrix(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| (scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()) as f32)
                .collect()
        })
        .collect()
}

/// Average an MFCC matrix over time
///
/// Returns an empty Vec for an empty matrix.
pub fn mean_over_time(mfcc: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = mfcc.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0f64; first.len()];
    for frame in mfcc {
        for (sum, &value) in sums.iter_mut().zip(frame) {
            *sum += value as f64;
        }
    }

    let n_frames = mfcc.len() as f64;
    sums.into_iter().map(|sum| (sum / n_frames) as f32).collect()
}
