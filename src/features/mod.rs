//! Feature extraction: encoded audio bytes to a 40-coefficient MFCC vector.
//!
//! The pipeline is:
//! 1. Decode the byte stream at its native sample rate (no resampling)
//! 2. Compute the short-time MFCC matrix (40 coefficients)
//! 3. Average the matrix over time
//! 4. Reshape to the classifier input tensor `[1, 40, 1]`
//!
//! Features depend on the sample rate of the file. Two recordings of the
//! same utterance at different rates produce different vectors; this
//! matches the analysis the classifier was trained on and is kept as is.

pub mod config;
pub mod decode;
pub mod mel;
pub mod mfcc;

pub use config::{MfccConfig, N_MFCC};
pub use decode::{decode_audio, DecodedAudio};

use ndarray::Array3;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EmotionError;
use mfcc::{mean_over_time, MfccExtractor};

/// Time-averaged MFCC coefficients for one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    coefficients: Vec<f32>,
}

impl FeatureVector {
    /// All-zero vector of the classifier's input width
    pub fn zeros() -> Self {
        Self {
            coefficients: vec![0.0; N_MFCC],
        }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coefficients
    }

    /// Model input tensor: batch of 1, one channel per coefficient
    pub fn to_tensor(&self) -> Array3<f32> {
        let n = self.coefficients.len();
        Array3::from_shape_fn((1, n, 1), |(_, i, _)| self.coefficients[i])
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(coefficients: Vec<f32>) -> Self {
        Self { coefficients }
    }
}

/// Converts encoded audio into a [`FeatureVector`]
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: MfccConfig,
    expected_sample_rate: Option<u32>,
}

impl FeatureExtractor {
    pub fn new(config: MfccConfig) -> Self {
        Self {
            config,
            expected_sample_rate: None,
        }
    }

    /// Log a warning whenever a file's sample rate differs from `rate`
    ///
    /// Features are still computed at the file's native rate.
    pub fn with_expected_sample_rate(mut self, rate: Option<u32>) -> Self {
        self.expected_sample_rate = rate;
        self
    }

    /// Decode `audio_bytes` and compute its feature vector
    pub fn extract(&self, audio_bytes: &[u8]) -> Result<FeatureVector, EmotionError> {
        let audio = decode_audio(audio_bytes)?;

        if let Some(expected) = self.expected_sample_rate {
            if expected != audio.sample_rate {
                warn!(
                    "Audio sample rate {} Hz differs from expected {} Hz; features are computed at the native rate",
                    audio.sample_rate, expected
                );
            }
        }

        self.extract_samples(&audio.samples, audio.sample_rate)
    }

    /// Compute the feature vector of already decoded mono samples
    pub fn extract_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<FeatureVector, EmotionError> {
        if samples.is_empty() {
            return Err(EmotionError::EmptySignalError);
        }

        let mut extractor = MfccExtractor::new(&self.config, sample_rate)?;
        let mfcc = extractor.compute(samples)?;
        let coefficients = mean_over_time(&mfcc);

        debug!(
            "Extracted {} coefficients from {} frames at {} Hz",
            coefficients.len(),
            mfcc.len(),
            sample_rate
        );

        Ok(FeatureVector { coefficients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sine_wav_bytes;
    use proptest::prelude::*;

    /// Mean MFCCs of a 0.5 s, 440 Hz, 0.5 amplitude sine at 22050 Hz, computed
    /// with a float64 reference following librosa's `feature.mfcc(y, sr, n_mfcc=40)` defaults
    const SINE_440_22050_MFCC: [f32; 40] = [
        -447.184106, 65.353405, 30.609415, 13.898598, -2.200873,
        -17.178214, -28.406765, -35.140319, -35.564504, -30.410778,
        -20.707886, -8.160899, 5.238986, 16.992174, 25.494889,
        29.463206, 28.531465, 23.092185, 14.241387, 3.741390,
        -6.729087, -15.447681, -21.077888, -22.977813, -21.085014,
        -16.011252, -8.788309, -0.743266, 6.728532, 12.536986,
        15.874018, 16.418932, 14.329658, 10.185348, 4.811238,
        -0.825680, -5.824742, -9.442149, -11.256798, -11.161248,
    ];

    #[test]
    fn test_extract_matches_reference_mfcc() {
        let samples: Vec<f32> = (0..11025)
            .map(|i| ((2.0 * std::f64::consts::PI * 440.0 * i as f64 / 22050.0).sin() * 0.5) as f32)
            .collect();

        let features = FeatureExtractor::default()
            .extract_samples(&samples, 22050)
            .unwrap();

        // f32 FFT rounding moves bands near the 80 dB floor by a few thousandths
        for (i, (got, want)) in features
            .as_slice()
            .iter()
            .zip(SINE_440_22050_MFCC.iter())
            .enumerate()
        {
            assert!(
                (got - want).abs() < 2e-2,
                "coefficient {}: got {}, expected {}",
                i,
                got,
                want
            );
        }
    }

    #[test]
    fn test_extract_returns_forty_coefficients() {
        let extractor = FeatureExtractor::default();
        for (rate, seconds) in [(8000u32, 0.05f32), (16000, 1.0), (44100, 0.5)] {
            let bytes = sine_wav_bytes(440.0, rate, seconds, 1);
            let features = extractor.extract(&bytes).unwrap();
            assert_eq!(features.len(), N_MFCC);
            assert!(features.as_slice().iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let bytes = sine_wav_bytes(220.0, 22050, 0.5, 2);
        let first = extractor.extract(&bytes).unwrap();
        let second = extractor.extract(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_empty_bytes() {
        let extractor = FeatureExtractor::default();
        let result = extractor.extract(&[]);
        assert!(matches!(
            result,
            Err(EmotionError::DecodeError(_)) | Err(EmotionError::EmptySignalError)
        ));
    }

    #[test]
    fn test_extract_samples_empty() {
        let extractor = FeatureExtractor::default();
        assert_eq!(
            extractor.extract_samples(&[], 16000),
            Err(EmotionError::EmptySignalError)
        );
    }

    #[test]
    fn test_features_depend_on_sample_rate() {
        // Same samples labelled with different rates give different features
        let extractor = FeatureExtractor::default();
        let samples: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin() * 0.5)
            .collect();
        let at_16k = extractor.extract_samples(&samples, 16000).unwrap();
        let at_44k = extractor.extract_samples(&samples, 44100).unwrap();
        assert_ne!(at_16k, at_44k);
    }

    #[test]
    fn test_expected_sample_rate_does_not_change_features() {
        let bytes = sine_wav_bytes(440.0, 22050, 0.25, 1);
        let plain = FeatureExtractor::default().extract(&bytes).unwrap();
        let flagged = FeatureExtractor::default()
            .with_expected_sample_rate(Some(16000))
            .extract(&bytes)
            .unwrap();
        assert_eq!(plain, flagged);
    }

    #[test]
    fn test_to_tensor_shape() {
        let features = FeatureVector::from((0..40).map(|i| i as f32).collect::<Vec<_>>());
        let tensor = features.to_tensor();
        assert_eq!(tensor.dim(), (1, 40, 1));
        assert_eq!(tensor[[0, 7, 0]], 7.0);
    }

    #[test]
    fn test_zeros() {
        let zeros = FeatureVector::zeros();
        assert_eq!(zeros.len(), N_MFCC);
        assert!(zeros.as_slice().iter().all(|&c| c == 0.0));
    }

    proptest! {
        #[test]
        fn prop_feature_length_is_fixed(
            samples in proptest::collection::vec(-1.0f32..1.0, 1..6000),
            sample_rate in 4000u32..48000
        ) {
            let extractor = FeatureExtractor::default();
            let features = extractor.extract_samples(&samples, sample_rate).unwrap();
            prop_assert_eq!(features.len(), N_MFCC);
            for c in features.as_slice() {
                prop_assert!(c.is_finite());
            }
        }
    }
}
