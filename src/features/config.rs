//! Configuration for MFCC feature extraction.

/// Number of cepstral coefficients the classifier expects
pub const N_MFCC: usize = 40;

/// Configuration for short-time MFCC analysis
///
/// Defaults follow the analysis the classifier was trained with; changing
/// them changes the features and invalidates the model.
#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    /// Number of cepstral coefficients kept after the DCT
    pub n_mfcc: usize,

    /// FFT size (also the analysis window length)
    pub n_fft: usize,

    /// Hop length between frames (in samples)
    pub hop_length: usize,

    /// Number of mel frequency bands
    pub n_mels: usize,

    /// Minimum frequency for mel filterbank (Hz)
    pub fmin: f32,

    /// Maximum frequency for mel filterbank (Hz), Nyquist when `None`
    pub fmax: Option<f32>,

    /// Floor applied to power before the dB conversion
    pub amin: f32,

    /// Dynamic range kept below the loudest bin, unclipped when `None`
    pub top_db: Option<f32>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: N_MFCC,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            amin: 1e-10,
            top_db: Some(80.0),
        }
    }
}

impl MfccConfig {
    /// Upper filterbank edge for a given sample rate
    pub fn fmax_for(&self, sample_rate: u32) -> f32 {
        self.fmax.unwrap_or(sample_rate as f32 / 2.0)
    }
}
