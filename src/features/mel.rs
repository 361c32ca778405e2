//! Power mel spectrogram generation.
//!
//! Frames are centered (zero-padded by `n_fft / 2` on both sides) and
//! windowed with a periodic Hann window. The filterbank uses the Slaney mel
//! scale with area normalization.

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

use super::config::MfccConfig;
use crate::error::EmotionError;

/// Mel spectrogram generator with pre-computed filterbank and FFT plan
pub struct MelSpectrogramGenerator {
    n_fft: usize,
    hop_length: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    mel_filterbank: Vec<Vec<f32>>,
    window: Vec<f32>,
    // Pre-allocated buffers
    fft_input: Vec<f32>,
    fft_output: Vec<Complex<f32>>,
    power_spec: Vec<f32>,
}

impl MelSpectrogramGenerator {
    /// Create a generator for audio at `sample_rate`
    pub fn new(config: &MfccConfig, sample_rate: u32) -> Result<Self, EmotionError> {
        if sample_rate == 0 {
            return Err(EmotionError::DecodeError("Sample rate must be positive".to_string()));
        }
        if config.n_fft < 2 || config.hop_length == 0 || config.n_mels == 0 {
            return Err(EmotionError::DecodeError(format!(
                "Invalid analysis parameters: n_fft={} hop_length={} n_mels={}",
                config.n_fft, config.hop_length, config.n_mels
            )));
        }

        let window = periodic_hann(config.n_fft);

        let mel_filterbank = create_mel_filterbank(
            config.n_mels,
            config.n_fft,
            sample_rate as f32,
            config.fmin,
            config.fmax_for(sample_rate),
        );

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        let n_bins = config.n_fft / 2 + 1;

        Ok(Self {
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            fft,
            mel_filterbank,
            window,
            fft_input: vec![0.0f32; config.n_fft],
            fft_output: vec![Complex::new(0.0, 0.0); n_bins],
            power_spec: vec![0.0f32; n_bins],
        })
    }

    /// Number of frames produced for a signal of `n_samples`
    pub fn frame_count(&self, n_samples: usize) -> usize {
        1 + n_samples / self.hop_length
    }

    /// Compute the power mel spectrogram
    ///
    /// # Returns
    /// Mel spectrogram as Vec<Vec<f32>> where outer dim is time frames
    /// and inner dim is mel bands
    pub fn compute(&mut self, audio: &[f32]) -> Result<Vec<Vec<f32>>, EmotionError> {
        if audio.is_empty() {
            return Err(EmotionError::EmptySignalError);
        }

        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; audio.len() + 2 * pad];
        padded[pad..pad + audio.len()].copy_from_slice(audio);

        let n_frames = self.frame_count(audio.len());
        let mut mel_spec = Vec::with_capacity(n_frames);

        for frame_idx in 0..n_frames {
            let start = frame_idx * self.hop_length;
            let frame = &padded[start..start + self.n_fft];

            for ((dst, &sample), &w) in self.fft_input.iter_mut().zip(frame).zip(&self.window) {
                *dst = sample * w;
            }

            self.fft
                .process(&mut self.fft_input, &mut self.fft_output)
                .map_err(|e| EmotionError::DecodeError(format!("FFT failed: {}", e)))?;

            for (p, c) in self.power_spec.iter_mut().zip(&self.fft_output) {
                *p = c.re * c.re + c.im * c.im;
            }

            let mel_frame: Vec<f32> = self
                .mel_filterbank
                .iter()
                .map(|filter| {
                    filter
                        .iter()
                        .zip(self.power_spec.iter())
                        .map(|(f, p)| f * p)
                        .sum()
                })
                .collect();

            mel_spec.push(mel_frame);
        }

        Ok(mel_spec)
    }
}

/// Periodic Hann window (the FFT-friendly variant)
fn periodic_hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / len as f64).cos()) as f32)
        .collect()
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency to the Slaney mel scale
fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mel scale to frequency
fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Create an area-normalized triangular mel filterbank
///
/// # Returns
/// `n_mels` filters, each a Vec of weights over the `n_fft / 2 + 1` FFT bins
fn create_mel_filterbank(
    n_mels: usize,
    n_fft: usize,
    sample_rate: f32,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let sample_rate = sample_rate as f64;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(fmin as f64);
    let mel_max = hz_to_mel(fmax as f64);

    // n_mels + 2 band edges, equally spaced in mel
    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filterbank = Vec::with_capacity(n_mels);

    for i in 0..n_mels {
        let left = hz_points[i];
        let center = hz_points[i + 1];
        let right = hz_points[i + 2];
        let enorm = 2.0 / (right - left);

        let filter: Vec<f32> = fft_freqs
            .iter()
            .map(|&f| {
                let rising = (f - left) / (center - left);
                let falling = (right - f) / (right - center);
                (rising.min(falling).max(0.0) * enorm) as f32
            })
            .collect();

        filterbank.push(filter);
    }

    filterbank
}
