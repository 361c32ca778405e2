//! Fixtures shared by unit tests: synthetic WAV files and dense model artifacts.

use std::f32::consts::PI;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::features::N_MFCC;

/// Encode interleaved float samples as a 16-bit PCM WAV file
pub fn wav_bytes(interleaved: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for &sample in interleaved {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// A sine tone as a WAV file; every channel carries the same signal
pub fn sine_wav_bytes(freq_hz: f32, sample_rate: u32, seconds: f32, channels: u16) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let mut interleaved = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let sample = 0.5 * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin();
        for _ in 0..channels {
            interleaved.push(sample);
        }
    }
    wav_bytes(&interleaved, sample_rate, channels)
}

/// Write a dense classifier artifact and return its path
pub fn write_dense_model(dir: &Path, name: &str, weights: &[Vec<f32>], bias: &[f32]) -> PathBuf {
    let input_dim = weights.first().map(|row| row.len()).unwrap_or(N_MFCC);
    let artifact = serde_json::json!({
        "input_dim": input_dim,
        "weights": weights,
        "bias": bias,
    });
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&artifact).unwrap()).unwrap();
    path
}

/// Eight-class dense model whose decision depends only on the bias
pub fn bias_only_model(dir: &Path, winning_class: usize) -> PathBuf {
    let weights = vec![vec![0.0f32; N_MFCC]; 8];
    let mut bias = vec![0.0f32; 8];
    bias[winning_class] = 1.0;
    write_dense_model(dir, "bias_only.json", &weights, &bias)
}
