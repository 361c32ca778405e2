//! Audio decoding from an in-memory byte stream.
//!
//! Any container/codec symphonia can probe is accepted. The stream is
//! down-mixed to mono and kept at its native sample rate.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::EmotionError;

/// Mono audio decoded from an uploaded file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples normalized to [-1, 1]
    pub samples: Vec<f32>,
    /// Native sample rate of the file
    pub sample_rate: u32,
    /// Channel count before down-mixing
    pub channels: u16,
}

impl DecodedAudio {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Decode an encoded audio file held in memory
pub fn decode_audio(bytes: &[u8]) -> Result<DecodedAudio, EmotionError> {
    if bytes.is_empty() {
        return Err(EmotionError::DecodeError("Empty input".to_string()));
    }

    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EmotionError::DecodeError(format!("Unsupported format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EmotionError::DecodeError("No audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EmotionError::DecodeError(format!("Unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) => {
                check_end_of_stream(e)?;
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(EmotionError::DecodeError(e.to_string()));
            }
        };

        let spec = *decoded.spec();
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }
        let frame_channels = spec.channels.count().max(1);
        if channels == 0 {
            channels = frame_channels as u16;
        }

        // Buffer capacity is fixed at creation, so grow it when a packet is larger
        let needs_new_buf = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * frame_channels);
        if needs_new_buf {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), frame_channels, &mut samples);
        }
    }

    let sample_rate = match sample_rate {
        Some(rate) if rate > 0 => rate,
        _ => return Err(EmotionError::DecodeError("Unknown sample rate".to_string())),
    };

    if samples.is_empty() {
        return Err(EmotionError::EmptySignalError);
    }

    let audio = DecodedAudio {
        samples,
        sample_rate,
        channels: channels.max(1),
    };

    debug!(
        "Decoded {} samples at {} Hz ({} channel(s), {} ms)",
        audio.samples.len(),
        audio.sample_rate,
        audio.channels,
        audio.duration_ms()
    );

    Ok(audio)
}

/// Ok when a reader error only marks the end of the stream
///
/// Anything else means the container is corrupt past the last good packet.
fn check_end_of_stream(err: SymphoniaError) -> Result<(), EmotionError> {
    match err {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        SymphoniaError::ResetRequired => Ok(()),
        e => Err(EmotionError::DecodeError(format!("Corrupt audio stream: {}", e))),
    }
}

/// Average interleaved frames down to mono and append them to `out`
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
