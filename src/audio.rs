//! Vocal training panel.
//!
//! Recordings are inspected for container metadata only. The chart shown
//! next to a recording is a placeholder random walk, not derived from the
//! audio; pitch and volume extraction are not implemented.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Number of points in the placeholder signal chart
pub const SIGNAL_POINTS: usize = 50;

pub const SIGNAL_CAPTION: &str = "Visual feedback of voice modulation (Pitch/Volume proxy)";

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Recorded audio is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Unknown,
}

/// Metadata of one microphone recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub size_bytes: usize,
    pub format: AudioFormat,
    pub duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioClip {
    /// Read container metadata. Non-WAV input still yields a clip without metadata.
    pub fn inspect(bytes: &[u8]) -> Result<Self, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::Empty);
        }

        match hound::WavReader::new(Cursor::new(bytes)) {
            Ok(reader) => {
                let spec = reader.spec();
                let frames = reader.duration() as u64;
                let duration_ms = if spec.sample_rate > 0 {
                    Some(frames * 1000 / spec.sample_rate as u64)
                } else {
                    None
                };
                Ok(Self {
                    size_bytes: bytes.len(),
                    format: AudioFormat::Wav,
                    duration_ms,
                    sample_rate: Some(spec.sample_rate),
                    channels: Some(spec.channels),
                })
            }
            Err(e) => {
                debug!("Recording is not a readable WAV file: {}", e);
                Ok(Self {
                    size_bytes: bytes.len(),
                    format: AudioFormat::Unknown,
                    duration_ms: None,
                    sample_rate: None,
                    channels: None,
                })
            }
        }
    }
}

/// Cumulative sum of standard-normal draws
pub fn simulated_signal<R: Rng + ?Sized>(rng: &mut R, points: usize) -> Vec<f32> {
    let mut level = 0.0f32;
    (0..points)
        .map(|_| {
            let step: f32 = rng.sample(StandardNormal);
            level += step;
            level
        })
        .collect()
}

/// What the audio tab renders after a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPanel {
    pub clip: AudioClip,
    pub signal: Vec<f32>,
    pub caption: String,
}

pub fn build_panel<R: Rng + ?Sized>(bytes: &[u8], rng: &mut R) -> Result<AudioPanel, AudioError> {
    let clip = AudioClip::inspect(bytes)?;
    Ok(AudioPanel {
        clip,
        signal: simulated_signal(rng, SIGNAL_POINTS),
        caption: SIGNAL_CAPTION.to_string(),
    })
}
