use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use tracing::{info, warn};

use super::device::MediaFrame;
use crate::error::EngineError;

/// One finalized recording artifact: a complete WAV file in memory.
///
/// The engine hands the artifact to the question it was recorded for;
/// assigning a new artifact to the same question overwrites the previous
/// one. Artifacts are never uploaded anywhere by this crate.
#[derive(Debug, Clone)]
pub struct MediaArtifact {
    /// Encoded WAV bytes
    pub data: Vec<u8>,
    /// Recorded duration in milliseconds
    pub duration_ms: u64,
    /// Sample rate of the encoded audio
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl MediaArtifact {
    pub const MIME: &'static str = "audio/wav";

    pub fn is_empty(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Folds the frames of one recording span into a single `MediaArtifact`.
///
/// The audio format is taken from the first frame; an empty span encodes a
/// valid zero-length WAV at the default format. When a spill path is set
/// the encoded bytes are also written there, so retesting a question
/// overwrites the file on disk just like it overwrites the in-memory
/// artifact.
pub struct ArtifactRecorder {
    samples: Vec<i16>,
    format: Option<(u32, u16)>,
    spill_path: Option<PathBuf>,
}

impl ArtifactRecorder {
    pub fn new(spill_path: Option<PathBuf>) -> Self {
        Self {
            samples: Vec::new(),
            format: None,
            spill_path,
        }
    }

    /// Append one frame to the span buffer.
    pub fn push(&mut self, frame: &MediaFrame) -> Result<(), EngineError> {
        match self.format {
            None => self.format = Some((frame.sample_rate, frame.channels)),
            Some((rate, channels)) => {
                if rate != frame.sample_rate || channels != frame.channels {
                    return Err(EngineError::Capture(format!(
                        "frame format changed mid-span: {}Hz/{}ch -> {}Hz/{}ch",
                        rate, channels, frame.sample_rate, frame.channels
                    )));
                }
            }
        }
        self.samples.extend_from_slice(&frame.samples);
        Ok(())
    }

    /// Encode the buffered span into one artifact.
    pub fn finish(self) -> Result<MediaArtifact, EngineError> {
        let (sample_rate, channels) = self.format.unwrap_or((16000, 1));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| EngineError::Capture(format!("failed to start WAV encoder: {}", e)))?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| EngineError::Capture(format!("failed to encode sample: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| EngineError::Capture(format!("failed to finalize WAV: {}", e)))?;
        }
        let data = cursor.into_inner();

        let duration_ms = if channels == 0 || sample_rate == 0 {
            0
        } else {
            (self.samples.len() as u64 / channels as u64) * 1000 / sample_rate as u64
        };

        if let Some(path) = &self.spill_path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| EngineError::Capture(format!("failed to create {:?}: {}", parent, e)))?;
            }
            match fs::write(path, &data) {
                Ok(()) => info!("Artifact written to {}", path.display()),
                // Spill failure does not lose the artifact itself
                Err(e) => warn!("Failed to write artifact to {}: {}", path.display(), e),
            }
        }

        Ok(MediaArtifact {
            data,
            duration_ms,
            sample_rate,
            channels,
        })
    }
}
