use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::MediaFrame;
use crate::error::EngineError;

/// One continuous span of the speech-recognition session.
///
/// Opened by `start_listening`, closed by `stop_listening`. Every
/// recognition event carries the epoch it was produced under so the
/// session engine can fence out results that arrive after the epoch
/// closed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A speech hypothesis for the current utterance.
#[derive(Debug, Clone)]
pub enum Hypothesis {
    /// Interim result; supersedes the previous interim within the epoch.
    Partial { text: String, confidence: f32 },
    /// The recognizer detected an utterance boundary.
    Final { text: String, confidence: f32 },
}

impl Hypothesis {
    pub fn text(&self) -> &str {
        match self {
            Hypothesis::Partial { text, .. } | Hypothesis::Final { text, .. } => text,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Hypothesis::Partial { confidence, .. } | Hypothesis::Final { confidence, .. } => {
                *confidence
            }
        }
    }
}

/// Asynchronous notifications a recognizer pushes into the session queue.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    Result {
        epoch: Epoch,
        hypothesis: Hypothesis,
    },
    /// The epoch ended on an error; no automatic restart. Recording keeps
    /// going, transcription stops for that turn.
    TransientError { epoch: Epoch, message: String },
}

/// Speech recognition port
///
/// Wraps a continuous recognition capability that emits interim and final
/// hypotheses per listening epoch. The underlying recognizer supports
/// exactly one continuous session per epoch; restarting mid-utterance
/// loses interim progress (known limitation, not worked around here).
#[async_trait::async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Open one continuous listening epoch.
    async fn start_listening(&self, epoch: Epoch) -> Result<(), EngineError>;

    /// Forward captured PCM to the recognizer. Adapters that listen out of
    /// band ignore this.
    async fn feed_audio(&self, frame: &MediaFrame) -> Result<(), EngineError>;

    /// Close the current epoch. Results delivered for it afterwards are
    /// stale and must be dropped by the consumer.
    async fn stop_listening(&self) -> Result<(), EngineError>;

    /// Clear the accumulated interim buffer without tearing down the
    /// underlying session; used when advancing to the next question.
    async fn reset_hypothesis(&self) -> Result<(), EngineError>;

    /// Recognizer name for logging
    fn name(&self) -> &str;
}
