use serde::{Deserialize, Serialize};

use crate::recognition::Epoch;

/// Who a transcript entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

/// One speaker-tagged unit of the displayed conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Ordinal position in the log
    pub index: usize,
    pub speaker: Speaker,
    pub text: String,
    /// Elapsed interview time when the entry was first written, in seconds
    pub offset_seconds: u64,
    /// Confidence estimate of the latest hypothesis, when known
    pub confidence: Option<f32>,
    /// The listening epoch a Candidate entry was written under; merge
    /// eligibility, not part of the wire shape
    #[serde(skip)]
    epoch: Option<Epoch>,
}

/// Ordered record of the session's conversation, for live display and
/// audit.
///
/// Monotonic by contract: entries are only appended, or the last entry is
/// replaced in place while its epoch is still the current one. Entries
/// belonging to earlier questions are never rewritten.
#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    segments: Vec<TranscriptSegment>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a question prompt. Interviewer entries never merge.
    pub fn append_prompt(&mut self, text: &str, offset_seconds: u64) {
        let index = self.segments.len();
        self.segments.push(TranscriptSegment {
            index,
            speaker: Speaker::Interviewer,
            text: text.to_string(),
            offset_seconds,
            confidence: None,
            epoch: None,
        });
    }

    /// Write candidate speech for the given epoch: if the last entry is a
    /// Candidate entry written under the same epoch, replace its text in
    /// place (keeping the original offset); otherwise append a new entry.
    pub fn merge_candidate(
        &mut self,
        text: &str,
        offset_seconds: u64,
        confidence: f32,
        epoch: Epoch,
    ) {
        if let Some(last) = self.segments.last_mut() {
            if last.speaker == Speaker::Candidate && last.epoch == Some(epoch) {
                last.text.clear();
                last.text.push_str(text);
                last.confidence = Some(confidence);
                return;
            }
        }

        let index = self.segments.len();
        self.segments.push(TranscriptSegment {
            index,
            speaker: Speaker::Candidate,
            text: text.to_string(),
            offset_seconds,
            confidence: Some(confidence),
            epoch: Some(epoch),
        });
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn to_vec(&self) -> Vec<TranscriptSegment> {
        self.segments.clone()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
