/// Authoritative per-question answer text.
///
/// The ledger is deliberately plain storage: the attribution rule (write
/// only while `Recording(i)`, under the epoch that opened it) is
/// enforced by the session engine before anything reaches `write`. The
/// answer vector always has one slot per question, so the finalize
/// payload's padding law holds by construction.
#[derive(Debug, Clone)]
pub struct AnswerLedger {
    answers: Vec<String>,
}

impl AnswerLedger {
    pub fn new(question_count: usize) -> Self {
        Self {
            answers: vec![String::new(); question_count],
        }
    }

    /// Overwrite the answer for one question.
    pub fn write(&mut self, index: usize, text: String) {
        if let Some(slot) = self.answers.get_mut(index) {
            *slot = text;
        }
    }

    pub fn answer(&self, index: usize) -> &str {
        self.answers.get(index).map(String::as_str).unwrap_or("")
    }

    /// All answers, one entry per question; unrecorded questions are `""`.
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Accumulated speech for one listening epoch: the utterances the
/// recognizer has finalized so far plus the current interim hypothesis.
///
/// Cleared when a new epoch opens and when advancing questions, so text
/// can never bleed across questions.
#[derive(Debug, Clone, Default)]
pub struct HypothesisBuffer {
    committed: Vec<String>,
    interim: String,
}

impl HypothesisBuffer {
    /// Replace the interim hypothesis (a partial result supersedes the
    /// previous interim within the same epoch).
    pub fn set_interim(&mut self, text: &str) {
        self.interim.clear();
        self.interim.push_str(text);
    }

    /// Commit an utterance at a final-result boundary.
    pub fn commit(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.committed.push(trimmed.to_string());
        }
        self.interim.clear();
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.interim.clear();
    }

    /// The full epoch text: committed utterances joined, with the current
    /// interim appended.
    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = self.committed.iter().map(String::as_str).collect();
        let interim = self.interim.trim();
        if !interim.is_empty() {
            parts.push(interim);
        }
        parts.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.interim.trim().is_empty()
    }
}
