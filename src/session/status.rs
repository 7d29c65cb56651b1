use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-question progress flags exposed to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionStatus {
    pub id: i64,
    pub prompt: String,
    /// Zero-based position in the interview
    pub ordinal: usize,
    /// Whether an answer recording has completed for this question
    pub answered: bool,
    /// Whether a recording artifact is attached
    pub has_artifact: bool,
    /// Current ledger text for this question
    pub answer: String,
}

/// Snapshot of the session for the surrounding UI, returned from every
/// command and from the status query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub session_id: String,
    pub interview_id: i64,
    /// Position title from the interview definition
    pub position: String,
    /// Lifecycle state label
    pub state: String,
    /// Current question index while active
    pub question: Option<usize>,
    /// Current question phase while active
    pub phase: Option<String>,
    pub elapsed_seconds: u64,
    /// When the interview proper started (not the setup phase)
    pub started_at: Option<DateTime<Utc>>,
    pub notes: String,
    /// True when speech recognition is unavailable for this session
    pub recognition_disabled: bool,
    /// Most recent device or recognition failure, if any
    pub last_error: Option<String>,
    pub questions: Vec<QuestionStatus>,
}
