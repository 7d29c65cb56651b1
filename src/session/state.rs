use std::fmt;

/// Where the current question stands within the answer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    /// Presented, nothing recorded yet
    Idle,
    /// An answer recording span is in flight
    Recording,
    /// Stopped with an artifact; Next/Retest/Finish are available
    Answered,
}

impl QuestionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionPhase::Idle => "idle",
            QuestionPhase::Recording => "recording",
            QuestionPhase::Answered => "answered",
        }
    }
}

/// Session lifecycle.
///
/// The full flow is Setup → ReadyToStart → Active(0..n) → Finalizing →
/// Complete, with Abandoned reachable from every non-terminal state.
/// Navigation through questions is strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Preview live, device test not yet passed
    Setup { testing: bool },
    /// Device test passed; waiting for the user to begin
    ReadyToStart,
    /// Interview running on one question
    Active {
        question: usize,
        phase: QuestionPhase,
    },
    /// Results submission in progress or awaiting retry
    Finalizing,
    /// Results persisted; terminal
    Complete,
    /// Closed without persisting; terminal
    Abandoned,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Abandoned)
    }

    /// The single active-recording question index, when one exists.
    pub fn recording_question(&self) -> Option<usize> {
        match self {
            SessionState::Active {
                question,
                phase: QuestionPhase::Recording,
            } => Some(*question),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<usize> {
        match self {
            SessionState::Active { question, .. } => Some(*question),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<QuestionPhase> {
        match self {
            SessionState::Active { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Setup { testing: false } => "setup",
            SessionState::Setup { testing: true } => "device_test",
            SessionState::ReadyToStart => "ready",
            SessionState::Active { .. } => "active",
            SessionState::Finalizing => "finalizing",
            SessionState::Complete => "complete",
            SessionState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active { question, phase } => {
                write!(f, "active(q{}, {})", question, phase.as_str())
            }
            other => f.write_str(other.label()),
        }
    }
}
