use thiserror::Error;

/// Error taxonomy for the interview session engine.
///
/// Device and permission errors are fatal for the current session attempt,
/// recognition errors degrade gracefully (recording continues without
/// transcription), and persistence errors are retryable without data loss.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("camera/microphone permission denied")]
    PermissionDenied,

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("track '{0}' is not supported by this capture device")]
    TrackUnsupported(String),

    #[error("speech recognition is not supported in this environment")]
    RecognitionUnsupported,

    #[error("speech recognition failed: {0}")]
    RecognitionTransient(String),

    #[error("failed to persist interview results: {0}")]
    PersistenceFailure(String),

    #[error("interview {0} not found")]
    InterviewNotFound(i64),

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("'{command}' is not valid while the session is {state}")]
    InvalidCommand {
        command: &'static str,
        state: String,
    },

    #[error("session is no longer running")]
    SessionClosed,
}

impl EngineError {
    /// Whether the error is fatal for the session attempt (the user has to
    /// re-enter setup) as opposed to recoverable in place.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::PermissionDenied | EngineError::DeviceUnavailable(_)
        )
    }
}
