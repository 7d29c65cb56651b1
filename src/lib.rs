pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod recognition;
pub mod session;
pub mod store;

pub use capture::{
    CaptureConfig, CaptureDevice, CaptureEvent, CaptureGuard, CaptureKind, MediaArtifact,
    MediaFrame, MicrophoneCapture, ScriptedCapture, TrackKind,
};
pub use config::AppConfig;
pub use error::EngineError;
pub use http::{create_router, AppState};
pub use recognition::{
    Epoch, Hypothesis, NatsRecognizer, RecognitionEvent, ScriptedRecognizer, TranscriptionEngine,
};
pub use session::{
    new_session_id, session_channel, EventSink, FinalizePayload, QuestionPhase, SessionCommand,
    SessionEngine, SessionHandle, SessionOptions, SessionState, Speaker, StatusSnapshot,
    TranscriptLog, TranscriptSegment,
};
pub use store::{InMemoryStore, InterviewDefinition, InterviewQuestion, InterviewStore, NatsStore};
