//! Interview recording session engine
//!
//! This module provides the session coordinator and the state it owns:
//! - Lifecycle state machine (setup, device test, per-question answer
//!   cycle, finalization)
//! - Epoch-fenced answer attribution into the ledger
//! - Append-or-merge transcript log for live display and audit
//! - Completion payload assembly and submission

pub mod engine;
pub mod event;
pub mod finalize;
pub mod ledger;
pub mod state;
pub mod status;
pub mod transcript;

pub use engine::{new_session_id, SessionEngine, SessionHandle, SessionOptions};
pub use event::{session_channel, EventSink, SessionCommand, SessionEvent};
pub use finalize::{build_payload, duration_minutes, FinalizePayload, QuestionResult};
pub use ledger::{AnswerLedger, HypothesisBuffer};
pub use state::{QuestionPhase, SessionState};
pub use status::{QuestionStatus, StatusSnapshot};
pub use transcript::{Speaker, TranscriptLog, TranscriptSegment};
