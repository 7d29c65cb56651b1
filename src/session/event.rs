use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::status::StatusSnapshot;
use super::transcript::TranscriptSegment;
use crate::capture::{CaptureEvent, TrackKind};
use crate::error::EngineError;
use crate::recognition::RecognitionEvent;

/// User-driven commands accepted by the session engine.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Begin the device-test recording during setup.
    DeviceTestStart,
    /// End the device-test recording; its artifact is discarded.
    DeviceTestStop,
    /// Leave the ready screen and present the first question.
    StartInterview,
    /// Begin recording an answer to the current question.
    StartRecording,
    /// Stop the in-flight answer recording.
    StopRecording,
    /// Advance to the next question (forward only).
    Next,
    /// Re-record the current question, overwriting its artifact.
    Retest,
    /// Finalize the session and persist the results.
    Finish,
    /// Close the session, discarding all unsaved state.
    Abandon,
    /// Replace the session notes.
    UpdateNotes(String),
    /// Enable or disable a capture track.
    SetTrackEnabled(TrackKind, bool),
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::DeviceTestStart => "device_test_start",
            SessionCommand::DeviceTestStop => "device_test_stop",
            SessionCommand::StartInterview => "start_interview",
            SessionCommand::StartRecording => "start_recording",
            SessionCommand::StopRecording => "stop_recording",
            SessionCommand::Next => "next",
            SessionCommand::Retest => "retest",
            SessionCommand::Finish => "finish",
            SessionCommand::Abandon => "abandon",
            SessionCommand::UpdateNotes(_) => "update_notes",
            SessionCommand::SetTrackEnabled(..) => "set_track_enabled",
        }
    }
}

/// Everything the session engine consumes, in one queue.
///
/// Commands, device events, recognizer events and timer ticks are all
/// serialized through a single channel so the engine task is the only
/// authority on state transitions and on whether an event is still in
/// epoch.
pub enum SessionEvent {
    Command {
        command: SessionCommand,
        reply: oneshot::Sender<Result<StatusSnapshot, EngineError>>,
    },
    Status(oneshot::Sender<StatusSnapshot>),
    Transcript(oneshot::Sender<Vec<TranscriptSegment>>),
    Capture(CaptureEvent),
    Recognition(RecognitionEvent),
    Tick,
}

/// Producer half of the session queue, handed to adapters and timers.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.tx.clone()
    }

    /// Push a capture event. Callable from non-async contexts (the audio
    /// callback thread); a full queue drops the event rather than blocking
    /// hardware callbacks.
    pub fn capture(&self, event: CaptureEvent) {
        if self.tx.try_send(SessionEvent::Capture(event)).is_err() {
            warn!("Session queue full or closed, dropping capture event");
        }
    }

    /// Push a recognition event.
    pub async fn recognition(&self, event: RecognitionEvent) {
        if self.tx.send(SessionEvent::Recognition(event)).await.is_err() {
            warn!("Session queue closed, dropping recognition event");
        }
    }

    /// Push one timer tick.
    pub async fn tick(&self) -> bool {
        self.tx.send(SessionEvent::Tick).await.is_ok()
    }
}

/// Create the session queue: a sink for producers and the receiver the
/// engine consumes.
pub fn session_channel() -> (EventSink, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(256);
    (EventSink { tx }, rx)
}
