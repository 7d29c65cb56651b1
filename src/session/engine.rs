use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::{EventSink, SessionCommand, SessionEvent};
use super::finalize::build_payload;
use super::ledger::{AnswerLedger, HypothesisBuffer};
use super::state::{QuestionPhase, SessionState};
use super::status::{QuestionStatus, StatusSnapshot};
use super::transcript::{TranscriptLog, TranscriptSegment};
use crate::capture::{
    ArtifactRecorder, CaptureDevice, CaptureEvent, CaptureGuard, MediaArtifact, MediaFrame,
};
use crate::error::EngineError;
use crate::recognition::{Epoch, Hypothesis, RecognitionEvent, TranscriptionEngine};
use crate::store::InterviewStore;

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// When set, every finalized artifact is also written here as
    /// `<session>-q<ordinal>.wav`; retests overwrite the same file.
    pub artifact_dir: Option<PathBuf>,
    /// Cadence of the internal elapsed-time timer. `None` disables it so
    /// tests can drive ticks through the queue deterministically.
    pub tick_interval: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            artifact_dir: None,
            tick_interval: Some(Duration::from_secs(1)),
        }
    }
}

/// One question of the running session.
struct QuestionSlot {
    id: i64,
    prompt: String,
    /// At most one artifact; a retest overwrites it
    artifact: Option<MediaArtifact>,
    answered: bool,
}

/// One in-flight recording span (an answer take or the device test).
struct ActiveSpan {
    epoch: Epoch,
    /// None for the device test
    question: Option<usize>,
    pump: JoinHandle<Result<MediaArtifact, EngineError>>,
}

/// Generate a fresh session identifier.
pub fn new_session_id() -> String {
    format!("session-{}", Uuid::new_v4())
}

/// Client half of a running session: commands and queries, all serialized
/// through the engine's queue.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn command(&self, command: SessionCommand) -> Result<StatusSnapshot, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionEvent::Command {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        reply_rx.await.map_err(|_| EngineError::SessionClosed)?
    }

    pub async fn status(&self) -> Result<StatusSnapshot, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionEvent::Status(reply_tx))
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        reply_rx.await.map_err(|_| EngineError::SessionClosed)
    }

    pub async fn transcript(&self) -> Result<Vec<TranscriptSegment>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionEvent::Transcript(reply_tx))
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        reply_rx.await.map_err(|_| EngineError::SessionClosed)
    }
}

/// The session coordinator.
///
/// One tokio task per session owns all mutable state and is the only
/// component that commands the capture device and the recognizer or
/// writes to the ledger and transcript log. Everything it consumes
/// (commands, device events, recognition events, timer ticks) arrives
/// through a single queue, which makes epoch fencing and state-gated
/// writes a matter of checking fields it alone mutates.
pub struct SessionEngine {
    session_id: String,
    interview_id: i64,
    position: String,
    notes: String,

    state: SessionState,
    questions: Vec<QuestionSlot>,
    ledger: AnswerLedger,
    transcript: TranscriptLog,
    hypothesis: HypothesisBuffer,

    elapsed_seconds: u64,
    started_at: Option<DateTime<Utc>>,

    /// Last opened listening epoch
    epoch: Epoch,
    /// Whether the current epoch is still open
    listening: bool,
    span: Option<ActiveSpan>,

    recognition_disabled: bool,
    last_error: Option<String>,

    capture: CaptureGuard,
    recognizer: Option<Arc<dyn TranscriptionEngine>>,
    store: Arc<dyn InterviewStore>,

    events: mpsc::Receiver<SessionEvent>,
    artifact_dir: Option<PathBuf>,
}

impl SessionEngine {
    /// Fetch the interview definition, acquire the capture hardware and
    /// start the engine task.
    ///
    /// Permission and device errors surface here and are fatal for the
    /// attempt; the caller re-enters setup by opening a new session.
    #[allow(clippy::too_many_arguments)]
    pub async fn open(
        session_id: String,
        interview_id: i64,
        capture: Arc<dyn CaptureDevice>,
        recognizer: Option<Arc<dyn TranscriptionEngine>>,
        store: Arc<dyn InterviewStore>,
        sink: EventSink,
        events: mpsc::Receiver<SessionEvent>,
        options: SessionOptions,
    ) -> Result<SessionHandle, EngineError> {
        let definition = store.fetch(interview_id).await?;

        // Acquire-on-setup: from here on the guard owns the hardware and
        // every exit path releases it.
        let guard = CaptureGuard::new(capture);
        guard.request_access().await?;
        guard.start_preview().await?;

        info!(
            "Session {} opened for interview {} ({}, {} questions)",
            session_id,
            interview_id,
            definition.position,
            definition.questions.len()
        );

        let question_count = definition.questions.len();
        let recognition_disabled = recognizer.is_none();
        if recognition_disabled {
            warn!(
                "Session {} running without speech recognition",
                session_id
            );
        }

        let engine = SessionEngine {
            session_id: session_id.clone(),
            interview_id,
            position: definition.position,
            notes: definition.notes,
            state: SessionState::Setup { testing: false },
            questions: definition
                .questions
                .into_iter()
                .map(|q| QuestionSlot {
                    id: q.id,
                    prompt: q.question,
                    artifact: None,
                    answered: false,
                })
                .collect(),
            ledger: AnswerLedger::new(question_count),
            transcript: TranscriptLog::new(),
            hypothesis: HypothesisBuffer::default(),
            elapsed_seconds: 0,
            started_at: None,
            epoch: Epoch(0),
            listening: false,
            span: None,
            recognition_disabled,
            last_error: None,
            capture: guard,
            recognizer,
            store,
            events,
            artifact_dir: options.artifact_dir,
        };

        if let Some(interval) = options.tick_interval {
            let tick_sink = sink.clone();
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                timer.tick().await; // immediate first tick
                loop {
                    timer.tick().await;
                    if !tick_sink.tick().await {
                        break;
                    }
                }
            });
        }

        let handle = SessionHandle {
            session_id,
            tx: sink.sender(),
        };
        tokio::spawn(engine.run());
        Ok(handle)
    }

    async fn run(mut self) {
        debug!("Session {} engine running", self.session_id);

        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Command { command, reply } => {
                    let name = command.name();
                    let result = self.handle_command(command).await;
                    if let Err(e) = &result {
                        warn!("Session {}: {} rejected: {}", self.session_id, name, e);
                    }
                    let _ = reply.send(result.map(|_| self.snapshot()));
                }
                SessionEvent::Status(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                SessionEvent::Transcript(reply) => {
                    let _ = reply.send(self.transcript.to_vec());
                }
                SessionEvent::Capture(event) => self.on_capture_event(event).await,
                SessionEvent::Recognition(event) => self.on_recognition_event(event),
                SessionEvent::Tick => {
                    // The clock only runs while an answer is being recorded.
                    if self.state.recording_question().is_some() {
                        self.elapsed_seconds += 1;
                    }
                }
            }

            if self.state.is_terminal() {
                break;
            }
        }

        self.teardown().await;
        info!(
            "Session {} engine stopped ({})",
            self.session_id,
            self.state.label()
        );
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Result<(), EngineError> {
        match command {
            SessionCommand::DeviceTestStart => {
                if !matches!(self.state, SessionState::Setup { testing: false }) {
                    return Err(self.invalid("device_test_start"));
                }
                let frames = self.capture.start_recording().await?;
                let pump = spawn_pump(frames, ArtifactRecorder::new(None), None);
                self.span = Some(ActiveSpan {
                    epoch: self.epoch,
                    question: None,
                    pump,
                });
                self.state = SessionState::Setup { testing: true };
                Ok(())
            }

            SessionCommand::DeviceTestStop => {
                if !matches!(self.state, SessionState::Setup { testing: true }) {
                    return Err(self.invalid("device_test_stop"));
                }
                match self.stop_span().await {
                    Ok(artifact) => {
                        // The test artifact only proves the device works.
                        if let Some(artifact) = artifact {
                            debug!(
                                "Device test recorded {}ms, discarding artifact",
                                artifact.duration_ms
                            );
                        }
                        self.state = SessionState::ReadyToStart;
                        Ok(())
                    }
                    Err(e) => {
                        self.state = SessionState::Setup { testing: false };
                        self.last_error = Some(e.to_string());
                        Err(e)
                    }
                }
            }

            SessionCommand::StartInterview => {
                if self.state != SessionState::ReadyToStart || self.questions.is_empty() {
                    return Err(self.invalid("start_interview"));
                }
                self.started_at = Some(Utc::now());
                self.elapsed_seconds = 0;
                let prompt = self.questions[0].prompt.clone();
                self.transcript.append_prompt(&prompt, 0);
                self.state = SessionState::Active {
                    question: 0,
                    phase: QuestionPhase::Idle,
                };
                info!("Session {} interview started", self.session_id);
                Ok(())
            }

            SessionCommand::StartRecording => match self.state {
                SessionState::Active {
                    question,
                    phase: QuestionPhase::Idle,
                } => self.begin_recording(question).await,
                _ => Err(self.invalid("start_recording")),
            },

            SessionCommand::Retest => match self.state {
                SessionState::Active {
                    question,
                    phase: QuestionPhase::Answered,
                } => self.begin_recording(question).await,
                _ => Err(self.invalid("retest")),
            },

            SessionCommand::StopRecording => match self.state.recording_question() {
                Some(question) => {
                    self.finish_recording(question).await;
                    Ok(())
                }
                None => Err(self.invalid("stop_recording")),
            },

            SessionCommand::Next => match self.state {
                SessionState::Active {
                    question,
                    phase: QuestionPhase::Answered,
                } if question + 1 < self.questions.len() => {
                    let next = question + 1;
                    let prompt = self.questions[next].prompt.clone();
                    self.transcript.append_prompt(&prompt, self.elapsed_seconds);
                    // Fresh hypothesis so nothing bleeds across questions
                    self.hypothesis.clear();
                    if let Some(recognizer) = &self.recognizer {
                        if let Err(e) = recognizer.reset_hypothesis().await {
                            warn!("Failed to reset hypothesis: {}", e);
                        }
                    }
                    self.state = SessionState::Active {
                        question: next,
                        phase: QuestionPhase::Idle,
                    };
                    Ok(())
                }
                _ => Err(self.invalid("next")),
            },

            SessionCommand::Finish => {
                let allowed = matches!(
                    self.state,
                    SessionState::Active {
                        phase: QuestionPhase::Idle | QuestionPhase::Answered,
                        ..
                    } | SessionState::Finalizing
                );
                if !allowed {
                    return Err(self.invalid("finish"));
                }
                self.state = SessionState::Finalizing;
                self.finalize().await
            }

            SessionCommand::Abandon => {
                if self.state.is_terminal() {
                    return Err(self.invalid("abandon"));
                }
                self.abort_active().await;
                self.capture.release();
                self.state = SessionState::Abandoned;
                info!("Session {} abandoned", self.session_id);
                Ok(())
            }

            SessionCommand::UpdateNotes(text) => {
                if self.state.is_terminal() {
                    return Err(self.invalid("update_notes"));
                }
                self.notes = text;
                Ok(())
            }

            SessionCommand::SetTrackEnabled(kind, enabled) => match self.state {
                SessionState::Setup { .. }
                | SessionState::ReadyToStart
                | SessionState::Active { .. } => self.capture.set_track_enabled(kind, enabled),
                _ => Err(self.invalid("set_track_enabled")),
            },
        }
    }

    /// Open a new listening epoch and recording span for one question.
    /// Used both for the first take and for retests; a retest's artifact
    /// and ledger text overwrite the prior ones.
    async fn begin_recording(&mut self, question: usize) -> Result<(), EngineError> {
        self.epoch = self.epoch.next();
        let epoch = self.epoch;

        let frames = self.capture.start_recording().await?;

        self.hypothesis.clear();
        self.listening = false;
        let mut transcriber = None;
        if !self.recognition_disabled {
            if let Some(recognizer) = &self.recognizer {
                match recognizer.start_listening(epoch).await {
                    Ok(()) => {
                        self.listening = true;
                        transcriber = Some(Arc::clone(recognizer));
                    }
                    Err(EngineError::RecognitionUnsupported) => {
                        warn!(
                            "Session {}: recognition unsupported, transcription disabled",
                            self.session_id
                        );
                        self.recognition_disabled = true;
                        self.last_error =
                            Some(EngineError::RecognitionUnsupported.to_string());
                    }
                    Err(e) => {
                        // Recording proceeds without transcription for this turn
                        warn!("Session {}: recognition failed to start: {}", self.session_id, e);
                        self.last_error = Some(e.to_string());
                    }
                }
            }
        }

        let spill_path = self.artifact_dir.as_ref().map(|dir| {
            dir.join(format!("{}-q{}.wav", self.session_id, question + 1))
        });
        let pump = spawn_pump(frames, ArtifactRecorder::new(spill_path), transcriber);

        self.span = Some(ActiveSpan {
            epoch,
            question: Some(question),
            pump,
        });
        self.state = SessionState::Active {
            question,
            phase: QuestionPhase::Recording,
        };
        info!(
            "Session {}: recording question {} under {}",
            self.session_id,
            question + 1,
            epoch
        );
        Ok(())
    }

    /// Stop the in-flight answer span and attribute its artifact.
    ///
    /// The transition to Answered always happens: a capture failure means
    /// the take has no artifact, not that the machine is stuck recording.
    async fn finish_recording(&mut self, question: usize) {
        self.close_listening().await;

        match self.stop_span().await {
            Ok(Some(artifact)) => {
                debug!(
                    "Session {}: question {} artifact {}ms ({} bytes)",
                    self.session_id,
                    question + 1,
                    artifact.duration_ms,
                    artifact.data.len()
                );
                // Overwrites any artifact from a previous take
                self.questions[question].artifact = Some(artifact);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Session {}: failed to finalize recording for question {}: {}",
                    self.session_id,
                    question + 1,
                    e
                );
                self.last_error = Some(e.to_string());
            }
        }

        self.questions[question].answered = true;
        self.state = SessionState::Active {
            question,
            phase: QuestionPhase::Answered,
        };

        if question + 1 == self.questions.len() {
            debug!("Session {}: last question answered", self.session_id);
        }
    }

    /// Close the current listening epoch, if one is open. Every
    /// recognition result that arrives afterwards fails the epoch fence
    /// and is dropped.
    async fn close_listening(&mut self) {
        if !self.listening {
            return;
        }
        self.listening = false;
        if let Some(recognizer) = &self.recognizer {
            if let Err(e) = recognizer.stop_listening().await {
                warn!("Failed to stop listening: {}", e);
            }
        }
    }

    /// Stop the capture span and fold its frames into one artifact.
    async fn stop_span(&mut self) -> Result<Option<MediaArtifact>, EngineError> {
        let Some(span) = self.span.take() else {
            return Ok(None);
        };
        debug!(
            "Stopping span {} (question {:?})",
            span.epoch, span.question
        );

        if let Err(e) = self.capture.stop_recording().await {
            span.pump.abort();
            return Err(e);
        }

        match span.pump.await {
            Ok(Ok(artifact)) => Ok(Some(artifact)),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(EngineError::Capture(format!("recording pump failed: {}", e))),
        }
    }

    /// Unconditional cancellation of any in-flight span and epoch.
    async fn abort_active(&mut self) {
        self.close_listening().await;
        if let Some(span) = self.span.take() {
            if let Err(e) = self.capture.stop_recording().await {
                warn!("Failed to stop capture during abort: {}", e);
            }
            span.pump.abort();
        }
    }

    async fn finalize(&mut self) -> Result<(), EngineError> {
        let ids: Vec<i64> = self.questions.iter().map(|q| q.id).collect();
        let payload = build_payload(&self.notes, self.elapsed_seconds, &ids, &self.ledger);

        match self.store.save_results(self.interview_id, &payload).await {
            Ok(()) => {
                info!(
                    "Session {} finalized: {} min, {} questions",
                    self.session_id,
                    payload.duration,
                    payload.interview_questions.len()
                );
                self.capture.release();
                self.state = SessionState::Complete;
                Ok(())
            }
            Err(e) => {
                // Ledger and payload inputs stay untouched; the identical
                // payload can be resubmitted with another Finish.
                warn!(
                    "Session {} finalize failed, awaiting retry: {}",
                    self.session_id, e
                );
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn on_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::TrackEnded { kind, message } => {
                warn!(
                    "Session {}: {} track ended unexpectedly: {}",
                    self.session_id,
                    kind.as_str(),
                    message
                );
                self.last_error = Some(format!("{} track ended: {}", kind.as_str(), message));

                match self.state {
                    SessionState::Active {
                        question,
                        phase: QuestionPhase::Recording,
                    } => {
                        // Salvage whatever the span captured before the loss.
                        self.finish_recording(question).await;
                    }
                    SessionState::Setup { testing: true } => {
                        self.abort_active().await;
                        self.state = SessionState::Setup { testing: false };
                    }
                    _ => {}
                }
            }
        }
    }

    fn on_recognition_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result { epoch, hypothesis } => {
                // Epoch fence: only results for the open epoch of the
                // question currently recording may touch the ledger or the
                // transcript log.
                let Some(question) = self.state.recording_question() else {
                    debug!("Dropping out-of-state recognition result from {}", epoch);
                    return;
                };
                if !self.listening || epoch != self.epoch {
                    debug!("Dropping stale recognition result from {}", epoch);
                    return;
                }

                let confidence = hypothesis.confidence();
                match &hypothesis {
                    Hypothesis::Partial { text, .. } => self.hypothesis.set_interim(text),
                    Hypothesis::Final { text, .. } => self.hypothesis.commit(text),
                }

                let text = self.hypothesis.text();
                if text.is_empty() {
                    return;
                }
                self.ledger.write(question, text.clone());
                self.transcript
                    .merge_candidate(&text, self.elapsed_seconds, confidence, epoch);
            }

            RecognitionEvent::TransientError { epoch, message } => {
                if epoch == self.epoch && self.listening {
                    warn!(
                        "Session {}: recognition error on {}: {} (recording continues)",
                        self.session_id, epoch, message
                    );
                    self.listening = false;
                    self.last_error = Some(format!("speech recognition: {}", message));
                }
            }
        }
    }

    async fn teardown(&mut self) {
        self.abort_active().await;
        // Release-on-every-exit-path; the call is idempotent for paths
        // that already released.
        self.capture.release();
    }

    fn invalid(&self, command: &'static str) -> EngineError {
        EngineError::InvalidCommand {
            command,
            state: self.state.to_string(),
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            session_id: self.session_id.clone(),
            interview_id: self.interview_id,
            position: self.position.clone(),
            state: self.state.label().to_string(),
            question: self.state.current_question(),
            phase: self.state.phase().map(|p| p.as_str().to_string()),
            elapsed_seconds: self.elapsed_seconds,
            started_at: self.started_at,
            notes: self.notes.clone(),
            recognition_disabled: self.recognition_disabled,
            last_error: self.last_error.clone(),
            questions: self
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionStatus {
                    id: q.id,
                    prompt: q.prompt.clone(),
                    ordinal: i,
                    answered: q.answered,
                    has_artifact: q.artifact.is_some(),
                    answer: self.ledger.answer(i).to_string(),
                })
                .collect(),
        }
    }
}

/// Forward one span's frames into the artifact recorder and, while a
/// listening epoch is open, to the recognizer. Resolves with the span's
/// artifact once the frame channel closes.
fn spawn_pump(
    mut frames: mpsc::Receiver<MediaFrame>,
    mut recorder: ArtifactRecorder,
    transcriber: Option<Arc<dyn TranscriptionEngine>>,
) -> JoinHandle<Result<MediaArtifact, EngineError>> {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            recorder.push(&frame)?;
            if let Some(transcriber) = &transcriber {
                if let Err(e) = transcriber.feed_audio(&frame).await {
                    // Transcription degradation, not a recording failure
                    debug!("feed_audio failed: {}", e);
                }
            }
        }
        recorder.finish()
    })
}
