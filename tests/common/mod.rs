// Shared fixtures for the session engine integration tests.
//
// Sessions are driven entirely through scripted adapters and a manually
// ticked clock, so every test observes a deterministic ordering: commands,
// injected events and ticks all flow through the engine's single queue in
// the order they are sent, and a status round-trip acts as a barrier.

use std::path::PathBuf;
use std::sync::Arc;

use huntboard_interview::{
    new_session_id, session_channel, CaptureConfig, CaptureDevice, EventSink, InMemoryStore,
    InterviewDefinition, InterviewQuestion, ScriptedCapture, ScriptedRecognizer, SessionCommand,
    SessionEngine, SessionHandle, SessionOptions, TranscriptionEngine,
};

pub const INTERVIEW_ID: i64 = 7;

pub fn sample_interview(question_count: usize) -> InterviewDefinition {
    InterviewDefinition {
        id: INTERVIEW_ID,
        position: "Backend Engineer".to_string(),
        duration: 30,
        notes: String::new(),
        questions: (0..question_count)
            .map(|i| InterviewQuestion {
                id: 100 + i as i64,
                question: format!("Question {}?", i + 1),
                answer: String::new(),
            })
            .collect(),
    }
}

/// Small frames so spans wrap up quickly in tests.
pub fn fast_capture_config() -> CaptureConfig {
    CaptureConfig {
        sample_rate: 16000,
        channels: 1,
        frame_duration_ms: 10,
        device_id: None,
    }
}

pub struct TestSession {
    pub handle: SessionHandle,
    pub capture: Arc<ScriptedCapture>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub store: Arc<InMemoryStore>,
    pub sink: EventSink,
}

pub async fn open_session(question_count: usize) -> TestSession {
    open_session_with(question_count, |capture| capture, None).await
}

pub async fn open_session_with<F>(
    question_count: usize,
    configure_capture: F,
    artifact_dir: Option<PathBuf>,
) -> TestSession
where
    F: FnOnce(ScriptedCapture) -> ScriptedCapture,
{
    let (sink, events) = session_channel();

    let capture = Arc::new(configure_capture(
        ScriptedCapture::new(fast_capture_config()).with_event_sink(sink.clone()),
    ));
    let recognizer = Arc::new(ScriptedRecognizer::new(sink.clone()));

    let store = Arc::new(InMemoryStore::new());
    store.insert(sample_interview(question_count));

    let options = SessionOptions {
        artifact_dir,
        // Tests drive the clock through the queue
        tick_interval: None,
    };

    let handle = SessionEngine::open(
        new_session_id(),
        INTERVIEW_ID,
        capture.clone() as Arc<dyn CaptureDevice>,
        Some(recognizer.clone() as Arc<dyn TranscriptionEngine>),
        store.clone(),
        sink.clone(),
        events,
        options,
    )
    .await
    .expect("session should open");

    TestSession {
        handle,
        capture,
        recognizer,
        store,
        sink,
    }
}

/// Drive the session from setup to the first question.
pub async fn to_first_question(session: &TestSession) {
    session
        .handle
        .command(SessionCommand::DeviceTestStart)
        .await
        .expect("device test should start");
    session
        .handle
        .command(SessionCommand::DeviceTestStop)
        .await
        .expect("device test should stop");
    session
        .handle
        .command(SessionCommand::StartInterview)
        .await
        .expect("interview should start");
}

/// Advance the session clock by `n` seconds.
pub async fn ticks(sink: &EventSink, n: u64) {
    for _ in 0..n {
        sink.tick().await;
    }
}

/// Wait until the engine task has fully stopped (its queue is gone).
pub async fn wait_closed(handle: &SessionHandle) {
    for _ in 0..200 {
        if handle.status().await.is_err() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("session did not close in time");
}
