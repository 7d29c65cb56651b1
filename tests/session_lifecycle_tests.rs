// Integration tests for the session lifecycle: device test gating,
// per-question answer cycle, retest, finish with unanswered questions,
// abandon, and the device/recognition failure paths.

mod common;

use common::{open_session, open_session_with, ticks, to_first_question};
use huntboard_interview::{
    new_session_id, session_channel, CaptureDevice, EngineError, InMemoryStore, ScriptedCapture,
    ScriptedRecognizer, SessionCommand, SessionEngine, SessionOptions, Speaker,
    TranscriptionEngine,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_full_session_with_unrecorded_last_question() {
    let session = open_session(3).await;
    to_first_question(&session).await;

    // Question 1
    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    ticks(&session.sink, 90).await;
    session
        .recognizer
        .emit_partial("I have 5 years", 0.6)
        .await;
    session
        .recognizer
        .emit_final("I have 5 years experience", 0.9)
        .await;
    let snapshot = session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();
    assert_eq!(snapshot.phase.as_deref(), Some("answered"));
    assert!(snapshot.questions[0].answered);
    assert!(snapshot.questions[0].has_artifact);
    assert_eq!(snapshot.questions[0].answer, "I have 5 years experience");

    // Question 2
    session.handle.command(SessionCommand::Next).await.unwrap();
    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    ticks(&session.sink, 35).await;
    session.recognizer.emit_final("I led a team of 4", 0.85).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    // Finish without ever recording question 3
    let snapshot = session.handle.command(SessionCommand::Finish).await.unwrap();
    assert_eq!(snapshot.state, "complete");

    let payload = session.store.last_saved().expect("payload saved");
    let answers: Vec<&str> = payload
        .interview_questions
        .iter()
        .map(|q| q.answer.as_str())
        .collect();
    assert_eq!(
        answers,
        vec!["I have 5 years experience", "I led a team of 4", ""]
    );
    assert_eq!(payload.interview_questions.len(), 3);
    // 125 recorded seconds round up to 3 minutes
    assert_eq!(payload.duration, 3);

    // Complete releases the capture hardware
    assert!(session.capture.released());
}

#[tokio::test]
async fn test_start_interview_gated_on_device_test() {
    let session = open_session(2).await;

    let err = session
        .handle
        .command(SessionCommand::StartInterview)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCommand { .. }));

    session
        .handle
        .command(SessionCommand::DeviceTestStart)
        .await
        .unwrap();
    let snapshot = session
        .handle
        .command(SessionCommand::DeviceTestStop)
        .await
        .unwrap();
    assert_eq!(snapshot.state, "ready");

    let snapshot = session
        .handle
        .command(SessionCommand::StartInterview)
        .await
        .unwrap();
    assert_eq!(snapshot.state, "active");
    assert_eq!(snapshot.question, Some(0));
    assert_eq!(snapshot.phase.as_deref(), Some("idle"));
    assert_eq!(snapshot.elapsed_seconds, 0);
}

#[tokio::test]
async fn test_recording_is_exclusive_per_question() {
    let session = open_session(2).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();

    // A second recording span cannot open while one is in flight
    let err = session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCommand { .. }));

    // Navigation is blocked while recording
    let err = session.handle.command(SessionCommand::Next).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidCommand { .. }));

    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.question, Some(0));
    assert_eq!(snapshot.phase.as_deref(), Some("recording"));
}

#[tokio::test]
async fn test_retest_overwrites_only_the_current_question() {
    let session = open_session(2).await;
    to_first_question(&session).await;

    // Record question 1
    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    session.recognizer.emit_final("answer one", 0.9).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    // Record question 2, then retest it before advancing
    session.handle.command(SessionCommand::Next).await.unwrap();
    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    session.recognizer.emit_final("answer two", 0.9).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    session.handle.command(SessionCommand::Retest).await.unwrap();
    session
        .recognizer
        .emit_final("answer two, take two", 0.9)
        .await;
    let snapshot = session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    // Question 2 overwritten, question 1 untouched
    assert_eq!(snapshot.questions[0].answer, "answer one");
    assert_eq!(snapshot.questions[1].answer, "answer two, take two");
    assert!(snapshot.questions[1].has_artifact);

    // One candidate entry per listening epoch, fully merged
    let transcript = session.handle.transcript().await.unwrap();
    let candidates: Vec<&str> = transcript
        .iter()
        .filter(|s| s.speaker == Speaker::Candidate)
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(
        candidates,
        vec!["answer one", "answer two", "answer two, take two"]
    );
}

#[tokio::test]
async fn test_abandon_stops_everything_and_persists_nothing() {
    let session = open_session(2).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    session.recognizer.emit_partial("half an answer", 0.5).await;

    let snapshot = session.handle.command(SessionCommand::Abandon).await.unwrap();
    assert_eq!(snapshot.state, "abandoned");

    assert!(session.capture.released());
    assert!(session.store.saved().is_empty());

    // The engine is gone; the handle reports the session closed
    let err = session.handle.status().await.unwrap_err();
    assert!(matches!(err, EngineError::SessionClosed));
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let session = open_session(1).await;
    to_first_question(&session).await;

    session.handle.command(SessionCommand::Abandon).await.unwrap();
    assert!(session.capture.released());

    // Let the engine finish its own teardown before counting calls
    common::wait_closed(&session.handle).await;
    let calls_after_teardown = session.capture.release_calls();
    assert!(calls_after_teardown >= 1);

    // Releasing again changes nothing observable
    session.capture.release();
    session.capture.release();
    assert!(session.capture.released());
    assert!(!session.capture.previewing());
    assert_eq!(session.capture.release_calls(), calls_after_teardown + 2);
}

#[tokio::test]
async fn test_track_loss_salvages_partial_recording() {
    // Five 10ms frames outlive the instant device test but die well within
    // the answer recording below
    let session = open_session_with(2, |capture| capture.fail_track_after(5), None).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.phase.as_deref(), Some("answered"));
    assert!(snapshot.questions[0].has_artifact, "partial artifact kept");
    assert!(snapshot
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("track ended"));

    // The user can retest the interrupted take
    session.handle.command(SessionCommand::Retest).await.unwrap();
}

#[tokio::test]
async fn test_permission_denied_is_fatal_for_the_attempt() {
    let (sink, events) = session_channel();
    let capture = Arc::new(
        ScriptedCapture::new(common::fast_capture_config())
            .with_event_sink(sink.clone())
            .deny_access(),
    );
    let store = Arc::new(InMemoryStore::new());
    store.insert(common::sample_interview(1));

    let result = SessionEngine::open(
        new_session_id(),
        common::INTERVIEW_ID,
        capture.clone() as Arc<dyn CaptureDevice>,
        None,
        store,
        sink,
        events,
        SessionOptions {
            artifact_dir: None,
            tick_interval: None,
        },
    )
    .await;

    assert!(matches!(result, Err(EngineError::PermissionDenied)));
    // The hardware token is given back even on the failed attempt
    assert!(capture.released());
}

#[tokio::test]
async fn test_unsupported_recognizer_disables_transcription_for_session() {
    let (sink, events) = session_channel();
    let capture = Arc::new(
        ScriptedCapture::new(common::fast_capture_config()).with_event_sink(sink.clone()),
    );
    let recognizer = Arc::new(ScriptedRecognizer::unsupported(sink.clone()));
    let store = Arc::new(InMemoryStore::new());
    store.insert(common::sample_interview(1));

    let handle = SessionEngine::open(
        new_session_id(),
        common::INTERVIEW_ID,
        capture.clone() as Arc<dyn CaptureDevice>,
        Some(recognizer.clone() as Arc<dyn TranscriptionEngine>),
        store,
        sink.clone(),
        events,
        SessionOptions {
            artifact_dir: None,
            tick_interval: None,
        },
    )
    .await
    .unwrap();

    handle.command(SessionCommand::DeviceTestStart).await.unwrap();
    handle.command(SessionCommand::DeviceTestStop).await.unwrap();
    handle.command(SessionCommand::StartInterview).await.unwrap();

    // Recording still works; transcription is flagged off session-wide
    let snapshot = handle.command(SessionCommand::StartRecording).await.unwrap();
    assert!(snapshot.recognition_disabled);
    let snapshot = handle.command(SessionCommand::StopRecording).await.unwrap();
    assert!(snapshot.questions[0].answered);
    assert_eq!(snapshot.questions[0].answer, "");
}

#[tokio::test]
async fn test_transient_recognition_error_keeps_recording() {
    let session = open_session(1).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    session.recognizer.emit_partial("so far so good", 0.7).await;
    session.recognizer.emit_error("socket reset").await;
    // Anything after the error belongs to a dead epoch
    session.recognizer.emit_partial("should be dropped", 0.7).await;

    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.phase.as_deref(), Some("recording"));
    assert_eq!(snapshot.questions[0].answer, "so far so good");
    assert!(snapshot
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("speech recognition"));

    let snapshot = session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();
    assert!(snapshot.questions[0].answered);
}

#[tokio::test]
async fn test_elapsed_only_advances_while_recording() {
    let session = open_session(1).await;
    to_first_question(&session).await;

    // Idle ticks do not move the clock
    ticks(&session.sink, 10).await;
    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.elapsed_seconds, 0);

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    ticks(&session.sink, 61).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    // Stopped ticks do not move it either
    ticks(&session.sink, 10).await;
    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.elapsed_seconds, 61);

    let snapshot = session.handle.command(SessionCommand::Finish).await.unwrap();
    assert_eq!(snapshot.state, "complete");
    // 61 seconds round up to 2 minutes
    assert_eq!(session.store.last_saved().unwrap().duration, 2);
}

#[tokio::test]
async fn test_exact_minute_does_not_round_up() {
    let session = open_session(1).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    ticks(&session.sink, 60).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();
    session.handle.command(SessionCommand::Finish).await.unwrap();

    assert_eq!(session.store.last_saved().unwrap().duration, 1);
}

#[tokio::test]
async fn test_notes_flow_into_the_payload() {
    let session = open_session(1).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::UpdateNotes(
            "remember to follow up on the second answer".to_string(),
        ))
        .await
        .unwrap();
    session.handle.command(SessionCommand::Finish).await.unwrap();

    assert_eq!(
        session.store.last_saved().unwrap().notes,
        "remember to follow up on the second answer"
    );
}

#[tokio::test]
async fn test_finalize_failure_is_retryable_without_data_loss() {
    let session = open_session(2).await;
    to_first_question(&session).await;

    session
        .handle
        .command(SessionCommand::StartRecording)
        .await
        .unwrap();
    session.recognizer.emit_final("the only answer", 0.9).await;
    session
        .handle
        .command(SessionCommand::StopRecording)
        .await
        .unwrap();

    session.store.fail_saves(1);
    let err = session.handle.command(SessionCommand::Finish).await.unwrap_err();
    assert!(matches!(err, EngineError::PersistenceFailure(_)));

    // Still finalizing, nothing lost
    let snapshot = session.handle.status().await.unwrap();
    assert_eq!(snapshot.state, "finalizing");
    assert_eq!(snapshot.questions[0].answer, "the only answer");

    // The retry submits the identical payload
    let snapshot = session.handle.command(SessionCommand::Finish).await.unwrap();
    assert_eq!(snapshot.state, "complete");
    let payload = session.store.last_saved().unwrap();
    assert_eq!(payload.interview_questions[0].answer, "the only answer");
    assert_eq!(payload.interview_questions[1].answer, "");
}
