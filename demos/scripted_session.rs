// Scripted Session Example: the full interview lifecycle without hardware
//
// Drives a complete session against the scripted capture device and
// recognizer:
// 1. Device test gates the ready screen
// 2. Three questions, two of them answered (one with a retest)
// 3. Finish builds the padded completion payload and persists it
//
// Usage: cargo run --example scripted_session

use std::sync::Arc;

use anyhow::Result;
use huntboard_interview::{
    new_session_id, session_channel, CaptureConfig, CaptureDevice, InMemoryStore,
    InterviewDefinition, InterviewQuestion, ScriptedCapture, ScriptedRecognizer, SessionCommand,
    SessionEngine, SessionOptions, TranscriptionEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let store = Arc::new(InMemoryStore::new());
    store.insert(InterviewDefinition {
        id: 1,
        position: "Platform Engineer".to_string(),
        duration: 20,
        notes: String::new(),
        questions: vec![
            InterviewQuestion {
                id: 10,
                question: "Tell me about yourself.".to_string(),
                answer: String::new(),
            },
            InterviewQuestion {
                id: 11,
                question: "Describe a hard bug you fixed.".to_string(),
                answer: String::new(),
            },
            InterviewQuestion {
                id: 12,
                question: "Why this role?".to_string(),
                answer: String::new(),
            },
        ],
    });

    let (sink, events) = session_channel();
    let capture = Arc::new(
        ScriptedCapture::new(CaptureConfig::default()).with_event_sink(sink.clone()),
    );
    let recognizer = Arc::new(ScriptedRecognizer::new(sink.clone()));

    let handle = SessionEngine::open(
        new_session_id(),
        1,
        capture.clone() as Arc<dyn CaptureDevice>,
        Some(recognizer.clone() as Arc<dyn TranscriptionEngine>),
        store.clone(),
        sink,
        events,
        SessionOptions::default(),
    )
    .await?;

    println!("Session {} open", handle.session_id());

    // Device test, then the interview proper
    handle.command(SessionCommand::DeviceTestStart).await?;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    handle.command(SessionCommand::DeviceTestStop).await?;
    handle.command(SessionCommand::StartInterview).await?;

    // Question 1
    handle.command(SessionCommand::StartRecording).await?;
    recognizer.emit_partial("I build", 0.5).await;
    recognizer
        .emit_final("I build backend services in Rust", 0.93)
        .await;
    handle.command(SessionCommand::StopRecording).await?;

    // Question 2, with a retake
    handle.command(SessionCommand::Next).await?;
    handle.command(SessionCommand::StartRecording).await?;
    recognizer.emit_final("a deadlock in", 0.4).await;
    handle.command(SessionCommand::StopRecording).await?;

    handle.command(SessionCommand::Retest).await?;
    recognizer
        .emit_final("a deadlock in our job scheduler under load", 0.9)
        .await;
    handle.command(SessionCommand::StopRecording).await?;

    handle
        .command(SessionCommand::UpdateNotes(
            "strong on systems questions".to_string(),
        ))
        .await?;

    println!("Transcript so far:");
    for segment in handle.transcript().await? {
        println!(
            "  [{:>4}s] {:?}: {}",
            segment.offset_seconds, segment.speaker, segment.text
        );
    }

    // Finish without recording question 3
    let snapshot = handle.command(SessionCommand::Finish).await?;
    println!("Session state: {}", snapshot.state);

    let payload = store.last_saved().expect("payload persisted");
    println!("Persisted payload:");
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}
