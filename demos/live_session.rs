// Live Session Example: real microphone + NATS STT bridge
//
// Records one interview question end to end:
// 1. cpal captures the default microphone
// 2. PCM frames are published to NATS for the STT service
// 3. Partial/final transcripts stream back and are attributed to the
//    current question under its listening epoch
// 4. Finish submits the completion payload over NATS request/reply
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
// - An STT service consuming audio.frame.* and publishing stt.text.*
// - A responder on interview.definition.* / interview.results.*
//
// Usage: cargo run --example live_session

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use huntboard_interview::{
    new_session_id, session_channel, CaptureConfig, CaptureDevice, MicrophoneCapture,
    NatsRecognizer, NatsStore, SessionCommand, SessionEngine, SessionOptions,
    TranscriptionEngine,
};

const NATS_URL: &str = "nats://localhost:4222";
const INTERVIEW_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let session_id = new_session_id();
    let (sink, events) = session_channel();

    let capture = Arc::new(
        MicrophoneCapture::spawn(CaptureConfig::default(), sink.clone())
            .context("failed to start the capture thread")?,
    );

    let recognizer = NatsRecognizer::connect(
        NATS_URL,
        session_id.clone(),
        "en-US".to_string(),
        sink.clone(),
    )
    .await
    .ok()
    .map(|r| Arc::new(r) as Arc<dyn TranscriptionEngine>);
    if recognizer.is_none() {
        println!("STT bridge unreachable; recording without transcription");
    }

    let store = Arc::new(
        NatsStore::connect(NATS_URL)
            .await
            .context("failed to connect to the interview store")?,
    );

    let artifact_dir = PathBuf::from(shellexpand::tilde("~/huntboard-recordings").into_owned());
    let options = SessionOptions {
        artifact_dir: Some(artifact_dir.clone()),
        ..SessionOptions::default()
    };

    let handle = SessionEngine::open(
        session_id,
        INTERVIEW_ID,
        capture.clone() as Arc<dyn CaptureDevice>,
        recognizer,
        store,
        sink,
        events,
        options,
    )
    .await
    .context("failed to open the session")?;

    println!("Session {} open, testing the device...", handle.session_id());
    handle.command(SessionCommand::DeviceTestStart).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.command(SessionCommand::DeviceTestStop).await?;

    handle.command(SessionCommand::StartInterview).await?;
    let status = handle.status().await?;
    println!(
        "Question 1/{}: {}",
        status.questions.len(),
        status.questions[0].prompt
    );

    println!("Recording for 10 seconds, speak now...");
    handle.command(SessionCommand::StartRecording).await?;

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Some(segment) = handle.transcript().await?.last() {
            println!("  [{:>3}s] {}", handle.status().await?.elapsed_seconds, segment.text);
        }
    }

    let snapshot = handle.command(SessionCommand::StopRecording).await?;
    println!("Answer: {:?}", snapshot.questions[0].answer);
    println!("Artifacts in {}", artifact_dir.display());

    let snapshot = handle.command(SessionCommand::Finish).await?;
    println!("Session {}", snapshot.state);

    Ok(())
}
