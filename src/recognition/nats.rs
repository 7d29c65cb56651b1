use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::engine::{Epoch, Hypothesis, RecognitionEvent, TranscriptionEngine};
use super::messages::{AudioFrameMessage, ListenControlMessage, TranscriptMessage};
use crate::capture::MediaFrame;
use crate::error::EngineError;
use crate::session::event::EventSink;

/// Speech recognition over NATS.
///
/// Captured PCM frames are published to the STT service; partial and
/// final transcripts come back on `stt.text.partial` / `stt.text.final`.
/// Epoch boundaries are announced on a control subject so the service can
/// segment utterances; services that echo the epoch get exact fencing,
/// otherwise events are tagged with the most recently opened epoch.
pub struct NatsRecognizer {
    client: async_nats::Client,
    session_id: String,
    language: String,
    sink: EventSink,
    epoch: Arc<AtomicU64>,
    listening: Arc<AtomicBool>,
    sequence: AtomicU32,
    subscriber_task: Mutex<Option<JoinHandle<()>>>,
}

impl NatsRecognizer {
    /// Connect to the STT bridge. A failed connection means continuous
    /// recognition is not available in this environment, which disables
    /// transcription for the session.
    pub async fn connect(
        url: &str,
        session_id: String,
        language: String,
        sink: EventSink,
    ) -> Result<Self, EngineError> {
        info!("Connecting to STT bridge at {}", url);

        let client = match async_nats::connect(url).await {
            Ok(client) => client,
            Err(e) => {
                warn!("STT bridge unreachable at {}: {}", url, e);
                return Err(EngineError::RecognitionUnsupported);
            }
        };

        Ok(Self {
            client,
            session_id,
            language,
            sink,
            epoch: Arc::new(AtomicU64::new(0)),
            listening: Arc::new(AtomicBool::new(false)),
            sequence: AtomicU32::new(0),
            subscriber_task: Mutex::new(None),
        })
    }

    fn control_subject(&self) -> String {
        format!("stt.control.session-{}", self.session_id)
    }

    fn audio_subject(&self) -> String {
        format!("audio.frame.session-{}", self.session_id)
    }

    async fn publish_control(&self, epoch: Epoch, action: &str) -> Result<(), EngineError> {
        let message = ListenControlMessage {
            session_id: self.session_id.clone(),
            epoch: epoch.0,
            action: action.to_string(),
            language: self.language.clone(),
        };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| EngineError::RecognitionTransient(e.to_string()))?;

        self.client
            .publish(self.control_subject(), payload.into())
            .await
            .map_err(|e| EngineError::RecognitionTransient(format!("control publish: {}", e)))
    }

    async fn publish_frame(
        &self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        is_final: bool,
    ) -> Result<(), EngineError> {
        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| EngineError::RecognitionTransient(e.to_string()))?;

        self.client
            .publish(self.audio_subject(), payload.into())
            .await
            .map_err(|e| EngineError::RecognitionTransient(format!("frame publish: {}", e)))
    }
}

#[async_trait::async_trait]
impl TranscriptionEngine for NatsRecognizer {
    async fn start_listening(&self, epoch: Epoch) -> Result<(), EngineError> {
        self.epoch.store(epoch.0, Ordering::SeqCst);
        self.listening.store(true, Ordering::SeqCst);

        let needs_subscriber = self
            .subscriber_task
            .lock()
            .expect("subscriber lock poisoned")
            .is_none();

        if needs_subscriber {
            // One subscription for the session's lifetime; the epoch tag on
            // each event is what scopes results, not the subscription.
            let subscriber = self
                .client
                .subscribe("stt.text.>")
                .await
                .map_err(|e| EngineError::RecognitionTransient(format!("subscribe: {}", e)))?;

            let task = tokio::spawn(run_subscriber(
                subscriber,
                self.session_id.clone(),
                self.sink.clone(),
                Arc::clone(&self.epoch),
                Arc::clone(&self.listening),
            ));
            *self
                .subscriber_task
                .lock()
                .expect("subscriber lock poisoned") = Some(task);
        }

        info!("Listening epoch {} opened", epoch);
        self.publish_control(epoch, "start").await
    }

    async fn feed_audio(&self, frame: &MediaFrame) -> Result<(), EngineError> {
        if !self.listening.load(Ordering::SeqCst) {
            return Ok(());
        }
        let pcm_bytes: Vec<u8> = frame
            .samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        self.publish_frame(&pcm_bytes, frame.sample_rate, frame.channels, false)
            .await
    }

    async fn stop_listening(&self) -> Result<(), EngineError> {
        let epoch = Epoch(self.epoch.load(Ordering::SeqCst));
        self.listening.store(false, Ordering::SeqCst);

        // Final frame marker, then the epoch close
        self.publish_frame(&[], 16000, 1, true).await?;
        self.publish_control(epoch, "stop").await?;

        info!("Listening epoch {} closed", epoch);
        Ok(())
    }

    async fn reset_hypothesis(&self) -> Result<(), EngineError> {
        let epoch = Epoch(self.epoch.load(Ordering::SeqCst));
        self.publish_control(epoch, "reset").await
    }

    fn name(&self) -> &str {
        "nats"
    }
}

impl Drop for NatsRecognizer {
    fn drop(&mut self) {
        if let Some(task) = self
            .subscriber_task
            .lock()
            .expect("subscriber lock poisoned")
            .take()
        {
            task.abort();
        }
    }
}

async fn run_subscriber(
    mut subscriber: async_nats::Subscriber,
    session_id: String,
    sink: EventSink,
    epoch: Arc<AtomicU64>,
    listening: Arc<AtomicBool>,
) {
    info!("Transcript subscriber started");

    while let Some(msg) = subscriber.next().await {
        match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
            Ok(transcript) => {
                if transcript.session_id != session_id {
                    continue;
                }

                let event_epoch = transcript
                    .epoch
                    .map(Epoch)
                    .unwrap_or_else(|| Epoch(epoch.load(Ordering::SeqCst)));

                let hypothesis = if transcript.partial {
                    Hypothesis::Partial {
                        text: transcript.text,
                        confidence: transcript.confidence,
                    }
                } else {
                    Hypothesis::Final {
                        text: transcript.text,
                        confidence: transcript.confidence,
                    }
                };

                sink.recognition(RecognitionEvent::Result {
                    epoch: event_epoch,
                    hypothesis,
                })
                .await;
            }
            Err(e) => {
                warn!("Failed to parse transcript message: {}", e);
            }
        }
    }

    // The subscription dying mid-epoch is a transient recognition failure;
    // the session keeps recording without transcription for that turn.
    if listening.load(Ordering::SeqCst) {
        sink.recognition(RecognitionEvent::TransientError {
            epoch: Epoch(epoch.load(Ordering::SeqCst)),
            message: "transcript subscription closed".to_string(),
        })
        .await;
    }

    info!("Transcript subscriber stopped");
}
