use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::debug;

use super::engine::{Epoch, Hypothesis, RecognitionEvent, TranscriptionEngine};
use crate::capture::MediaFrame;
use crate::error::EngineError;
use crate::session::event::EventSink;

#[derive(Default)]
struct Inner {
    epoch: Epoch,
    listening: bool,
}

/// Scripted recognizer for tests and demos.
///
/// The caller drives it: `emit_partial`/`emit_final`/`emit_error` push
/// events into the session queue tagged with the most recently opened
/// epoch, including after `stop_listening`. That is exactly how stale
/// deliveries are simulated for fencing tests.
pub struct ScriptedRecognizer {
    sink: EventSink,
    unsupported: bool,
    inner: Mutex<Inner>,
    frames_fed: AtomicUsize,
    resets: AtomicUsize,
    epochs_opened: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            unsupported: false,
            inner: Mutex::new(Inner::default()),
            frames_fed: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            epochs_opened: AtomicUsize::new(0),
        }
    }

    /// A recognizer whose environment does not support speech recognition:
    /// every `start_listening` fails with `RecognitionUnsupported`.
    pub fn unsupported(sink: EventSink) -> Self {
        Self {
            unsupported: true,
            ..Self::new(sink)
        }
    }

    fn current_epoch(&self) -> Epoch {
        self.inner.lock().expect("recognizer lock poisoned").epoch
    }

    pub async fn emit_partial(&self, text: &str, confidence: f32) {
        let epoch = self.current_epoch();
        self.sink
            .recognition(RecognitionEvent::Result {
                epoch,
                hypothesis: Hypothesis::Partial {
                    text: text.to_string(),
                    confidence,
                },
            })
            .await;
    }

    pub async fn emit_final(&self, text: &str, confidence: f32) {
        let epoch = self.current_epoch();
        self.sink
            .recognition(RecognitionEvent::Result {
                epoch,
                hypothesis: Hypothesis::Final {
                    text: text.to_string(),
                    confidence,
                },
            })
            .await;
    }

    pub async fn emit_error(&self, message: &str) {
        let epoch = self.current_epoch();
        self.sink
            .recognition(RecognitionEvent::TransientError {
                epoch,
                message: message.to_string(),
            })
            .await;
    }

    pub fn listening(&self) -> bool {
        self.inner.lock().expect("recognizer lock poisoned").listening
    }

    pub fn frames_fed(&self) -> usize {
        self.frames_fed.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn epochs_opened(&self) -> usize {
        self.epochs_opened.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptionEngine for ScriptedRecognizer {
    async fn start_listening(&self, epoch: Epoch) -> Result<(), EngineError> {
        if self.unsupported {
            return Err(EngineError::RecognitionUnsupported);
        }
        let mut inner = self.inner.lock().expect("recognizer lock poisoned");
        inner.epoch = epoch;
        inner.listening = true;
        drop(inner);
        self.epochs_opened.fetch_add(1, Ordering::SeqCst);
        debug!("scripted recognizer: listening on {}", epoch);
        Ok(())
    }

    async fn feed_audio(&self, _frame: &MediaFrame) -> Result<(), EngineError> {
        self.frames_fed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().expect("recognizer lock poisoned");
        inner.listening = false;
        Ok(())
    }

    async fn reset_hypothesis(&self) -> Result<(), EngineError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
