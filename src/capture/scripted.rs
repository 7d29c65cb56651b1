use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::device::{CaptureConfig, CaptureDevice, CaptureEvent, MediaFrame, TrackKind};
use crate::error::EngineError;
use crate::session::event::EventSink;

/// How `request_access` should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Granted,
    Denied,
    Unavailable,
}

struct ActiveSpan {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Deterministic capture device that synthesizes PCM frames on a timer.
///
/// Used by the integration tests and the scripted demo. Supports failure
/// injection: access denial, device unavailability, and mid-span track loss.
pub struct ScriptedCapture {
    config: CaptureConfig,
    sink: Option<EventSink>,
    access: AccessMode,
    fail_after_frames: Option<u32>,
    accessed: AtomicBool,
    previewing: AtomicBool,
    released: AtomicBool,
    release_calls: AtomicUsize,
    audio_enabled: Arc<AtomicBool>,
    video_enabled: AtomicBool,
    span: Mutex<Option<ActiveSpan>>,
}

impl ScriptedCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            sink: None,
            access: AccessMode::Granted,
            fail_after_frames: None,
            accessed: AtomicBool::new(false),
            previewing: AtomicBool::new(false),
            released: AtomicBool::new(false),
            release_calls: AtomicUsize::new(0),
            audio_enabled: Arc::new(AtomicBool::new(true)),
            video_enabled: AtomicBool::new(true),
            span: Mutex::new(None),
        }
    }

    /// Attach the session event sink so injected failures reach the engine.
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Make `request_access` fail with `PermissionDenied`.
    pub fn deny_access(mut self) -> Self {
        self.access = AccessMode::Denied;
        self
    }

    /// Make `request_access` fail with `DeviceUnavailable`.
    pub fn unavailable(mut self) -> Self {
        self.access = AccessMode::Unavailable;
        self
    }

    /// Terminate the audio track after `frames` frames of the next span,
    /// emitting a `TrackEnded` event through the sink.
    pub fn fail_track_after(mut self, frames: u32) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }

    /// Whether `release` has been called at least once.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// How many times `release` has been called.
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// Whether the preview stream is currently live.
    pub fn previewing(&self) -> bool {
        self.previewing.load(Ordering::SeqCst)
    }

    fn stop_span(&self) -> Option<ActiveSpan> {
        let mut span = self.span.lock().expect("span lock poisoned");
        if let Some(active) = span.take() {
            active.stop.store(true, Ordering::SeqCst);
            Some(active)
        } else {
            None
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedCapture {
    async fn request_access(&self) -> Result<(), EngineError> {
        match self.access {
            AccessMode::Granted => {
                self.accessed.store(true, Ordering::SeqCst);
                debug!("scripted capture: access granted");
                Ok(())
            }
            AccessMode::Denied => Err(EngineError::PermissionDenied),
            AccessMode::Unavailable => Err(EngineError::DeviceUnavailable(
                "scripted device configured unavailable".to_string(),
            )),
        }
    }

    async fn start_preview(&self) -> Result<(), EngineError> {
        if !self.accessed.load(Ordering::SeqCst) {
            return Err(EngineError::Capture("access not requested".to_string()));
        }
        self.previewing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start_recording(&self) -> Result<mpsc::Receiver<MediaFrame>, EngineError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(EngineError::Capture("device already released".to_string()));
        }
        if !self.accessed.load(Ordering::SeqCst) {
            return Err(EngineError::Capture("access not requested".to_string()));
        }

        let mut span = self.span.lock().expect("span lock poisoned");
        if span.is_some() {
            return Err(EngineError::Capture(
                "recording span already in flight".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let stop = Arc::new(AtomicBool::new(false));

        let frame_ms = self.config.frame_duration_ms.max(1);
        let samples_per_frame =
            (self.config.sample_rate as u64 * frame_ms / 1000) as usize * self.config.channels as usize;
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let audio_enabled = Arc::clone(&self.audio_enabled);
        let fail_after = self.fail_after_frames;
        let sink = self.sink.clone();
        let stop_flag = Arc::clone(&stop);

        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            let mut frames_sent = 0u32;

            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                // Low-amplitude square wave while live, silence while muted
                let samples: Vec<i16> = if audio_enabled.load(Ordering::SeqCst) {
                    (0..samples_per_frame)
                        .map(|i| if (i / 40) % 2 == 0 { 2000 } else { -2000 })
                        .collect()
                } else {
                    vec![0i16; samples_per_frame]
                };

                let frame = MediaFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    break;
                }

                frames_sent += 1;
                if fail_after == Some(frames_sent) {
                    if let Some(sink) = &sink {
                        sink.capture(CaptureEvent::TrackEnded {
                            kind: TrackKind::Audio,
                            message: "scripted track loss".to_string(),
                        });
                    }
                    break; // dropping tx closes the frame channel
                }

                timestamp_ms += frame_ms;
                tokio::time::sleep(std::time::Duration::from_millis(frame_ms)).await;
            }
        });

        *span = Some(ActiveSpan { stop, task });
        info!("scripted capture: recording span started");
        Ok(rx)
    }

    async fn stop_recording(&self) -> Result<(), EngineError> {
        if let Some(active) = self.stop_span() {
            // Bounded by one frame interval
            let _ = active.task.await;
            info!("scripted capture: recording span stopped");
        }
        Ok(())
    }

    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), EngineError> {
        match kind {
            TrackKind::Audio => self.audio_enabled.store(enabled, Ordering::SeqCst),
            TrackKind::Video => self.video_enabled.store(enabled, Ordering::SeqCst),
        }
        Ok(())
    }

    fn release(&self) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        if self.released.swap(true, Ordering::SeqCst) {
            return; // already released
        }
        self.previewing.store(false, Ordering::SeqCst);
        if let Some(active) = self.stop_span() {
            active.task.abort();
        }
        debug!("scripted capture: released");
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
