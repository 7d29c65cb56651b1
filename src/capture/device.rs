use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::session::event::EventSink;

/// Media track kinds a capture device may own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

/// Captured media data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct MediaFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the recording span started
    pub timestamp_ms: u64,
}

/// Configuration for a capture device
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will resample if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
    /// Input device ID, or None for the system default
    pub device_id: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for the STT service
            channels: 1,        // Mono
            frame_duration_ms: 100,
            device_id: None,
        }
    }
}

/// Asynchronous notifications a capture device pushes into the session
/// queue outside the command/reply flow.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A hardware track terminated unexpectedly mid-recording.
    TrackEnded { kind: TrackKind, message: String },
}

/// Capture device port
///
/// Owns the camera/microphone hardware for the lifetime of one session.
/// Implementations:
/// - Microphone: real input device via cpal (audio track only)
/// - Scripted: deterministic frame generator for tests and demos
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire exclusive hardware access. Fails with `PermissionDenied` or
    /// `DeviceUnavailable`; both are fatal for the session attempt and are
    /// never retried automatically.
    async fn request_access(&self) -> Result<(), EngineError>;

    /// Begin the live preview stream. Side effect only, produces no frames.
    async fn start_preview(&self) -> Result<(), EngineError>;

    /// Begin one bounded recording span.
    ///
    /// Returns a channel receiver that will receive media frames until the
    /// span is stopped. At most one span may be in flight.
    async fn start_recording(&self) -> Result<mpsc::Receiver<MediaFrame>, EngineError>;

    /// End the current recording span. The frame channel closes once the
    /// remaining buffered frames have been delivered. A no-op when no span
    /// is in flight.
    async fn stop_recording(&self) -> Result<(), EngineError>;

    /// Mutate track enablement without re-requesting access.
    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), EngineError>;

    /// Stop all underlying tracks and give the hardware back. Idempotent:
    /// repeated calls are no-ops.
    fn release(&self);

    /// Device name for logging
    fn name(&self) -> &str;
}

/// RAII ownership token for the capture hardware.
///
/// The session engine releases explicitly on every exit path; the guard's
/// `Drop` backstops the release contract if the engine task unwinds.
pub struct CaptureGuard {
    device: Arc<dyn CaptureDevice>,
}

impl CaptureGuard {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self { device }
    }
}

impl Deref for CaptureGuard {
    type Target = dyn CaptureDevice;

    fn deref(&self) -> &Self::Target {
        self.device.as_ref()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.device.release();
    }
}

/// Capture device selection for the service configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// Real microphone input via cpal
    Microphone,
    /// Deterministic scripted frames (no hardware)
    Scripted,
}

/// Create a capture device based on the configured kind
pub fn create_device(
    kind: CaptureKind,
    config: CaptureConfig,
    sink: EventSink,
) -> Result<Arc<dyn CaptureDevice>, EngineError> {
    match kind {
        CaptureKind::Microphone => {
            let device = super::microphone::MicrophoneCapture::spawn(config, sink)?;
            Ok(Arc::new(device))
        }
        CaptureKind::Scripted => Ok(Arc::new(
            super::scripted::ScriptedCapture::new(config).with_event_sink(sink),
        )),
    }
}
