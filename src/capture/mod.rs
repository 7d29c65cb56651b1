pub mod device;
pub mod microphone;
pub mod recorder;
pub mod scripted;

pub use device::{
    create_device, CaptureConfig, CaptureDevice, CaptureEvent, CaptureGuard, CaptureKind,
    MediaFrame, TrackKind,
};
pub use microphone::MicrophoneCapture;
pub use recorder::{ArtifactRecorder, MediaArtifact};
pub use scripted::ScriptedCapture;
