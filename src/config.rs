use anyhow::Result;
use serde::Deserialize;

use crate::capture::{CaptureConfig, CaptureKind};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
    pub recognition: RecognitionSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    /// Which capture device adapter to use
    pub kind: CaptureKind,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u64,
    /// Input device name, or None for the system default
    pub device: Option<String>,
    /// Directory recording artifacts are spilled into, if any
    pub artifact_dir: Option<String>,
}

impl CaptureSettings {
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frame_duration_ms: self.frame_duration_ms,
            device_id: self.device.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionSettings {
    /// Transcription can be turned off wholesale for the deployment
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// NATS URL of the STT bridge
    pub url: String,
    /// BCP-47 language tag forwarded to the recognizer
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// NATS URL of the interview store
    pub url: String,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_frame_duration_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en-US".to_string()
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
