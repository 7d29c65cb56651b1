use serde::{Deserialize, Serialize};

/// Audio frame message published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Listening-epoch control message published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct ListenControlMessage {
    pub session_id: String,
    pub epoch: u64,
    /// "start" | "stop" | "reset"
    pub action: String,
    /// BCP-47 language tag for the recognizer
    pub language: String,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    pub confidence: f32,
    /// Listening epoch echoed back by the service, when it supports it
    #[serde(default)]
    pub epoch: Option<u64>,
}
