// Serialization tests for the STT bridge wire messages.

use base64::Engine;
use huntboard_interview::recognition::{
    AudioFrameMessage, ListenControlMessage, TranscriptMessage,
};

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "session-test".to_string(),
        sequence: 0,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-06T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("session-test"));
    assert!(json.contains("16000"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"sequence\":0"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "session-test");
    assert_eq!(deserialized.sample_rate, 16000);
    assert_eq!(deserialized.channels, 1);
    assert!(!deserialized.final_frame);
}

#[test]
fn test_audio_frame_final_marker() {
    let msg = AudioFrameMessage {
        session_id: "session-test".to_string(),
        sequence: 10,
        pcm: String::new(), // Empty for final marker
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-06T14:30:00Z".to_string(),
        final_frame: true,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"final\":true"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert!(deserialized.final_frame);
    assert!(deserialized.pcm.is_empty());
    assert_eq!(deserialized.sequence, 10);
}

#[test]
fn test_transcript_message_with_epoch_echo() {
    let json = r#"{
        "session_id": "session-test",
        "text": "I have five years",
        "partial": false,
        "timestamp": "2026-08-06T14:30:02Z",
        "confidence": 0.92,
        "epoch": 3
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.text, "I have five years");
    assert!(!msg.partial);
    assert_eq!(msg.epoch, Some(3));
}

#[test]
fn test_transcript_message_without_epoch_echo() {
    // Older STT services do not echo the epoch; the field is optional
    let json = r#"{
        "session_id": "session-test",
        "text": "I have",
        "partial": true,
        "timestamp": "2026-08-06T14:30:01Z",
        "confidence": 0.4
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert_eq!(msg.epoch, None);
}

#[test]
fn test_listen_control_round_trip() {
    let msg = ListenControlMessage {
        session_id: "session-test".to_string(),
        epoch: 2,
        action: "start".to_string(),
        language: "en-US".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    let deserialized: ListenControlMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.epoch, 2);
    assert_eq!(deserialized.action, "start");
    assert_eq!(deserialized.language, "en-US");
}
