pub mod engine;
pub mod messages;
pub mod nats;
pub mod scripted;

pub use engine::{Epoch, Hypothesis, RecognitionEvent, TranscriptionEngine};
pub use messages::{AudioFrameMessage, ListenControlMessage, TranscriptMessage};
pub use nats::NatsRecognizer;
pub use scripted::ScriptedRecognizer;
