pub mod memory;
pub mod nats;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::session::finalize::FinalizePayload;

pub use memory::InMemoryStore;
pub use nats::NatsStore;

/// One question of an interview definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: i64,
    pub question: String,
    /// Previously saved answer, if any
    #[serde(default)]
    pub answer: String,
}

/// The interview definition fetched when a session opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDefinition {
    pub id: i64,
    /// Position title the interview is for
    pub position: String,
    /// Expected duration in minutes, for display
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub notes: String,
    pub questions: Vec<InterviewQuestion>,
}

/// Persistence collaborator for interview definitions and results.
///
/// The engine fetches one definition when a session opens and submits one
/// completion payload when it finalizes. A failed submission must leave
/// the caller able to retry with the identical payload.
#[async_trait::async_trait]
pub trait InterviewStore: Send + Sync {
    async fn fetch(&self, interview_id: i64) -> Result<InterviewDefinition, EngineError>;

    async fn save_results(
        &self,
        interview_id: i64,
        payload: &FinalizePayload,
    ) -> Result<(), EngineError>;
}
