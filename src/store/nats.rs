use serde::Deserialize;
use tracing::info;

use super::{InterviewDefinition, InterviewStore};
use crate::error::EngineError;
use crate::session::finalize::FinalizePayload;

/// Interview store backed by NATS request/reply against the product
/// backend.
pub struct NatsStore {
    client: async_nats::Client,
}

/// Error envelope the backend replies with on failure.
#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

#[derive(Debug, Deserialize)]
struct AckReply {
    #[serde(default)]
    ok: bool,
}

impl NatsStore {
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        info!("Connecting to interview store at {}", url);

        let client = async_nats::connect(url).await.map_err(|e| {
            EngineError::PersistenceFailure(format!("store unreachable at {}: {}", url, e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl InterviewStore for NatsStore {
    async fn fetch(&self, interview_id: i64) -> Result<InterviewDefinition, EngineError> {
        let subject = format!("interview.definition.{}", interview_id);

        let reply = self
            .client
            .request(subject, "".into())
            .await
            .map_err(|e| EngineError::PersistenceFailure(format!("definition request: {}", e)))?;

        if let Ok(err) = serde_json::from_slice::<ErrorReply>(&reply.payload) {
            if err.error.contains("not found") {
                return Err(EngineError::InterviewNotFound(interview_id));
            }
            return Err(EngineError::PersistenceFailure(err.error));
        }

        serde_json::from_slice(&reply.payload).map_err(|e| {
            EngineError::PersistenceFailure(format!("malformed interview definition: {}", e))
        })
    }

    async fn save_results(
        &self,
        interview_id: i64,
        payload: &FinalizePayload,
    ) -> Result<(), EngineError> {
        let subject = format!("interview.results.{}", interview_id);
        let body = serde_json::to_vec(payload)
            .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;

        let reply = self
            .client
            .request(subject, body.into())
            .await
            .map_err(|e| EngineError::PersistenceFailure(format!("results request: {}", e)))?;

        if let Ok(err) = serde_json::from_slice::<ErrorReply>(&reply.payload) {
            return Err(EngineError::PersistenceFailure(err.error));
        }

        match serde_json::from_slice::<AckReply>(&reply.payload) {
            Ok(ack) if ack.ok => {
                info!("Interview {} results persisted", interview_id);
                Ok(())
            }
            _ => Err(EngineError::PersistenceFailure(
                "store did not acknowledge the update".to_string(),
            )),
        }
    }
}
