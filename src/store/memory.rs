use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{InterviewDefinition, InterviewStore};
use crate::error::EngineError;
use crate::session::finalize::FinalizePayload;

/// In-memory interview store for tests and the scripted demo.
///
/// Supports failure injection: `fail_saves(n)` makes the next `n`
/// `save_results` calls fail with `PersistenceFailure`, which is how the
/// finalize-retry path is exercised.
#[derive(Default)]
pub struct InMemoryStore {
    interviews: Mutex<HashMap<i64, InterviewDefinition>>,
    saved: Mutex<Vec<(i64, FinalizePayload)>>,
    failing_saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: InterviewDefinition) {
        self.interviews
            .lock()
            .expect("interviews lock poisoned")
            .insert(definition.id, definition);
    }

    /// Make the next `n` save calls fail.
    pub fn fail_saves(&self, n: usize) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// All successfully saved payloads, in submission order.
    pub fn saved(&self) -> Vec<(i64, FinalizePayload)> {
        self.saved.lock().expect("saved lock poisoned").clone()
    }

    /// The most recently saved payload, if any.
    pub fn last_saved(&self) -> Option<FinalizePayload> {
        self.saved
            .lock()
            .expect("saved lock poisoned")
            .last()
            .map(|(_, payload)| payload.clone())
    }
}

#[async_trait::async_trait]
impl InterviewStore for InMemoryStore {
    async fn fetch(&self, interview_id: i64) -> Result<InterviewDefinition, EngineError> {
        self.interviews
            .lock()
            .expect("interviews lock poisoned")
            .get(&interview_id)
            .cloned()
            .ok_or(EngineError::InterviewNotFound(interview_id))
    }

    async fn save_results(
        &self,
        interview_id: i64,
        payload: &FinalizePayload,
    ) -> Result<(), EngineError> {
        let remaining = self.failing_saves.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_saves.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::PersistenceFailure(
                "injected store failure".to_string(),
            ));
        }

        self.saved
            .lock()
            .expect("saved lock poisoned")
            .push((interview_id, payload.clone()));
        Ok(())
    }
}
