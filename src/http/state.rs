use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::{CaptureSettings, RecognitionSettings};
use crate::session::SessionHandle;
use crate::store::InterviewStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Capture adapter settings applied to every new session
    pub capture: CaptureSettings,
    /// STT bridge settings applied to every new session
    pub recognition: RecognitionSettings,
    /// Persistence collaborator shared by all sessions
    pub store: Arc<dyn InterviewStore>,
    /// Active sessions (session_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl AppState {
    pub fn new(
        capture: CaptureSettings,
        recognition: RecognitionSettings,
        store: Arc<dyn InterviewStore>,
    ) -> Self {
        Self {
            capture,
            recognition,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
