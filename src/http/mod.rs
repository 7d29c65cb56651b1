//! HTTP control surface for the surrounding product UI
//!
//! This module exposes the session engine's commands and live queries:
//! - POST /interviews/:id/sessions - Open a session (setup + preview)
//! - POST /sessions/:id/test/{start,stop} - Device test recording
//! - POST /sessions/:id/start - Begin the interview
//! - POST /sessions/:id/record/{start,stop} - Answer recording
//! - POST /sessions/:id/{next,retest,finish,abandon} - Navigation
//! - PUT  /sessions/:id/{notes,tracks} - Session mutation
//! - GET  /sessions/:id/{status,transcript} - Live queries
//! - GET  /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
