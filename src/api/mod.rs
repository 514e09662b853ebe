//! HTTP API for the medication-entry surface and the encounter workflow.
//!
//! Routes are nested under `/api/`. `safety_api_router()` returns a `Router`
//! that can be mounted on any axum server instance; `server` runs it as a
//! standalone service.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::safety_api_router;
pub use server::{start_server, SafetyApiServer};
pub use types::ApiContext;
