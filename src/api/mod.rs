//! HTTP API: extraction, analysis and report retrieval.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance; `server` owns the listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
