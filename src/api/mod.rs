//! HTTP surface.
//!
//! A thin axum router over the document, push, and face modules, nested
//! under `/api/`. Every request passes through the request-id / access
//! log middleware.
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
