//! Endpoint dispatch.
//!
//! # Data Flow
//! ```text
//! Inbound phase sets the dispatch target in the context
//!     → dispatch.rs executes it:
//!         healthcheck  → local handler, no network
//!         proxy        → pool lookup → origin forwarding with retries
//!     → attempts and failure classification recorded in the context
//!     → response handed to the outbound phase
//! ```
//!
//! # Design Decisions
//! - The dispatcher is a trait seam so the pipeline can be exercised
//!   with a stub (and so a test can prove the health endpoint never
//!   touches it)
//! - Failures are context state, never errors thrown past this boundary

mod dispatcher;

pub use dispatcher::ProxyDispatcher;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

use crate::pipeline::context::SessionContext;

/// Collaborator that executes the routing decision recorded in the context.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Produce a response for `request` according to the context's
    /// dispatch target. Always returns a well-formed response; failures
    /// are recorded in the context.
    async fn dispatch(&self, request: Request<Body>, ctx: &mut SessionContext) -> Response<Body>;
}
