//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware, graceful shutdown)
//!     → request.rs (request id as early as possible)
//!     → Gateway::handle (pipeline: inbound chain → dispatch → outbound chain)
//!     → Response to client
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_GATEWAY_DEBUG, X_REQUEST_ID};
pub use server::{Gateway, GatewayServer};
