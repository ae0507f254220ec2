//! HTTP edge gateway built around a two-phase filter pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                 EDGE GATEWAY                  │
//!                       │                                               │
//!     Client Request    │  ┌────────┐   ┌──────────────────────────┐   │
//!     ──────────────────┼─▶│  http  │──▶│ inbound chain             │   │
//!                       │  │ server │   │   routing decision (0)    │   │
//!                       │  └────────┘   └───────────┬──────────────┘   │
//!                       │                           │ SessionContext   │
//!                       │                           ▼                  │
//!                       │               ┌──────────────────────────┐   │
//!                       │               │ dispatch                  │   │
//!                       │               │   healthcheck → local     │◀──┼── backend
//!                       │               │   proxy → pool + retries  │──▶│   pools
//!                       │               └───────────┬──────────────┘   │
//!                       │                           ▼                  │
//!     Client Response   │               ┌──────────────────────────┐   │
//!     ◀─────────────────┼───────────────│ outbound chain            │   │
//!                       │               │   response annotator (999)│   │
//!                       │               └──────────────────────────┘   │
//!                       │                                               │
//!                       │  config (hot reload) · trace · observability  │
//!                       └──────────────────────────────────────────────┘
//! ```

// Core pipeline
pub mod dispatch;
pub mod filters;
pub mod pipeline;
pub mod trace;

// Boundary and collaborators
pub mod config;
pub mod http;
pub mod load_balancer;
pub mod resilience;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use http::{Gateway, GatewayServer};
pub use lifecycle::Shutdown;
pub use pipeline::SessionContext;
