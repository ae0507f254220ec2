//! Request filter pipeline.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → context.rs (SessionContext created)
//!     → chain.rs (inbound phase, ascending filter order)
//!     → routing decision sets the dispatch target in the context
//!     → dispatcher executes the target (local or proxied)
//!     → chain.rs (outbound phase, ends with the response annotator)
//!     → Response returned
//! ```
//!
//! # Design Decisions
//! - Two-phase chains share one generic `Filter<M>` trait; no inheritance
//! - The context is an explicit `&mut` parameter, never ambient state
//! - Inbound faults skip dispatch but never skip the outbound phase

pub mod chain;
pub mod context;
pub mod filter;

pub use chain::{FilterChain, PhaseOutcome};
pub use context::SessionContext;
pub use filter::{Filter, FilterError, Phase};
