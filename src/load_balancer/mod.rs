//! Backend pools and selection.
//!
//! # Data Flow
//! ```text
//! Routing decision names a pool
//!     → pool.rs (look up pool, apply strategy)
//!     → round_robin.rs (rotate through healthy backends)
//!     → backend.rs (acquire connection slot, RAII guard)
//!     → Return guard or None
//! ```
//!
//! # Design Decisions
//! - Selection strategy is stateless over the pool; backends track their
//!   own connection counts and health atomically
//! - Unhealthy backends are excluded from selection
//! - Health is marked passively from dispatch outcomes

pub mod backend;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use backend::Backend;

/// Strategy for picking the next backend out of a pool.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

pub use pool::BackendManager;
