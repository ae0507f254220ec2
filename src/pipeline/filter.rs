//! Filter abstraction.
//!
//! A filter is an immutable descriptor with a numeric order, an
//! applicability predicate and a transform step. One trait generic over
//! the message type covers both phases: `M = Request<Body>` for the
//! inbound phase, `M = Response<Body>` for the outbound phase.

use std::fmt;

use thiserror::Error;

use crate::pipeline::context::SessionContext;

/// Pipeline phase a chain executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Inbound,
    Outbound,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Inbound => f.write_str("inbound"),
            Phase::Outbound => f.write_str("outbound"),
        }
    }
}

/// Unrecoverable fault raised by a filter's transform step.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct FilterError(String);

impl FilterError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A unit of request or response transformation.
///
/// Filters transform the message in place and may replace it wholesale
/// (`*message = other`). They are stateless across requests; per-request
/// state lives in the [`SessionContext`]. A filter must never assume a
/// position relative to others except through its declared order.
pub trait Filter<M>: Send + Sync {
    /// Stable name used in the filter execution summary.
    fn name(&self) -> &'static str;

    /// Position within the phase. Lower runs first; ties are broken by
    /// registration order.
    fn order(&self) -> i32;

    /// Whether the filter applies to this message.
    fn should_apply(&self, _message: &M) -> bool {
        true
    }

    /// Transform the message, mutating the shared context as needed.
    fn apply(&self, message: &mut M, ctx: &mut SessionContext) -> Result<(), FilterError>;
}
