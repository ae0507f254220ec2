//! Per-request diagnostic recording.
//!
//! # Data Flow
//! ```text
//! Dispatcher contacts an origin
//!     → attempts.rs (one record per backend try: target, outcome, latency)
//!
//! Pipeline stages progress
//!     → passport.rs (timestamped event trail)
//!
//! Outbound phase
//!     → Response annotator reads both and renders headers / log dumps
//! ```
//!
//! # Design Decisions
//! - Both structures are append-only for a request's lifetime
//! - Owned by the session context; no cross-request sharing
//! - Attempt history serializes to JSON for the response header

pub mod attempts;
pub mod passport;

pub use attempts::{Attempt, AttemptOutcome, RequestAttempts};
pub use passport::Passport;
