//! Dispatch resilience: retry gating and backoff.
//!
//! The dispatcher owns the retry loop; this module supplies the policy
//! pieces — what may be retried, how long to wait, and how much retry
//! traffic the gateway tolerates overall.

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{is_idempotent, is_retryable, RetryBudget};
