//! Retry gating.
//!
//! # Responsibilities
//! - Decide whether a failed attempt may be retried (idempotent methods
//!   only; connection errors always, response statuses only for 502/503/504)
//! - Enforce a global retry budget so retries cannot amplify an outage
//!
//! # Design Decisions
//! - Non-idempotent methods (POST, PATCH) never retry
//! - The budget is a fixed fraction of observed requests plus a small
//!   floor so cold starts can still retry

use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::{Method, StatusCode};

/// Methods safe to replay against an origin.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Whether a failed attempt may be retried.
pub fn is_retryable(method: &Method, status: Option<StatusCode>, connect_error: bool) -> bool {
    if !is_idempotent(method) {
        return false;
    }
    if connect_error {
        return true;
    }
    matches!(
        status,
        Some(StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT)
    )
}

/// Global retry budget shared across requests.
///
/// Retries are allowed while the retry count stays under
/// `requests * ratio + floor`. Counters are atomics; the budget is the
/// only retry state shared across requests.
#[derive(Debug)]
pub struct RetryBudget {
    ratio: f32,
    floor: u64,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl RetryBudget {
    pub fn new(ratio: f32, floor: u64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            floor,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Count one incoming request toward the budget.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Consume one retry from the budget. Returns false when exhausted.
    pub fn try_acquire(&self) -> bool {
        let requests = self.requests.load(Ordering::Relaxed);
        let allowed = (requests as f64 * self.ratio as f64) as u64 + self.floor;
        let mut retries = self.retries.load(Ordering::Relaxed);
        loop {
            if retries >= allowed {
                return false;
            }
            match self.retries.compare_exchange_weak(
                retries,
                retries + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(x) => retries = x,
            }
        }
    }
}
