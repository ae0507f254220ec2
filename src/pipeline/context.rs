//! Per-request session context.
//!
//! # Responsibilities
//! - Carry all mutable per-request state through both filter phases
//! - Enforce the one-shot dispatch target and first-failure-wins error
//! - Accumulate the filter execution summary, attempt history and passport
//!
//! # Design Decisions
//! - Explicit value passed by `&mut` through every pipeline call, never
//!   ambient/global state
//! - A single request's phases run strictly sequentially, so the context
//!   needs no internal locking
//! - Debug trails are only collected when the debug flag is on

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use thiserror::Error;

use crate::pipeline::filter::Phase;
use crate::trace::attempts::{Attempt, RequestAttempts};
use crate::trace::passport::Passport;

/// Classification of a dispatch failure, surfaced in the error-cause header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
    Timeout,
    ConnectionRefused,
    Origin5xx,
    Unknown,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::Timeout => "TIMEOUT",
            ErrorCause::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorCause::Origin5xx => "ORIGIN_5XX",
            ErrorCause::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors recorded in the session context.
///
/// These are context state, not control flow: the pipeline keeps running
/// and the outbound phase attaches them to the error response.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Dispatch to an origin failed after the dispatcher exhausted its retries.
    #[error("dispatch to {target} failed: {cause}")]
    Dispatch { target: String, cause: ErrorCause },

    /// A filter raised an unrecoverable fault.
    #[error("filter {name} failed during {phase} phase: {reason}")]
    Filter {
        name: &'static str,
        phase: Phase,
        reason: String,
    },

    /// The inbound phase completed without setting a dispatch target.
    #[error("no dispatch target set after inbound phase")]
    MissingDispatchTarget,
}

impl GatewayError {
    /// The dispatch classification, when this error carries one.
    pub fn cause(&self) -> Option<ErrorCause> {
        match self {
            GatewayError::Dispatch { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

/// Returned when a second routing decision tries to overwrite the dispatch target.
#[derive(Debug, Clone, Error)]
#[error("dispatch target already set to {0}")]
pub struct EndpointAlreadySet(pub String);

/// One-word classification of how the request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// Dispatch completed and the final status is below 500.
    Success,
    /// A response was produced but the exchange failed (origin 5xx, filter fault).
    Failure,
    /// Transport-level failure reaching the origin (timeout, refused, no backends).
    OriginError,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Success => "SUCCESS",
            StatusCategory::Failure => "FAILURE",
            StatusCategory::OriginError => "ORIGIN_ERROR",
        }
    }
}

/// Outcome of a single filter execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Success,
    Skipped,
    Failed,
}

impl FilterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStatus::Success => "SUCCESS",
            FilterStatus::Skipped => "SKIPPED",
            FilterStatus::Failed => "FAILED",
        }
    }
}

/// One entry in the filter execution summary.
#[derive(Debug, Clone)]
pub struct FilterExecution {
    pub name: &'static str,
    pub status: FilterStatus,
    pub duration: Duration,
}

/// Routing-relevant view of the inbound request, captured at arrival.
///
/// The outbound phase uses it to reconstruct the externally visible URL
/// after the request itself has been consumed by dispatch.
#[derive(Debug, Clone, Default)]
pub struct InboundInfo {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub path_and_query: String,
}

impl InboundInfo {
    pub fn from_request(request: &Request<Body>) -> Self {
        let scheme = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http")
            .to_string();
        let host = request
            .uri()
            .host()
            .map(str::to_string)
            .or_else(|| {
                request
                    .headers()
                    .get("host")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        Self {
            method: request.method().to_string(),
            scheme,
            host,
            path_and_query,
        }
    }

    /// Reconstruct the externally visible request URL.
    pub fn originating_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path_and_query)
    }
}

/// Mutable state bag threaded through the whole pipeline, one per request.
///
/// Created at request arrival, mutated through inbound chain → dispatch →
/// outbound chain, discarded once the response is written.
#[derive(Debug, Default)]
pub struct SessionContext {
    endpoint: Option<String>,
    route_pool: Option<String>,
    error: Option<GatewayError>,
    status_category: Option<StatusCategory>,
    filter_summary: Vec<FilterExecution>,
    debug: bool,
    request_debug: Vec<String>,
    routing_debug: Vec<String>,
    attempts: RequestAttempts,
    passport: Passport,
    inbound: InboundInfo,
}

impl SessionContext {
    /// Empty context at request start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-populated with the inbound request view and debug flag.
    pub fn for_request(request: &Request<Body>, debug: bool) -> Self {
        let mut ctx = Self::new();
        ctx.inbound = InboundInfo::from_request(request);
        ctx.debug = debug;
        ctx
    }

    /// Set the dispatch target. The routing stage sets it exactly once;
    /// a second call is a deterministic error, never a silent overwrite.
    pub fn set_endpoint(&mut self, name: impl Into<String>) -> Result<(), EndpointAlreadySet> {
        match &self.endpoint {
            Some(existing) => Err(EndpointAlreadySet(existing.clone())),
            None => {
                self.endpoint = Some(name.into());
                Ok(())
            }
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn set_route_pool(&mut self, pool: impl Into<String>) {
        self.route_pool = Some(pool.into());
    }

    pub fn route_pool(&self) -> Option<&str> {
        self.route_pool.as_deref()
    }

    /// Store the first error; later calls are no-ops.
    pub fn set_error(&mut self, error: GatewayError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn error(&self) -> Option<&GatewayError> {
        self.error.as_ref()
    }

    pub fn set_status_category(&mut self, category: StatusCategory) {
        self.status_category = Some(category);
    }

    pub fn status_category(&self) -> Option<StatusCategory> {
        self.status_category
    }

    pub fn record_filter(&mut self, execution: FilterExecution) {
        self.filter_summary.push(execution);
    }

    pub fn filter_summary(&self) -> &[FilterExecution] {
        &self.filter_summary
    }

    /// Comma-separated `name[STATUS][3ms]` rendering for the summary header.
    pub fn filter_summary_string(&self) -> String {
        self.filter_summary
            .iter()
            .map(|e| format!("{}[{}][{}ms]", e.name, e.status.as_str(), e.duration.as_millis()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Append a request debug line. No-op unless the debug flag is on.
    pub fn add_request_debug(&mut self, line: impl Into<String>) {
        if self.debug {
            self.request_debug.push(line.into());
        }
    }

    pub fn request_debug(&self) -> &[String] {
        &self.request_debug
    }

    /// Append a routing debug line. No-op unless the debug flag is on.
    pub fn add_routing_debug(&mut self, line: impl Into<String>) {
        if self.debug {
            self.routing_debug.push(line.into());
        }
    }

    pub fn routing_debug(&self) -> &[String] {
        &self.routing_debug
    }

    /// Append a named event to the passport trail.
    pub fn record_event(&mut self, name: &'static str) {
        self.passport.record(name);
    }

    pub fn passport(&self) -> &Passport {
        &self.passport
    }

    pub fn record_attempt(&mut self, attempt: Attempt) {
        self.attempts.record(attempt);
    }

    pub fn attempts(&self) -> &RequestAttempts {
        &self.attempts
    }

    pub fn inbound(&self) -> &InboundInfo {
        &self.inbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::passport::events;

    #[test]
    fn test_endpoint_is_one_shot() {
        let mut ctx = SessionContext::new();
        assert!(ctx.set_endpoint("healthcheck").is_ok());
        assert_eq!(ctx.endpoint(), Some("healthcheck"));

        let err = ctx.set_endpoint("proxy").unwrap_err();
        assert_eq!(err.0, "healthcheck");
        assert_eq!(ctx.endpoint(), Some("healthcheck"));
    }

    #[test]
    fn test_first_error_wins() {
        let mut ctx = SessionContext::new();
        ctx.set_error(GatewayError::Dispatch {
            target: "api".into(),
            cause: ErrorCause::Timeout,
        });
        ctx.set_error(GatewayError::MissingDispatchTarget);

        assert_eq!(ctx.error().and_then(|e| e.cause()), Some(ErrorCause::Timeout));
    }

    #[test]
    fn test_event_trail_is_append_only() {
        let mut ctx = SessionContext::new();
        ctx.record_event(events::REQUEST_RECEIVED);
        ctx.record_event(events::ROUTING_COMPLETE);
        ctx.record_event(events::DISPATCH_START);

        let names: Vec<_> = ctx.passport().events().iter().map(|e| e.name.clone()).collect();
        assert_eq!(
            names,
            vec![events::REQUEST_RECEIVED, events::ROUTING_COMPLETE, events::DISPATCH_START]
        );
    }

    #[test]
    fn test_filter_summary_rendering() {
        let mut ctx = SessionContext::new();
        ctx.record_filter(FilterExecution {
            name: "routing",
            status: FilterStatus::Success,
            duration: Duration::from_millis(1),
        });
        ctx.record_filter(FilterExecution {
            name: "annotate",
            status: FilterStatus::Skipped,
            duration: Duration::ZERO,
        });

        assert_eq!(
            ctx.filter_summary_string(),
            "routing[SUCCESS][1ms], annotate[SKIPPED][0ms]"
        );
    }

    #[test]
    fn test_debug_trails_gated_by_flag() {
        let mut ctx = SessionContext::new();
        ctx.add_request_debug("GET /");
        assert!(ctx.request_debug().is_empty());

        ctx.set_debug(true);
        ctx.add_request_debug("GET /");
        ctx.add_routing_debug("matched default route");
        assert_eq!(ctx.request_debug().len(), 1);
        assert_eq!(ctx.routing_debug().len(), 1);
    }

    #[test]
    fn test_originating_url_reconstruction() {
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/users?page=2")
            .header("host", "edge.example.com")
            .body(Body::empty())
            .unwrap();
        let ctx = SessionContext::for_request(&request, false);

        assert_eq!(
            ctx.inbound().originating_url(),
            "http://edge.example.com/api/v1/users?page=2"
        );
    }
}
