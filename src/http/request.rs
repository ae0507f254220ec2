//! Request identity.
//!
//! Every request gets an `x-request-id` as early as possible so log lines
//! across the pipeline correlate; the id is propagated onto the response.

use axum::http::Request;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request header that opts a single request into debug tracing.
pub const X_GATEWAY_DEBUG: &str = "x-gateway-debug";

/// Generates a UUIDv4 request id for requests arriving without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4()
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}
