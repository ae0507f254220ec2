//! Production dispatcher: local endpoints and origin forwarding.
//!
//! # Responsibilities
//! - Serve the local health endpoint without touching the network
//! - Forward proxy-targeted requests to a backend from the routed pool
//! - Retry idempotent requests with jittered backoff under a budget
//! - Record one attempt per origin contact and classify terminal failures

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::schema::{HealthConfig, RetryConfig, TimeoutConfig};
use crate::dispatch::Dispatch;
use crate::filters::routing::{ENDPOINT_HEALTHCHECK, ENDPOINT_PROXY};
use crate::load_balancer::BackendManager;
use crate::pipeline::context::{ErrorCause, GatewayError, SessionContext, StatusCategory};
use crate::resilience::{calculate_backoff, is_idempotent, is_retryable, RetryBudget};
use crate::trace::attempts::Attempt;
use crate::trace::passport::events;

/// Largest request body buffered for replay across retry attempts.
const MAX_REPLAY_BODY: usize = 4 * 1024 * 1024;

/// Dispatcher backed by the backend pools and a hyper client.
pub struct ProxyDispatcher {
    backends: Arc<BackendManager>,
    client: Client<HttpConnector, Body>,
    retry: RetryConfig,
    timeouts: TimeoutConfig,
    health: HealthConfig,
    budget: Arc<RetryBudget>,
}

impl ProxyDispatcher {
    pub fn new(
        backends: Arc<BackendManager>,
        retry: RetryConfig,
        timeouts: TimeoutConfig,
        health: HealthConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let budget = Arc::new(RetryBudget::new(retry.budget_ratio, 100));
        Self {
            backends,
            client,
            retry,
            timeouts,
            health,
            budget,
        }
    }

    fn healthcheck(&self, ctx: &mut SessionContext) -> Response<Body> {
        ctx.set_status_category(StatusCategory::Success);
        Response::new(Body::from("OK"))
    }

    async fn forward(&self, request: Request<Body>, ctx: &mut SessionContext) -> Response<Body> {
        let Some(pool) = ctx.route_pool().map(str::to_owned) else {
            tracing::error!("proxy dispatch without a routed pool");
            ctx.set_error(GatewayError::Dispatch {
                target: "<unrouted>".into(),
                cause: ErrorCause::Unknown,
            });
            ctx.set_status_category(StatusCategory::OriginError);
            return status_response(StatusCode::SERVICE_UNAVAILABLE);
        };

        let (parts, body) = request.into_parts();
        let retriable = self.retry.enabled && is_idempotent(&parts.method);

        // Retriable requests buffer the body so attempts can replay it;
        // everything else gets exactly one attempt with the live body.
        let mut one_shot_body = None;
        let replay_bytes: Option<Bytes> = if retriable {
            match axum::body::to_bytes(body, MAX_REPLAY_BODY).await {
                Ok(bytes) => Some(bytes),
                Err(_) => {
                    tracing::warn!(pool = %pool, "request body exceeds replay buffer");
                    ctx.set_status_category(StatusCategory::Failure);
                    return status_response(StatusCode::PAYLOAD_TOO_LARGE);
                }
            }
        } else {
            one_shot_body = Some(body);
            None
        };

        let max_attempts = if replay_bytes.is_some() {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        self.budget.record_request();

        let attempt_timeout = Duration::from_secs(self.timeouts.attempt_secs);
        let mut attempt_no = 0;

        loop {
            attempt_no += 1;

            let Some(backend) = self.backends.get(&pool) else {
                tracing::warn!(pool = %pool, "no available backends");
                ctx.set_error(GatewayError::Dispatch {
                    target: pool,
                    cause: ErrorCause::Unknown,
                });
                ctx.set_status_category(StatusCategory::OriginError);
                return status_response(StatusCode::SERVICE_UNAVAILABLE);
            };
            let target = backend.addr.to_string();

            let attempt_body = match &replay_bytes {
                Some(bytes) => Body::from(bytes.clone()),
                None => one_shot_body.take().unwrap_or_else(Body::empty),
            };
            let Some(attempt_request) = build_attempt_request(&parts, &target, attempt_body) else {
                ctx.set_error(GatewayError::Dispatch {
                    target,
                    cause: ErrorCause::Unknown,
                });
                ctx.set_status_category(StatusCategory::OriginError);
                return status_response(StatusCode::BAD_GATEWAY);
            };

            ctx.record_event(events::ORIGIN_ATTEMPT);
            let started = Instant::now();

            match tokio::time::timeout(attempt_timeout, self.client.request(attempt_request)).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    ctx.record_attempt(Attempt::status(target.as_str(), status.as_u16(), started.elapsed()));

                    if attempt_no < max_attempts
                        && is_retryable(&parts.method, Some(status), false)
                        && self.budget.try_acquire()
                    {
                        backend.mark_failure(self.health.unhealthy_threshold as usize);
                        let delay = calculate_backoff(
                            attempt_no,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(
                            target = %target,
                            attempt = attempt_no,
                            status = %status,
                            delay = ?delay,
                            "retrying after origin error status"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status.is_server_error() {
                        backend.mark_failure(self.health.unhealthy_threshold as usize);
                        ctx.set_error(GatewayError::Dispatch {
                            target,
                            cause: ErrorCause::Origin5xx,
                        });
                        ctx.set_status_category(StatusCategory::Failure);
                    } else {
                        backend.mark_success(self.health.healthy_threshold as usize);
                        ctx.set_status_category(StatusCategory::Success);
                    }

                    let (parts, body) = response.into_parts();
                    return Response::from_parts(parts, Body::new(body));
                }
                Ok(Err(error)) => {
                    ctx.record_attempt(Attempt::error(target.as_str(), error.to_string(), started.elapsed()));
                    backend.mark_failure(self.health.unhealthy_threshold as usize);

                    if attempt_no < max_attempts
                        && is_retryable(&parts.method, None, true)
                        && self.budget.try_acquire()
                    {
                        let delay = calculate_backoff(
                            attempt_no,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(
                            target = %target,
                            attempt = attempt_no,
                            error = %error,
                            delay = ?delay,
                            "retrying after connection error"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let cause = if error.is_connect() {
                        ErrorCause::ConnectionRefused
                    } else {
                        ErrorCause::Unknown
                    };
                    tracing::error!(target = %target, error = %error, "origin unreachable");
                    ctx.set_error(GatewayError::Dispatch { target, cause });
                    ctx.set_status_category(StatusCategory::OriginError);
                    return status_response(StatusCode::BAD_GATEWAY);
                }
                Err(_elapsed) => {
                    ctx.record_attempt(Attempt::error(target.as_str(), "attempt timed out", started.elapsed()));
                    backend.mark_failure(self.health.unhealthy_threshold as usize);

                    if attempt_no < max_attempts
                        && is_retryable(&parts.method, None, true)
                        && self.budget.try_acquire()
                    {
                        let delay = calculate_backoff(
                            attempt_no,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(target = %target, attempt = attempt_no, "retrying after timeout");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::error!(target = %target, "origin attempt timed out");
                    ctx.set_error(GatewayError::Dispatch {
                        target,
                        cause: ErrorCause::Timeout,
                    });
                    ctx.set_status_category(StatusCategory::OriginError);
                    return status_response(StatusCode::GATEWAY_TIMEOUT);
                }
            }
        }
    }
}

#[async_trait]
impl Dispatch for ProxyDispatcher {
    async fn dispatch(&self, request: Request<Body>, ctx: &mut SessionContext) -> Response<Body> {
        ctx.record_event(events::DISPATCH_START);
        let endpoint = ctx.endpoint().map(str::to_owned);

        let response = match endpoint.as_deref() {
            Some(ENDPOINT_HEALTHCHECK) => self.healthcheck(ctx),
            Some(ENDPOINT_PROXY) => self.forward(request, ctx).await,
            other => {
                tracing::error!(endpoint = ?other, "unknown dispatch target");
                ctx.set_error(GatewayError::Dispatch {
                    target: other.unwrap_or("<unset>").to_string(),
                    cause: ErrorCause::Unknown,
                });
                ctx.set_status_category(StatusCategory::Failure);
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        ctx.record_event(events::DISPATCH_COMPLETE);
        response
    }
}

/// Rebuild the request for one origin attempt, rewriting the URI to the
/// backend's authority.
fn build_attempt_request(
    parts: &axum::http::request::Parts,
    target: &str,
    body: Body,
) -> Option<Request<Body>> {
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Authority::from_str(target).ok();
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(axum::http::uri::PathAndQuery::from_static("/"));
    }
    let uri = Uri::from_parts(uri_parts).ok()?;

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    builder.body(body).ok()
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
