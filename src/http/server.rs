//! HTTP server and pipeline assembly.
//!
//! # Responsibilities
//! - Assemble the filter chains, dispatcher and config handle into a
//!   `Gateway` and run every request through it
//! - Wire middleware (request id, tracing, timeout) around the pipeline
//! - Apply config updates (next-request effect) and shut down gracefully
//!
//! # Design Decisions
//! - One axum fallback route: the pipeline owns all paths, including `/`
//! - The inbound chain, dispatch and outbound chain run strictly
//!   sequentially on the request task; a client disconnect drops the
//!   task and cancels in-flight dispatch

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigHandle, GatewayConfig};
use crate::dispatch::{Dispatch, ProxyDispatcher};
use crate::filters::{ResponseAnnotator, RoutingDecision};
use crate::http::request::{MakeRequestUuid, X_GATEWAY_DEBUG};
use crate::load_balancer::BackendManager;
use crate::observability::metrics;
use crate::pipeline::chain::FilterChain;
use crate::pipeline::context::{GatewayError, SessionContext, StatusCategory};
use crate::pipeline::filter::{Filter, Phase};
use crate::trace::passport::events;

/// The assembled request pipeline.
pub struct Gateway {
    inbound: FilterChain<Request<Body>>,
    outbound: FilterChain<Response<Body>>,
    dispatcher: Arc<dyn Dispatch>,
    config: ConfigHandle,
}

impl Gateway {
    /// Standard pipeline: routing decision inbound, response annotator
    /// outbound.
    pub fn new(config: ConfigHandle, dispatcher: Arc<dyn Dispatch>) -> Self {
        let inbound: Vec<Arc<dyn Filter<Request<Body>>>> =
            vec![Arc::new(RoutingDecision::new(config.clone()))];
        let outbound: Vec<Arc<dyn Filter<Response<Body>>>> =
            vec![Arc::new(ResponseAnnotator::new(config.clone()))];
        Self::with_filters(config, dispatcher, inbound, outbound)
    }

    /// Pipeline with custom filter sets. The chains order the filters;
    /// callers only declare them.
    pub fn with_filters(
        config: ConfigHandle,
        dispatcher: Arc<dyn Dispatch>,
        inbound: Vec<Arc<dyn Filter<Request<Body>>>>,
        outbound: Vec<Arc<dyn Filter<Response<Body>>>>,
    ) -> Self {
        Self {
            inbound: FilterChain::new(Phase::Inbound, inbound),
            outbound: FilterChain::new(Phase::Outbound, outbound),
            dispatcher,
            config,
        }
    }

    /// Full request lifecycle: context → inbound phase → dispatch →
    /// outbound phase.
    pub async fn handle(&self, mut request: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let config = self.config.snapshot();
        let debug = config.observability.debug_requests || debug_requested(&request);
        let method = request.method().to_string();

        let mut ctx = SessionContext::for_request(&request, debug);
        ctx.record_event(events::REQUEST_RECEIVED);
        if ctx.debug() {
            ctx.add_request_debug(format!("{} {}", method, request.uri()));
            for (name, value) in request.headers() {
                ctx.add_request_debug(format!("{}: {:?}", name, value));
            }
        }

        ctx.record_event(events::INBOUND_START);
        let inbound_outcome = self.inbound.run(&mut request, &mut ctx);
        ctx.record_event(events::INBOUND_COMPLETE);

        let mut response = if inbound_outcome.is_failed() {
            // Dispatch is skipped; the outbound phase still attaches
            // diagnostics to the synthesized error response.
            ctx.set_status_category(StatusCategory::Failure);
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        } else if ctx.endpoint().is_none() {
            // Routing post-condition: the inbound phase must have set a
            // dispatch target.
            tracing::error!("inbound phase completed without a dispatch target");
            ctx.set_error(GatewayError::MissingDispatchTarget);
            ctx.set_status_category(StatusCategory::Failure);
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            self.dispatcher.dispatch(request, &mut ctx).await
        };

        ctx.record_event(events::OUTBOUND_START);
        // Outbound faults are recorded in the context and never reach the
        // client; the response as transformed so far is returned.
        let _ = self.outbound.run(&mut response, &mut ctx);
        ctx.record_event(events::OUTBOUND_COMPLETE);

        metrics::record_request(
            &method,
            response.status().as_u16(),
            ctx.endpoint().unwrap_or("none"),
            started,
        );
        response
    }
}

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server hosting the gateway pipeline.
pub struct GatewayServer {
    router: Router,
    config: ConfigHandle,
}

impl GatewayServer {
    /// Create a server with the standard pipeline for this configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let handle = ConfigHandle::new(config.clone());
        let backends = Arc::new(BackendManager::new(config.backends.clone()));
        let dispatcher = Arc::new(ProxyDispatcher::new(
            backends,
            config.retries.clone(),
            config.timeouts.clone(),
            config.health.clone(),
        ));
        let gateway = Arc::new(Gateway::new(handle.clone(), dispatcher));

        let router = Self::build_router(&config, AppState { gateway });
        Self {
            router,
            config: handle,
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(pipeline_handler))
            .route("/", any(pipeline_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until the shutdown signal fires.
    ///
    /// Config updates received on `config_updates` are swapped in
    /// atomically and observed by the pipeline from the next request.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = self.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!("configuration updated; applies from the next request");
                handle.store(new_config);
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the pipeline.
async fn pipeline_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response<Body> {
    state.gateway.handle(request).await
}

fn debug_requested(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(X_GATEWAY_DEBUG)
        .map(|v| v.as_bytes() == b"true")
        .unwrap_or(false)
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
