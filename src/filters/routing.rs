//! Routing decision filter.
//!
//! # Responsibilities
//! - Inspect the request path and set the dispatch target in the context
//! - Consult route rules in declaration order; first match wins
//! - Apply the implicit default rule (proxy to the default pool)
//!
//! # Design Decisions
//! - Path matching is exact and case-insensitive
//! - `/healthcheck` is a reserved rule checked before configured rules,
//!   so health probes can never be shadowed or proxied
//! - Rules come from the current config snapshot; a reload is observed
//!   on the next request

use axum::body::Body;
use axum::http::Request;

use crate::config::ConfigHandle;
use crate::pipeline::context::SessionContext;
use crate::pipeline::filter::{Filter, FilterError};
use crate::trace::passport::events;

/// Reserved path served by the local health endpoint.
pub const HEALTHCHECK_PATH: &str = "/healthcheck";

/// Endpoint name for requests served by the local health handler.
pub const ENDPOINT_HEALTHCHECK: &str = "healthcheck";

/// Endpoint name for requests forwarded to an origin.
pub const ENDPOINT_PROXY: &str = "proxy";

/// Inbound filter that decides how a request is dispatched.
///
/// Runs first (order 0) and sets the dispatch target exactly once per
/// request; the one-shot contract on the context turns a second routing
/// pass into a phase failure instead of a silent overwrite.
pub struct RoutingDecision {
    config: ConfigHandle,
}

impl RoutingDecision {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }
}

impl Filter<Request<Body>> for RoutingDecision {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn order(&self) -> i32 {
        0
    }

    fn apply(&self, request: &mut Request<Body>, ctx: &mut SessionContext) -> Result<(), FilterError> {
        let config = self.config.snapshot();
        let path = request.uri().path().to_string();

        if path.eq_ignore_ascii_case(HEALTHCHECK_PATH) {
            ctx.set_endpoint(ENDPOINT_HEALTHCHECK)
                .map_err(|e| FilterError::new(e.to_string()))?;
            ctx.add_routing_debug(format!("{path} -> local endpoint {ENDPOINT_HEALTHCHECK}"));
        } else if let Some(rule) = config
            .routes
            .iter()
            .find(|r| r.path.eq_ignore_ascii_case(&path))
        {
            match (&rule.endpoint, &rule.pool) {
                (Some(endpoint), _) => {
                    ctx.set_endpoint(endpoint.clone())
                        .map_err(|e| FilterError::new(e.to_string()))?;
                    ctx.add_routing_debug(format!("{path} -> local endpoint {endpoint}"));
                }
                (None, Some(pool)) => {
                    ctx.set_endpoint(ENDPOINT_PROXY)
                        .map_err(|e| FilterError::new(e.to_string()))?;
                    ctx.set_route_pool(pool.clone());
                    ctx.add_routing_debug(format!("{path} -> pool {pool}"));
                }
                // Validation rejects targetless rules; treat one as unmatched.
                (None, None) => {
                    ctx.set_endpoint(ENDPOINT_PROXY)
                        .map_err(|e| FilterError::new(e.to_string()))?;
                    ctx.set_route_pool(config.routing.default_pool.clone());
                }
            }
        } else {
            ctx.set_endpoint(ENDPOINT_PROXY)
                .map_err(|e| FilterError::new(e.to_string()))?;
            ctx.set_route_pool(config.routing.default_pool.clone());
            ctx.add_routing_debug(format!(
                "{path} -> default pool {}",
                config.routing.default_pool
            ));
        }

        ctx.record_event(events::ROUTING_COMPLETE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{GatewayConfig, RouteRuleConfig};

    fn request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    fn routing(config: GatewayConfig) -> RoutingDecision {
        RoutingDecision::new(ConfigHandle::new(config))
    }

    #[test]
    fn test_healthcheck_routes_locally_any_case() {
        let filter = routing(GatewayConfig::default());
        for path in ["/healthcheck", "/HealthCheck", "/HEALTHCHECK"] {
            let mut ctx = SessionContext::new();
            filter.apply(&mut request(path), &mut ctx).unwrap();

            assert_eq!(ctx.endpoint(), Some(ENDPOINT_HEALTHCHECK));
            assert_eq!(ctx.route_pool(), None);
        }
    }

    #[test]
    fn test_unmatched_path_proxies_to_default_pool() {
        let filter = routing(GatewayConfig::default());
        let mut ctx = SessionContext::new();
        filter.apply(&mut request("/anything-else"), &mut ctx).unwrap();

        assert_eq!(ctx.endpoint(), Some(ENDPOINT_PROXY));
        assert_eq!(ctx.route_pool(), Some("api"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteRuleConfig {
            path: "/orders".into(),
            endpoint: None,
            pool: Some("orders".into()),
        });
        config.routes.push(RouteRuleConfig {
            path: "/ORDERS".into(),
            endpoint: None,
            pool: Some("shadowed".into()),
        });
        let filter = routing(config);
        let mut ctx = SessionContext::new();
        filter.apply(&mut request("/Orders"), &mut ctx).unwrap();

        assert_eq!(ctx.endpoint(), Some(ENDPOINT_PROXY));
        assert_eq!(ctx.route_pool(), Some("orders"));
    }

    #[test]
    fn test_rule_can_target_local_endpoint() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteRuleConfig {
            path: "/status".into(),
            endpoint: Some("status".into()),
            pool: None,
        });
        let filter = routing(config);
        let mut ctx = SessionContext::new();
        filter.apply(&mut request("/status"), &mut ctx).unwrap();

        assert_eq!(ctx.endpoint(), Some("status"));
        assert_eq!(ctx.route_pool(), None);
    }

    #[test]
    fn test_second_routing_pass_is_an_error() {
        let filter = routing(GatewayConfig::default());
        let mut ctx = SessionContext::new();
        let mut req = request("/a");

        filter.apply(&mut req, &mut ctx).unwrap();
        let err = filter.apply(&mut req, &mut ctx).unwrap_err();
        assert!(err.to_string().contains("already set"));
        assert_eq!(ctx.endpoint(), Some(ENDPOINT_PROXY));
    }

    #[test]
    fn test_routing_debug_trail_when_enabled() {
        let filter = routing(GatewayConfig::default());
        let mut ctx = SessionContext::new();
        ctx.set_debug(true);
        filter.apply(&mut request("/x"), &mut ctx).unwrap();

        assert!(!ctx.routing_debug().is_empty());
        assert!(ctx.routing_debug()[0].contains("default pool"));
    }
}
