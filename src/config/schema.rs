//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route rules consulted in declaration order; first match wins.
    pub routes: Vec<RouteRuleConfig>,

    /// Routing defaults applied when no rule matches.
    pub routing: RoutingConfig,

    /// Backend server definitions, grouped into named pools.
    pub backends: Vec<BackendConfig>,

    /// Passive health marking thresholds.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for proxied dispatch.
    pub retries: RetryConfig,

    /// Diagnostic response header emission.
    pub response_headers: ResponseHeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A route rule: a path predicate mapped to a local endpoint or a pool.
///
/// Exactly one of `endpoint` or `pool` must be set. Path comparison is
/// case-insensitive. The `/healthcheck` path is reserved for the local
/// health endpoint and may not appear here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRuleConfig {
    /// Request path to match (exact, case-insensitive).
    pub path: String,

    /// Local endpoint to dispatch to.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Backend pool to proxy to.
    #[serde(default)]
    pub pool: Option<String>,
}

/// Defaults applied when no route rule matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Pool proxied to when no explicit rule matches.
    pub default_pool: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_pool: "api".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Pool this server belongs to.
    pub pool: String,

    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Maximum concurrent connections to this backend.
    #[serde(default = "default_max_backend_conns")]
    pub max_connections: usize,
}

fn default_max_backend_conns() -> usize {
    100
}

/// Passive health marking thresholds.
///
/// Backends are marked from dispatch outcomes only; there is no active
/// prober.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures before a backend is marked unhealthy.
    pub unhealthy_threshold: u32,

    /// Consecutive successes before a backend is marked healthy again.
    pub healthy_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout enforced at the server layer, in seconds.
    pub request_secs: u64,

    /// Per-attempt timeout for a single origin contact, in seconds.
    pub attempt_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            attempt_secs: 10,
        }
    }
}

/// Retry configuration for proxied dispatch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Fraction of recent requests that may be retries.
    pub budget_ratio: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            budget_ratio: 0.1,
        }
    }
}

/// Diagnostic response header emission.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseHeadersConfig {
    /// Emit the diagnostic headers on every response.
    pub enabled: bool,
}

impl Default for ResponseHeadersConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Expose the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Collect and emit per-request debug trails for every request.
    /// Individual requests can opt in with the `x-gateway-debug` header.
    pub debug_requests: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            debug_requests: false,
        }
    }
}
