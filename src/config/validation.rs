//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject ambiguous route rules (duplicate or reserved paths)
//! - Check referential integrity (rules reference existing pools)
//! - Validate value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::filters::routing::HEALTHCHECK_PATH;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("route {index}: exactly one of `endpoint` or `pool` must be set")]
    AmbiguousRouteTarget { index: usize },

    #[error("duplicate route rule for path {path}")]
    DuplicateRoute { path: String },

    #[error("path {0} is reserved for the health endpoint")]
    ReservedRoute(String),

    #[error("route for {path} references unknown pool {pool}")]
    UnknownPool { path: String, pool: String },

    #[error("default pool {0} has no backends")]
    UnknownDefaultPool(String),

    #[error("backend {name} has invalid address {address}")]
    InvalidBackendAddress { name: String, address: String },

    #[error("retry budget ratio {0} must be within 0.0..=1.0")]
    InvalidBudgetRatio(f32),

    #[error("retry max_attempts must be at least 1")]
    InvalidMaxAttempts,
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let pools: Vec<&str> = config.backends.iter().map(|b| b.pool.as_str()).collect();

    let mut seen_paths: Vec<String> = Vec::new();
    for (index, rule) in config.routes.iter().enumerate() {
        let lowered = rule.path.to_ascii_lowercase();

        if lowered == HEALTHCHECK_PATH {
            errors.push(ValidationError::ReservedRoute(rule.path.clone()));
        }
        if seen_paths.contains(&lowered) {
            errors.push(ValidationError::DuplicateRoute {
                path: rule.path.clone(),
            });
        }
        seen_paths.push(lowered);

        match (&rule.endpoint, &rule.pool) {
            (Some(_), None) => {}
            (None, Some(pool)) => {
                if !config.backends.is_empty() && !pools.contains(&pool.as_str()) {
                    errors.push(ValidationError::UnknownPool {
                        path: rule.path.clone(),
                        pool: pool.clone(),
                    });
                }
            }
            _ => errors.push(ValidationError::AmbiguousRouteTarget { index }),
        }
    }

    if !config.backends.is_empty() && !pools.contains(&config.routing.default_pool.as_str()) {
        errors.push(ValidationError::UnknownDefaultPool(
            config.routing.default_pool.clone(),
        ));
    }

    for backend in &config.backends {
        if backend.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBackendAddress {
                name: backend.name.clone(),
                address: backend.address.clone(),
            });
        }
    }

    if !(0.0..=1.0).contains(&config.retries.budget_ratio) {
        errors.push(ValidationError::InvalidBudgetRatio(config.retries.budget_ratio));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::InvalidMaxAttempts);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
