//! Backend pool management.
//!
//! # Responsibilities
//! - Group backends into named pools from configuration
//! - Select a backend per dispatch attempt via the pool's strategy
//! - Hand out connection guards for active-connection tracking

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::load_balancer::backend::{Backend, ConnectionGuard};
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::LoadBalancer;

/// Manages backend pools and selection.
#[derive(Debug)]
pub struct BackendManager {
    pools: HashMap<String, (Vec<Arc<Backend>>, RoundRobin)>,
}

impl BackendManager {
    /// Build pools from configuration. Backends with unparsable addresses
    /// are skipped with a warning; validation normally catches them first.
    pub fn new(configs: Vec<BackendConfig>) -> Self {
        let mut grouped: HashMap<String, Vec<Arc<Backend>>> = HashMap::new();
        for config in configs {
            match config.address.parse() {
                Ok(addr) => {
                    let backend = Arc::new(Backend::new(addr, config.max_connections));
                    grouped.entry(config.pool.clone()).or_default().push(backend);
                }
                Err(_) => {
                    tracing::warn!(
                        backend = %config.name,
                        address = %config.address,
                        "invalid backend address, skipping"
                    );
                }
            }
        }

        let pools = grouped
            .into_iter()
            .map(|(name, backends)| (name, (backends, RoundRobin::new())))
            .collect();

        Self { pools }
    }

    /// Select a backend from the named pool.
    ///
    /// Returns a guard that releases the connection slot on drop, or
    /// `None` when the pool is unknown, all backends are unhealthy, or
    /// every healthy backend is saturated.
    pub fn get(&self, pool: &str) -> Option<ConnectionGuard> {
        let Some((backends, strategy)) = self.pools.get(pool) else {
            tracing::debug!(pool = %pool, "unknown backend pool");
            return None;
        };

        match strategy.next_server(backends) {
            Some(backend) => backend.try_acquire(),
            None => {
                tracing::debug!(pool = %pool, backend_count = backends.len(), "no healthy backends in pool");
                None
            }
        }
    }

    /// All backends across every pool.
    pub fn all_backends(&self) -> Vec<Arc<Backend>> {
        self.pools
            .values()
            .flat_map(|(backends, _)| backends.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pool: &str, address: &str) -> BackendConfig {
        BackendConfig {
            name: format!("{pool}-{address}"),
            pool: pool.to_string(),
            address: address.to_string(),
            max_connections: 4,
        }
    }

    #[test]
    fn test_pools_grouped_by_name() {
        let manager = BackendManager::new(vec![
            config("api", "127.0.0.1:3000"),
            config("api", "127.0.0.1:3001"),
            config("static", "127.0.0.1:4000"),
        ]);

        assert_eq!(manager.all_backends().len(), 3);
        assert!(manager.get("api").is_some());
        assert!(manager.get("static").is_some());
        assert!(manager.get("missing").is_none());
    }
}
