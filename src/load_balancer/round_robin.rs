//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::LoadBalancer;

/// Round-robin selector with an internal rotation counter.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        // Scan at most one full rotation so an all-unhealthy pool
        // terminates with None.
        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = backends.len();
        for i in 0..len {
            let backend = &backends[(start + i) % len];
            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation() {
        let lb = RoundRobin::new();
        let b1 = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 100));
        let b2 = Arc::new(Backend::new("127.0.0.1:8081".parse().unwrap(), 100));
        let backends = vec![b1.clone(), b2.clone()];

        assert_eq!(lb.next_server(&backends).unwrap().addr, b1.addr);
        assert_eq!(lb.next_server(&backends).unwrap().addr, b2.addr);
        assert_eq!(lb.next_server(&backends).unwrap().addr, b1.addr);
    }

    #[test]
    fn test_unhealthy_backends_skipped() {
        let lb = RoundRobin::new();
        let b1 = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 100));
        let b2 = Arc::new(Backend::new("127.0.0.1:8081".parse().unwrap(), 100));
        b1.mark_failure(1);
        let backends = vec![b1, b2.clone()];

        for _ in 0..3 {
            assert_eq!(lb.next_server(&backends).unwrap().addr, b2.addr);
        }
    }

    #[test]
    fn test_empty_pool_yields_none() {
        let lb = RoundRobin::new();
        assert!(lb.next_server(&[]).is_none());
    }
}
