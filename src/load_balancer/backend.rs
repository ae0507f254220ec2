//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single origin server
//! - Track active connections and enforce the per-backend limit
//! - Track health state from passive dispatch outcomes

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Health state, packed into an atomic.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A single origin server.
#[derive(Debug)]
pub struct Backend {
    /// Address dispatch attempts are sent to.
    pub addr: SocketAddr,
    /// Maximum concurrent connections allowed.
    pub max_connections: usize,
    active_connections: AtomicUsize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl Backend {
    pub fn new(addr: SocketAddr, max_connections: usize) -> Self {
        Self {
            addr,
            max_connections,
            active_connections: AtomicUsize::new(0),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Acquire a connection slot, or `None` when the backend is saturated.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        let mut prev = self.active_connections.load(Ordering::Relaxed);
        loop {
            if prev >= self.max_connections {
                return None;
            }
            match self.active_connections.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        Some(ConnectionGuard {
            backend: self.clone(),
        })
    }

    /// Considered healthy unless explicitly marked unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.state.load(Ordering::Relaxed) != HealthState::Unhealthy as u8
    }

    pub fn health_state(&self) -> HealthState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Report a successful dispatch.
    pub fn mark_success(&self, healthy_threshold: usize) {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state.load(Ordering::Relaxed) == HealthState::Healthy as u8 {
            return;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            tracing::info!(addr = %self.addr, "backend marked healthy");
        }
    }

    /// Report a failed dispatch.
    pub fn mark_failure(&self, unhealthy_threshold: usize) {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state.load(Ordering::Relaxed) == HealthState::Unhealthy as u8 {
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            tracing::warn!(addr = %self.addr, "backend marked unhealthy");
        }
    }
}

/// RAII guard holding one connection slot on a backend.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl Deref for ConnectionGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limit_enforced() {
        let backend = Arc::new(Backend::new("127.0.0.1:3000".parse().unwrap(), 2));

        let g1 = backend.try_acquire().unwrap();
        let _g2 = backend.try_acquire().unwrap();
        assert!(backend.try_acquire().is_none());

        drop(g1);
        assert!(backend.try_acquire().is_some());
    }

    #[test]
    fn test_health_transitions_respect_thresholds() {
        let backend = Arc::new(Backend::new("127.0.0.1:3000".parse().unwrap(), 10));
        assert!(backend.is_healthy());

        backend.mark_failure(2);
        assert!(backend.is_healthy());
        backend.mark_failure(2);
        assert!(!backend.is_healthy());

        backend.mark_success(2);
        assert!(!backend.is_healthy());
        backend.mark_success(2);
        assert!(backend.is_healthy());
    }
}
