//! Shared configuration snapshots.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::GatewayConfig;

/// Cheap-to-clone handle to the current configuration.
///
/// Filters read a snapshot at execution time, so a reload applies on the
/// next request and never changes rules mid-request.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<GatewayConfig>>,
}

impl ConfigHandle {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// The configuration as of this instant.
    pub fn snapshot(&self) -> Arc<GatewayConfig> {
        self.inner.load_full()
    }

    /// Atomically replace the configuration.
    pub fn store(&self, config: GatewayConfig) {
        self.inner.store(Arc::new(config));
    }
}
