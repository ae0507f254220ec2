//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, the diagnostic sink)
//!     → metrics.rs (counters, histograms, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The diagnostic sink for passports and debug trails is the tracing
//!   log stream, consumed on status ≥500 or when debug mode is on
//! - Metrics are cheap (atomic increments) and recorded once per request

pub mod logging;
pub mod metrics;
