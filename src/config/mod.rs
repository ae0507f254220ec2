//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated)
//!     → handle.rs (arc-swap snapshots shared with the pipeline)
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → handle.rs atomic swap
//!     → filters observe the new snapshot on the next request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No mid-request rule changes: readers snapshot per request

pub mod handle;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use handle::ConfigHandle;
pub use loader::{load_config, ConfigError};
pub use schema::{BackendConfig, GatewayConfig, RetryConfig, RouteRuleConfig};
pub use watcher::ConfigWatcher;
