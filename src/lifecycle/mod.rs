//! Process lifecycle.
//!
//! Startup lives in `main`; this module owns the shutdown coordinator
//! that lets the server and background tasks drain gracefully.

pub mod shutdown;

pub use shutdown::Shutdown;
