//! Request passport: a timestamped trail of named pipeline events.
//!
//! Events are recorded relative to the moment the passport was opened
//! (request arrival) and are never removed or reordered. The trail is
//! emitted to the log sink when a request ends with a 5xx status, for
//! post-incident analysis.

use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, Instant};

/// Well-known event names recorded by the pipeline.
pub mod events {
    pub const REQUEST_RECEIVED: &str = "REQUEST_RECEIVED";
    pub const INBOUND_START: &str = "FILTERS_INBOUND_START";
    pub const INBOUND_COMPLETE: &str = "FILTERS_INBOUND_COMPLETE";
    pub const ROUTING_COMPLETE: &str = "ROUTING_COMPLETE";
    pub const DISPATCH_START: &str = "DISPATCH_START";
    pub const ORIGIN_ATTEMPT: &str = "ORIGIN_ATTEMPT";
    pub const DISPATCH_COMPLETE: &str = "DISPATCH_COMPLETE";
    pub const OUTBOUND_START: &str = "FILTERS_OUTBOUND_START";
    pub const OUTBOUND_COMPLETE: &str = "FILTERS_OUTBOUND_COMPLETE";
}

/// A single named, timestamped event.
#[derive(Debug, Clone)]
pub struct PassportEvent {
    pub name: Cow<'static, str>,
    /// Time since the passport was opened.
    pub elapsed: Duration,
}

/// Append-only event trail covering one request's lifetime.
#[derive(Debug)]
pub struct Passport {
    opened: Instant,
    events: Vec<PassportEvent>,
}

impl Passport {
    pub fn new() -> Self {
        Self {
            opened: Instant::now(),
            events: Vec::new(),
        }
    }

    /// Append an event stamped with the elapsed time since open.
    pub fn record(&mut self, name: impl Into<Cow<'static, str>>) {
        self.events.push(PassportEvent {
            name: name.into(),
            elapsed: self.opened.elapsed(),
        });
    }

    pub fn events(&self) -> &[PassportEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for Passport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Passport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "+{}us={}", event.elapsed.as_micros(), event.name)?;
        }
        write!(f, "]")
    }
}
