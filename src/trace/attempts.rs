//! Backend attempt history.
//!
//! # Responsibilities
//! - Record every backend contact attempt made for a request
//! - Preserve attempt order (append-only)
//! - Render the history as a JSON string for the attempts response header

use std::time::Duration;

use serde::Serialize;

/// How a single backend contact attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The origin produced a response with this status code.
    Status(u16),
    /// The attempt failed before a response was received.
    Error(String),
}

/// One backend contact attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    /// Backend address the attempt was sent to.
    pub target: String,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Attempt latency in milliseconds.
    pub duration_ms: u64,
}

impl Attempt {
    /// An attempt that reached the origin and got a status code back.
    pub fn status(target: impl Into<String>, status: u16, duration: Duration) -> Self {
        Self {
            target: target.into(),
            outcome: AttemptOutcome::Status(status),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// An attempt that failed at the transport level.
    pub fn error(target: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            target: target.into(),
            outcome: AttemptOutcome::Error(error.into()),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Append-only history of backend attempts for one request.
///
/// Read-only once the outbound phase begins; the response annotator
/// serializes it into the attempts header.
#[derive(Debug, Default)]
pub struct RequestAttempts {
    attempts: Vec<Attempt>,
}

impl RequestAttempts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Records are never removed or reordered.
    pub fn record(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts.iter()
    }

    /// JSON rendering for the attempts response header.
    ///
    /// Empty string when no attempts were made (local dispatch).
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.attempts).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_empty_when_no_attempts() {
        let attempts = RequestAttempts::new();
        assert_eq!(attempts.summary(), "");
    }

    #[test]
    fn test_summary_is_json() {
        let mut attempts = RequestAttempts::new();
        attempts.record(Attempt::status("127.0.0.1:3000", 503, Duration::from_millis(12)));
        attempts.record(Attempt::error("127.0.0.1:3001", "connection refused", Duration::from_millis(3)));

        let summary = attempts.summary();
        assert!(summary.starts_with('['));
        assert!(summary.contains("127.0.0.1:3000"));
        assert!(summary.contains("503"));
        assert!(summary.contains("connection refused"));
    }

    #[test]
    fn test_records_keep_order() {
        let mut attempts = RequestAttempts::new();
        for port in [3000, 3001, 3002] {
            attempts.record(Attempt::status(format!("127.0.0.1:{port}"), 200, Duration::ZERO));
        }
        let targets: Vec<_> = attempts.iter().map(|a| a.target.clone()).collect();
        assert_eq!(targets, vec!["127.0.0.1:3000", "127.0.0.1:3001", "127.0.0.1:3002"]);
    }
}
