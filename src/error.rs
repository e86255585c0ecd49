// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/error.rs
//
// Typed error taxonomy, one enum per policy bucket: configuration errors
// are fatal at startup, transport errors are retried with backoff, protocol
// errors are logged and the frame dropped (three strikes reconnect in
// stratum), and share rejections are counted by reason. Actor boundaries
// still compose heterogeneous errors through the crate-wide `Result<T>`
// alias below, the same shape the teacher crate's lib.rs exports.

use thiserror::Error;

/// Fatal at startup: bad CLI input, an unparsable URL, an invalid bind
/// address. The process should print the message and exit non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("upstream URL '{0}' could not be parsed")]
    BadUrl(String),
}

/// Recoverable network-layer failure: connection refused, DNS failure,
/// socket timeout. The work-I/O actor retries these with the configured
/// backoff policy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A frame or response that does not match the expected wire contract:
/// malformed JSON, a missing required field, an id that matches nothing
/// outstanding. Logged and dropped; three in a row triggers a stratum
/// reconnect.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
    #[error("response id {0} does not match any outstanding request")]
    UnmatchedId(u64),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

/// The pool accepted the frame but rejected the share itself. Counted by
/// reason; a "duplicate" rejection additionally forces a restart (I5).
#[derive(Debug, Error, Clone)]
#[error("share rejected: {reason}")]
pub struct ShareRejection {
    pub reason: String,
}

impl ShareRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// True if the rejection reason indicates the share was a duplicate of
    /// one already accepted or submitted, which per I5 must force workers
    /// to abandon their current nonce range rather than keep mining it.
    pub fn is_duplicate(&self) -> bool {
        let r = self.reason.to_lowercase();
        r.contains("duplicate") || r.contains("already submitted") || r.contains("already sent")
    }

    pub fn is_stale(&self) -> bool {
        let r = self.reason.to_lowercase();
        r.contains("stale") || r.contains("job not found")
    }
}

/// Crate-wide catch-all for actor boundaries and `main.rs`, mirroring the
/// teacher's `Box<dyn Error + Send + Sync>` alias so `?` composes across the
/// typed errors above plus any third-party error (`reqwest`, `serde_json`,
/// `std::io`) without manual wrapping at every call site.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rejection_is_detected_case_insensitively() {
        let r = ShareRejection::new("Duplicate share");
        assert!(r.is_duplicate());
        assert!(!r.is_stale());
    }

    #[test]
    fn stale_rejection_is_detected() {
        let r = ShareRejection::new("stale share, job not found");
        assert!(r.is_stale());
    }

    #[test]
    fn unrelated_rejection_is_neither() {
        let r = ShareRejection::new("low difficulty share");
        assert!(!r.is_duplicate());
        assert!(!r.is_stale());
    }
}
