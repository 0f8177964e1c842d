// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the rill chat client core.

use thiserror::Error;

/// The primary error type used across the rill workspace.
///
/// Recoverable failures (network, malformed frames) are absorbed at the
/// session-controller boundary and surfaced as message state; this type is
/// what crosses crate boundaries before that absorption happens.
#[derive(Debug, Error)]
pub enum RillError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend collaborator errors (request failure, non-2xx, malformed response).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport-event feed errors (connection loss, malformed stream frame).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let config = RillError::Config("bad toml".into());
        assert_eq!(config.to_string(), "configuration error: bad toml");

        let backend = RillError::Backend {
            message: "server returned 500".into(),
            source: None,
        };
        assert_eq!(backend.to_string(), "backend error: server returned 500");

        let transport = RillError::Transport {
            message: "stream closed".into(),
            source: Some(Box::new(std::io::Error::other("reset"))),
        };
        assert_eq!(transport.to_string(), "transport error: stream closed");
    }

    #[test]
    fn timeout_carries_duration() {
        let err = RillError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }
}
