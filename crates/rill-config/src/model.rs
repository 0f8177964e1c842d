// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the rill chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level rill configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RillConfig {
    /// Client-side behavior settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Transport selection and timing settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Client-side behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Show assistant thinking sections in the terminal output.
    #[serde(default = "default_show_thinking")]
    pub show_thinking: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            show_thinking: default_show_thinking(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_show_thinking() -> bool {
    false
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the chat backend, e.g. `http://127.0.0.1:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for authenticated backends. `None` sends no auth header.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// Transport selection and timing configuration.
///
/// `mode` picks how message updates reach the client: `sse` opens the
/// per-conversation event feed, `polling` refetches conversation history
/// while messages are live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Update transport: "sse" or "polling".
    #[serde(default = "default_transport_mode")]
    pub mode: String,

    /// Polling interval in milliseconds (also the SSE fallback interval).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Initial SSE reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    /// Maximum SSE reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: default_transport_mode(),
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
        }
    }
}

fn default_transport_mode() -> String {
    "sse".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_reconnect_base_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}
