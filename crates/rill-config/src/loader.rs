// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./rill.toml` > `~/.config/rill/rill.toml` > `/etc/rill/rill.toml`
//! with environment variable overrides via `RILL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::model::RillConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/rill/rill.toml` (system-wide)
/// 3. `~/.config/rill/rill.toml` (user XDG config)
/// 4. `./rill.toml` (local directory)
/// 5. `RILL_*` environment variables
pub fn load_config() -> Result<RillConfig, figment::Error> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("rill/rill.toml"))
        .unwrap_or_default();
    debug!(user_config = %user_config.display(), "merging configuration sources");
    Figment::new()
        .merge(Serialized::defaults(RillConfig::default()))
        .merge(Toml::file("/etc/rill/rill.toml"))
        .merge(Toml::file(user_config))
        .merge(Toml::file("rill.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RillConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RillConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RillConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RillConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `RILL_TRANSPORT_POLL_INTERVAL_MS`
/// must map to `transport.poll_interval_ms`, not `transport.poll.interval.ms`.
fn env_provider() -> Env {
    Env::prefixed("RILL_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: RILL_BACKEND_BASE_URL -> "backend_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("client_", "client.", 1)
            .replacen("backend_", "backend.", 1)
            .replacen("transport_", "transport.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_load_without_any_sources() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.transport.mode, "sse");
        assert_eq!(config.transport.poll_interval_ms, 2000);
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml = r#"
[backend]
base_url = "https://chat.example.com"
api_token = "secret"

[transport]
mode = "polling"
poll_interval_ms = 500
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.backend.base_url, "https://chat.example.com");
        assert_eq!(config.backend.api_token.as_deref(), Some("secret"));
        assert_eq!(config.transport.mode, "polling");
        assert_eq!(config.transport.poll_interval_ms, 500);
        // Untouched sections keep their defaults.
        assert_eq!(config.client.log_level, "info");
    }

    #[test]
    fn load_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nlog_level = \"debug\"").unwrap();
        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.client.log_level, "debug");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str("[backend]\nbase_uri = \"x\"\n");
        assert!(result.is_err());
    }
}
