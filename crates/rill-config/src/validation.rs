// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, known transport modes, and positive intervals.

use crate::diagnostic::ConfigError;
use crate::model::RillConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const TRANSPORT_MODES: &[&str] = &["sse", "polling"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RillConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate log level is a known tracing level
    let level = config.client.log_level.trim();
    if !LOG_LEVELS.contains(&level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "client.log_level `{level}` is not one of: {}",
                LOG_LEVELS.join(", ")
            ),
        });
    }

    // Validate base_url is not empty and carries an http(s) scheme
    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "backend.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("backend.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    // Validate transport mode is known
    let mode = config.transport.mode.trim();
    if !TRANSPORT_MODES.contains(&mode) {
        errors.push(ConfigError::Validation {
            message: format!(
                "transport.mode `{mode}` is not one of: {}",
                TRANSPORT_MODES.join(", ")
            ),
        });
    }

    // Validate intervals are positive and reconnect bounds are ordered
    if config.transport.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.poll_interval_ms must be greater than 0".to_string(),
        });
    }

    if config.transport.reconnect_base_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.reconnect_base_ms must be greater than 0".to_string(),
        });
    }

    if config.transport.reconnect_max_ms < config.transport.reconnect_base_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "transport.reconnect_max_ms ({}) must be at least reconnect_base_ms ({})",
                config.transport.reconnect_max_ms, config.transport.reconnect_base_ms
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
