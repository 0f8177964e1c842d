// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Figment reports deserialization problems as a flat error chain; this
//! module turns each one into a `ConfigError` diagnostic that miette can
//! render with the offending rill.toml excerpt underlined, the valid keys
//! for the section, and a Jaro-Winkler "did you mean" correction.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity floor below which a typo gets no correction. 0.75 is close
/// enough to pair `base_uri` with `base_url` without matching across
/// unrelated keys.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, carrying whatever source context could be
/// recovered from the figment error it was built from.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key rill does not know, in a section it does.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(rill::config::unknown_key),
        help("{}", unknown_key_help(section, suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Dotted section the key appeared under, empty at top level.
        section: String,
        /// Closest valid key, when one clears the similarity floor.
        suggestion: Option<String>,
        /// Comma-joined valid keys for the section.
        valid_keys: String,
        #[label("not a rill setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(
        code(rill::config::invalid_type),
        help("{}", invalid_type_help(key, expected))
    )]
    InvalidType {
        /// Dotted path of the offending key.
        key: String,
        /// What was found versus what was wanted.
        detail: String,
        /// The wanted type, verbatim from serde.
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the schema requires but no layer provided.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(rill::config::missing_key),
        help("add `{key} = <value>` to your rill.toml")
    )]
    MissingKey { key: String },

    /// A well-typed value that fails a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(rill::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no richer mapping.
    #[error("configuration error: {0}")]
    #[diagnostic(code(rill::config::other))]
    Other(String),
}

fn unknown_key_help(section: &str, suggestion: Option<&str>, valid_keys: &str) -> String {
    let scope = if section.is_empty() {
        "at the top level".to_string()
    } else {
        format!("in [{section}]")
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys {scope}: {valid_keys}"),
        None => format!("valid keys {scope}: {valid_keys}"),
    }
}

fn invalid_type_help(key: &str, expected: &str) -> String {
    // All rill durations are integer milliseconds; the suffix is the
    // schema's marker for that.
    if key.ends_with("_ms") {
        format!("expected {expected} — `{key}` is a duration in whole milliseconds")
    } else {
        format!("expected {expected}")
    }
}

/// Expands a `figment::Error` into one `ConfigError` per underlying
/// problem, attaching a rill.toml span where one of the loaded sources
/// contains the offending key.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid: Vec<&str> = expected.to_vec();
                let (span, src) = locate_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section: dotted_path(&error),
                    suggestion: suggest_key(field, &valid),
                    valid_keys: valid.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: dotted_path(&error),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span: None,
                src: None,
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// The error's key path as `section.key`, empty for top-level errors.
fn dotted_path(error: &figment::error::Error) -> String {
    error
        .path
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Resolves an error back to a span in whichever loaded TOML file the
/// figment metadata names. Env-sourced errors have no file and get none.
fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(figment::Source::File(path)) = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
    else {
        return (None, None);
    };
    let path = path.display().to_string();

    let Some((_, content)) = toml_sources.iter().find(|(p, _)| p == &path) else {
        return (None, None);
    };

    let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    match key_offset(content, &section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` within its section of a TOML document.
///
/// Only the first path segment matters for locating the `[section]`
/// header; a key line counts when the name is followed by `=` or
/// whitespace, which excludes keys that merely share a prefix.
fn key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let key = line.trim_start();
        if let Some(rest) = key.strip_prefix(field)
            && matches!(rest.as_bytes().first(), Some(b' ' | b'\t' | b'=') | None)
        {
            return Some(offset + (line.len() - key.len()));
        }
        offset += line.len();
    }
    None
}

/// The valid key most similar to `unknown`, if any clears the floor.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Renders every error to stderr through miette's graphical handler,
/// followed by a one-line tally.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    eprintln!("rill: {} configuration {noun}", errors.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_base_uri_for_base_url() {
        let valid = &["base_url", "api_token"];
        assert_eq!(suggest_key("base_uri", valid), Some("base_url".to_string()));
    }

    #[test]
    fn suggest_pol_interval_for_poll_interval_ms() {
        let valid = &["mode", "poll_interval_ms", "reconnect_base_ms"];
        assert_eq!(
            suggest_key("pol_interval_ms", valid),
            Some("poll_interval_ms".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["mode", "poll_interval_ms"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_inside_a_section() {
        let content = "[backend]\nbase_uri = \"x\"\n";
        let path = vec!["backend".to_string()];
        let offset = key_offset(content, &path, "base_uri").unwrap();
        assert_eq!(&content[offset..offset + 8], "base_uri");
    }

    #[test]
    fn key_offset_at_top_level() {
        let content = "verbose = true\n";
        assert_eq!(key_offset(content, &[], "verbose"), Some(0));
    }

    #[test]
    fn key_offset_skips_prefix_collisions() {
        let content = "[transport]\nmode_extra = 1\nmode = \"sse\"\n";
        let path = vec!["transport".to_string()];
        let offset = key_offset(content, &path, "mode").unwrap();
        assert_eq!(&content[offset..offset + 4], "mode");
        assert!(content[..offset].contains("mode_extra"));
    }

    #[test]
    fn unknown_key_help_names_the_section() {
        let help = unknown_key_help("transport", Some("mode"), "mode, poll_interval_ms");
        assert!(help.contains("did you mean `mode`"));
        assert!(help.contains("[transport]"));

        let top = unknown_key_help("", None, "client, backend");
        assert!(top.contains("top level"));
    }

    #[test]
    fn millisecond_keys_get_duration_help() {
        assert!(invalid_type_help("transport.poll_interval_ms", "an integer")
            .contains("milliseconds"));
        assert!(!invalid_type_help("transport.mode", "a string").contains("milliseconds"));
    }
}
