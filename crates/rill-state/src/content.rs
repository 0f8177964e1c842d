// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Separation of raw assistant text into response and thinking segments.
//!
//! Streamed text arrives in arbitrary-sized fragments, so a `<think>`
//! delimiter can be split across two fragments. These functions never emit
//! a final classification for text they cannot yet prove is closed: batch
//! separation ([`separate`]) is only authoritative on fully delivered text,
//! while [`split_stable`] and [`separate_streaming`] give views that are
//! safe while the stream is still open.

/// Opening reasoning delimiter.
pub const THINK_OPEN: &str = "<think>";

/// Closing reasoning delimiter.
pub const THINK_CLOSE: &str = "</think>";

/// Text split into its assistant-visible and reasoning parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Separated {
    /// Everything outside think delimiters, trimmed.
    pub response: String,
    /// The concatenated interiors of all think blocks, trimmed.
    pub thinking: String,
}

/// Result of [`split_stable`]: the provably classified prefix plus the
/// tail that may still change meaning as more text arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StableSplit {
    /// Separation of everything up to and including the last closed pair.
    pub complete: Separated,
    /// Verbatim remainder after the last closed pair.
    pub pending: String,
}

/// Removes all complete `<think>…</think>` pairs from `text`, returning
/// the remainder as `response` and the concatenated interiors as
/// `thinking`, both trimmed.
///
/// An unmatched opener and everything after it pass through verbatim into
/// `response`, which makes the function idempotent on its own output:
/// `separate(separate(x).response).response == separate(x).response`.
pub fn separate(text: &str) -> Separated {
    let mut response = String::new();
    let mut thinking = String::new();
    let mut rest = text;

    while let Some(open) = rest.find(THINK_OPEN) {
        let after = &rest[open + THINK_OPEN.len()..];
        match after.find(THINK_CLOSE) {
            Some(close) => {
                response.push_str(&rest[..open]);
                thinking.push_str(&after[..close]);
                rest = &after[close + THINK_CLOSE.len()..];
            }
            // Unmatched opener: not a completed block, keep verbatim.
            None => break,
        }
    }
    response.push_str(rest);

    Separated {
        response: response.trim().to_string(),
        thinking: thinking.trim().to_string(),
    }
}

/// True if the count of opening delimiters exceeds the count of closing
/// ones, i.e. a think block is still open somewhere in `text`.
pub fn has_incomplete_open_tag(text: &str) -> bool {
    text.matches(THINK_OPEN).count() > text.matches(THINK_CLOSE).count()
}

/// Splits `text` at the last fully-closed delimiter pair.
///
/// Everything up to and including that pair is separated via [`separate`];
/// everything after is returned verbatim as `pending`, since a new
/// delimiter may still be opening inside it.
pub fn split_stable(text: &str) -> StableSplit {
    match text.rfind(THINK_CLOSE) {
        Some(pos) => {
            let cut = pos + THINK_CLOSE.len();
            StableSplit {
                complete: separate(&text[..cut]),
                pending: text[cut..].to_string(),
            }
        }
        None => StableSplit {
            complete: Separated::default(),
            pending: text.to_string(),
        },
    }
}

/// Best-effort separation of possibly still-streaming text.
///
/// The stable prefix is classified via [`split_stable`]. Of the pending
/// tail, text after an unclosed opener is already provably thinking and is
/// shown there; a trailing fragment that could still grow into an opener
/// (e.g. `"<thi"`) is withheld entirely.
pub fn separate_streaming(text: &str) -> Separated {
    let split = split_stable(text);
    let mut response = split.complete.response;
    let mut thinking = split.complete.thinking;
    let pending = split.pending;

    match pending.find(THINK_OPEN) {
        Some(open) => {
            response.push_str(&pending[..open]);
            thinking.push_str(&pending[open + THINK_OPEN.len()..]);
        }
        None => response.push_str(strip_trailing_partial_open(&pending)),
    }

    Separated {
        response: response.trim().to_string(),
        thinking: thinking.trim().to_string(),
    }
}

/// Drops a suffix of `text` that is a proper prefix of the opening
/// delimiter, deferring classification until the next fragment arrives.
fn strip_trailing_partial_open(text: &str) -> &str {
    for len in (1..THINK_OPEN.len()).rev() {
        if text.ends_with(&THINK_OPEN[..len]) {
            return &text[..text.len() - len];
        }
    }
    text
}
