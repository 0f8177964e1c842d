// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the rill chat client.
//!
//! This crate provides the conversation/message data model, the error type,
//! and the collaborator traits (backend, transport feed, editor insertion)
//! used throughout the rill workspace. The state engine itself lives in
//! `rill-state`; orchestration lives in `rill-session`.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RillError;
pub use types::{Conversation, ConversationId, Message, MessageId, MessageStatus, Role};

// Re-export collaborator traits at crate root.
pub use traits::{ChatBackend, EventFeed, EventStream, FragmentStream, Inserter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_objects_are_constructible() {
        // The collaborator traits must stay object-safe: the session
        // controller holds them as `Arc<dyn ...>`.
        fn _assert_backend(_: &dyn ChatBackend) {}
        fn _assert_feed(_: &dyn EventFeed) {}
        fn _assert_inserter(_: &dyn Inserter) {}
    }

    #[test]
    fn ids_display_as_raw_strings() {
        assert_eq!(ConversationId("conv-7".into()).to_string(), "conv-7");
        assert_eq!(MessageId("assistant-7".into()).to_string(), "assistant-7");
    }
}
