// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The authoritative in-memory table of conversations and messages.
//!
//! The store exposes read-only selectors; every write flows through
//! [`crate::reducer::apply`], which lives in this crate and is the only
//! code with access to the `pub(crate)` fields.

use std::collections::HashMap;

use rill_core::types::{Conversation, ConversationId, Message, MessageId};

/// Canonical client-side chat state for one session.
#[derive(Debug, Default)]
pub struct ChatStore {
    pub(crate) conversations: HashMap<ConversationId, Conversation>,
    pub(crate) messages: HashMap<MessageId, Message>,
    pub(crate) active_conversation: Option<ConversationId>,
    /// Coarse UI gate: a generation was started and has not settled.
    pub(crate) generating: bool,
    /// Coarse UI gate: the transport-event feed is connected.
    pub(crate) connected: bool,
}

impl ChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the conversation with the given id.
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Returns all conversations, most recently updated first.
    pub fn conversations(&self) -> Vec<&Conversation> {
        let mut all: Vec<&Conversation> = self.conversations.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.0.cmp(&b.id.0)));
        all
    }

    /// Returns the message with the given id.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Returns a conversation's messages sorted ascending by timestamp,
    /// with the id as a deterministic tiebreak.
    pub fn messages_for(&self, conversation: &ConversationId) -> Vec<&Message> {
        let mut msgs: Vec<&Message> = self
            .messages
            .values()
            .filter(|m| &m.conversation_id == conversation)
            .collect();
        msgs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.0.cmp(&b.id.0)));
        msgs
    }

    /// True if any message in the conversation is queued, processing, or
    /// streaming.
    pub fn is_generating(&self, conversation: &ConversationId) -> bool {
        self.messages
            .values()
            .any(|m| &m.conversation_id == conversation && m.status.is_live())
    }

    /// True if any message anywhere in the store is still live. Drives the
    /// polling fallback's auto-cancel.
    pub fn has_live_messages(&self) -> bool {
        self.messages.values().any(|m| m.status.is_live())
    }

    /// The currently active conversation, if any.
    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    /// The coarse global generating flag.
    pub fn generating(&self) -> bool {
        self.generating
    }

    /// Whether the transport-event feed is currently connected.
    pub fn connected(&self) -> bool {
        self.connected
    }
}
