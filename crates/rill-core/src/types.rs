// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation/message data model shared across the rill workspace.
//!
//! Identifiers are opaque strings: both conversations and messages may start
//! life under a client-minted temporary id (`conv-<uuid>`, `assistant-<uuid>`)
//! and be re-keyed once the backend assigns a permanent one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known section holding the assistant-visible response text.
pub const RESPONSE_SECTION: &str = "response";

/// Well-known section holding reasoning extracted from think delimiters.
pub const THINKING_SECTION: &str = "thinking";

/// Sentinel conversation id for placeholders whose owning conversation
/// cannot yet be resolved from the delta that created them.
pub const UNRESOLVED_CONVERSATION: &str = "unresolved";

/// Visible marker appended to a message's content by the manual stop
/// transition.
pub const STOP_MARKER: &str = " [Stopped]";

/// Metadata key carrying the completion flag.
pub const IS_COMPLETE_KEY: &str = "isComplete";

/// Unique identifier for a conversation. May be temporary until promoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message. May be client-generated pending
/// backend confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Lifecycle state of a message.
///
/// Transitions are monotonic (`sending -> queued -> processing -> streaming
/// -> complete`) with two escape hatches: the manual stop transition forces
/// any live state directly to `complete`, and any non-terminal state may
/// move to `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Optimistic local insert, request not yet issued.
    Sending,
    /// Accepted locally or by the backend, generation not started.
    Queued,
    /// Backend is working but no content has arrived yet.
    Processing,
    /// Content is arriving incrementally.
    Streaming,
    /// Terminal: generation finished (or was stopped).
    Complete,
    /// Terminal: generation failed.
    Error,
}

impl MessageStatus {
    /// True for states with an in-flight generation behind them.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            MessageStatus::Queued | MessageStatus::Processing | MessageStatus::Streaming
        )
    }

    /// True for states no delta should move a message out of.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Complete | MessageStatus::Error)
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Sending => write!(f, "sending"),
            MessageStatus::Queued => write!(f, "queued"),
            MessageStatus::Processing => write!(f, "processing"),
            MessageStatus::Streaming => write!(f, "streaming"),
            MessageStatus::Complete => write!(f, "complete"),
            MessageStatus::Error => write!(f, "error"),
        }
    }
}

/// A named sub-channel of a message's content that streams and toggles
/// independently of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub content: String,
    pub visible: bool,
}

impl Section {
    /// An empty, visible section.
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            visible: true,
        }
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last message activity or title edit.
    pub updated_at: String,
}

impl Conversation {
    /// Creates a conversation stamped with the current wall clock.
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            title: title.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Owning conversation. Rewritten atomically when the conversation's
    /// id is promoted.
    pub conversation_id: ConversationId,
    pub role: Role,
    /// Full denormalized text (back-compat single-string view). Converges
    /// with the response section once the message is complete.
    pub content: String,
    /// Named content sections (`"response"`, `"thinking"`, open-ended).
    #[serde(default)]
    pub sections: BTreeMap<String, Section>,
    pub status: MessageStatus,
    /// Ordering key within the conversation; millisecond wall clock in
    /// practice, any monotonic value in principle.
    pub timestamp: i64,
    /// Human-readable failure description, present only when `status` is
    /// `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Open key-value bag. Carries `isComplete` once established.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Message {
    /// Creates a message stamped with the current wall clock, with the
    /// response section mirroring the initial content.
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        role: Role,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Self {
        let content = content.into();
        let mut sections = BTreeMap::new();
        sections.insert(
            RESPONSE_SECTION.to_string(),
            Section {
                content: content.clone(),
                visible: true,
            },
        );
        Self {
            id,
            conversation_id,
            role,
            content,
            sections,
            status,
            timestamp: chrono::Utc::now().timestamp_millis(),
            error: None,
            metadata: Map::new(),
        }
    }

    /// Synthesizes an assistant placeholder: empty visible response and
    /// thinking sections, streaming by default.
    pub fn placeholder(id: MessageId, conversation_id: ConversationId) -> Self {
        let mut msg = Self::new(
            id,
            conversation_id,
            Role::Assistant,
            "",
            MessageStatus::Streaming,
        );
        msg.sections
            .insert(THINKING_SECTION.to_string(), Section::empty());
        msg
    }

    /// Resolves the `isComplete` metadata flag, defaulting to false.
    pub fn is_complete(&self) -> bool {
        self.metadata
            .get(IS_COMPLETE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Establishes `isComplete = true` in the metadata bag.
    pub fn mark_complete(&mut self) {
        self.metadata
            .insert(IS_COMPLETE_KEY.to_string(), Value::Bool(true));
    }

    /// Returns the named section, if present.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Returns the named section, creating it empty and visible on demand.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        self.sections
            .entry(name.to_string())
            .or_insert_with(Section::empty)
    }

    /// Convenience accessor for the response section's text.
    pub fn response_text(&self) -> &str {
        self.section(RESPONSE_SECTION)
            .map(|s| s.content.as_str())
            .unwrap_or("")
    }
}

/// How a delta's content merges into the existing message content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Append,
    Replace,
}

/// One incremental update to a message's content, status, or metadata.
///
/// This is the streaming-update entry point: transport events and backend
/// fragment streams both reduce to deltas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Text to merge into the message, per `mode`.
    #[serde(default)]
    pub content: Option<String>,
    /// Merge mode for `content`; appends by default.
    #[serde(default)]
    pub mode: UpdateMode,
    /// External status signal; overwrites the local status unconditionally.
    #[serde(default)]
    pub status: Option<MessageStatus>,
    /// Target section name. When set to something other than the response
    /// section, only that section is mutated and `content` is left alone.
    #[serde(default)]
    pub section: Option<String>,
    /// Owning conversation, when the transport knows it.
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    /// Terminal completion signal.
    #[serde(default)]
    pub is_complete: Option<bool>,
    /// Human-readable failure description, set alongside an `error` status.
    #[serde(default)]
    pub error: Option<String>,
}

impl MessageDelta {
    /// A plain append-content delta.
    pub fn append(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// One record from the transport-event feed (push or poll), consumed
/// directly as an `UpsertMessageDelta` input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportEvent {
    pub message_id: MessageId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub status: Option<MessageStatus>,
    #[serde(default)]
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TransportEvent {
    /// Splits the event into the delta the reducer consumes.
    pub fn into_delta(self) -> (MessageId, MessageDelta) {
        (
            self.message_id,
            MessageDelta {
                content: self.content,
                mode: UpdateMode::Append,
                status: self.status,
                section: self.section,
                conversation_id: self.conversation_id,
                is_complete: self.is_complete,
                error: self.error,
            },
        )
    }
}

// --- Backend collaborator payloads ---

/// Result of asking the backend for a fresh conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCreated {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub title: Option<String>,
}

/// A conversation together with its full message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// A file attached to an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Why a message is being (re-)sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendIntent {
    #[default]
    Chat,
    Regenerate,
}

/// An outbound message request to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub content: String,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub intent: SendIntent,
}

/// The backend's acknowledgement of an outbound message: the assistant
/// message's id and the (possibly newly assigned) conversation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: MessageId,
    pub conversation_id: ConversationId,
}

/// One fragment of a streamed assistant reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFragment {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub content: Option<String>,
    pub done: bool,
    #[serde(default)]
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_liveness_partition() {
        for status in [
            MessageStatus::Sending,
            MessageStatus::Queued,
            MessageStatus::Processing,
            MessageStatus::Streaming,
            MessageStatus::Complete,
            MessageStatus::Error,
        ] {
            // Live and terminal are disjoint; sending is neither.
            assert!(!(status.is_live() && status.is_terminal()));
        }
        assert!(MessageStatus::Queued.is_live());
        assert!(MessageStatus::Streaming.is_live());
        assert!(!MessageStatus::Sending.is_live());
        assert!(MessageStatus::Complete.is_terminal());
        assert!(MessageStatus::Error.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&MessageStatus::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");
        let parsed: MessageStatus = serde_json::from_str("\"queued\"").unwrap();
        assert_eq!(parsed, MessageStatus::Queued);
    }

    #[test]
    fn placeholder_has_empty_visible_sections() {
        let msg = Message::placeholder(
            MessageId("assistant-1".into()),
            ConversationId(UNRESOLVED_CONVERSATION.into()),
        );
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.status, MessageStatus::Streaming);
        let response = msg.section(RESPONSE_SECTION).unwrap();
        let thinking = msg.section(THINKING_SECTION).unwrap();
        assert!(response.content.is_empty() && response.visible);
        assert!(thinking.content.is_empty() && thinking.visible);
    }

    #[test]
    fn is_complete_resolves_from_metadata() {
        let mut msg = Message::new(
            MessageId("m1".into()),
            ConversationId("c1".into()),
            Role::Assistant,
            "hi",
            MessageStatus::Complete,
        );
        assert!(!msg.is_complete());
        msg.mark_complete();
        assert!(msg.is_complete());
        // Non-boolean values resolve to false rather than raising.
        msg.metadata
            .insert(IS_COMPLETE_KEY.into(), Value::String("yes".into()));
        assert!(!msg.is_complete());
    }

    #[test]
    fn section_mut_creates_on_demand() {
        let mut msg = Message::new(
            MessageId("m1".into()),
            ConversationId("c1".into()),
            Role::Assistant,
            "",
            MessageStatus::Streaming,
        );
        assert!(msg.section("citations").is_none());
        msg.section_mut("citations").content.push_str("[1]");
        assert_eq!(msg.section("citations").unwrap().content, "[1]");
    }

    #[test]
    fn transport_event_maps_onto_delta() {
        let event = TransportEvent {
            message_id: MessageId("m1".into()),
            conversation_id: Some(ConversationId("c1".into())),
            content: Some("chunk".into()),
            section: Some(THINKING_SECTION.into()),
            status: Some(MessageStatus::Streaming),
            is_complete: None,
            error: None,
        };
        let (id, delta) = event.into_delta();
        assert_eq!(id.0, "m1");
        assert_eq!(delta.content.as_deref(), Some("chunk"));
        assert_eq!(delta.section.as_deref(), Some(THINKING_SECTION));
        assert_eq!(delta.mode, UpdateMode::Append);
        assert_eq!(delta.conversation_id.unwrap().0, "c1");
    }

    #[test]
    fn delta_deserializes_with_defaults() {
        let delta: MessageDelta = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(delta.content.as_deref(), Some("hi"));
        assert_eq!(delta.mode, UpdateMode::Append);
        assert!(delta.status.is_none());
        assert!(delta.section.is_none());
        assert!(delta.is_complete.is_none());
    }
}
