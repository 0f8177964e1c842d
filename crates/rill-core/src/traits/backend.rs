// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend collaborator trait: the service that persists conversations and
//! runs generations. The core only ever talks to it through this interface.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RillError;
use crate::types::{
    Conversation, ConversationCreated, ConversationHistory, ConversationId, MessageFragment,
    SendReceipt, SendRequest,
};

/// A stream of assistant-reply fragments tied to one send request.
pub type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<MessageFragment, RillError>> + Send>>;

/// The chat backend collaborator.
///
/// All persistence is delegated here; the core holds no durable state.
/// Implementations must be safe to share behind an `Arc` across the
/// session controller's background tasks.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Requests a fresh conversation with a backend-assigned id.
    async fn create_conversation(&self) -> Result<ConversationCreated, RillError>;

    /// Returns the conversation list (no message bodies).
    async fn list_conversations(&self) -> Result<Vec<Conversation>, RillError>;

    /// Fetches a conversation together with its full message history.
    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationHistory, RillError>;

    /// Submits a message and returns the backend's receipt. Delivery of the
    /// assistant reply happens over the transport-event feed.
    async fn send_message(&self, request: SendRequest) -> Result<SendReceipt, RillError>;

    /// Submits a message and additionally returns the reply as an in-band
    /// fragment stream, for transports that support it.
    async fn stream_message(
        &self,
        request: SendRequest,
    ) -> Result<(SendReceipt, FragmentStream), RillError>;

    /// Deletes a conversation and all of its messages.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RillError>;
}
