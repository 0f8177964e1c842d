// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-event feed trait.
//!
//! Push (SSE/WebSocket) and polling transports are both producers of the
//! same [`TransportEvent`] stream; the session controller never knows which
//! one it is attached to.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RillError;
use crate::types::{ConversationId, TransportEvent};

/// A stream of transport events for one conversation.
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<TransportEvent, RillError>> + Send>>;

/// A persistent feed of incremental message updates.
///
/// The stream ends when the server closes the feed; callers are expected
/// to reopen it (with backoff) while the conversation is active. Events
/// for a single message id must be yielded in delivery order.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Opens the feed for the given conversation.
    async fn open(&self, conversation: &ConversationId) -> Result<EventStream, RillError>;
}
