// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transport-event feed for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use rill_core::traits::transport::{EventFeed, EventStream};
use rill_core::types::{ConversationId, TransportEvent};
use rill_core::RillError;

/// An event feed that replays pre-scripted event batches.
///
/// Each call to `open` pops the next batch and yields its events in order,
/// then ends the stream (as a server closing the feed would). An exhausted
/// queue yields an empty stream.
pub struct ScriptedFeed {
    scripts: Arc<Mutex<VecDeque<Vec<TransportEvent>>>>,
    fail_next_open: Arc<Mutex<Option<String>>>,
    opened: Arc<Mutex<Vec<ConversationId>>>,
}

impl ScriptedFeed {
    /// Create a feed with an empty script queue.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            fail_next_open: Arc::new(Mutex::new(None)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a feed pre-loaded with one event batch per `open` call.
    pub fn with_scripts(scripts: Vec<Vec<TransportEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            ..Self::new()
        }
    }

    /// Append one event batch to the script queue.
    pub async fn add_script(&self, events: Vec<TransportEvent>) {
        self.scripts.lock().await.push_back(events);
    }

    /// Make the next `open` fail with the given message.
    pub async fn fail_next_open(&self, message: &str) {
        *self.fail_next_open.lock().await = Some(message.to_string());
    }

    /// Conversations `open` has been called with, in order.
    pub async fn opened_conversations(&self) -> Vec<ConversationId> {
        self.opened.lock().await.clone()
    }
}

impl Default for ScriptedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn open(&self, conversation: &ConversationId) -> Result<EventStream, RillError> {
        if let Some(message) = self.fail_next_open.lock().await.take() {
            return Err(RillError::Transport {
                message,
                source: None,
            });
        }
        self.opened.lock().await.push(conversation.clone());
        let events = self.scripts.lock().await.pop_front().unwrap_or_default();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}
