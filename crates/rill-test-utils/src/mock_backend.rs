// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat backend for deterministic testing.
//!
//! `MockBackend` implements `ChatBackend` with pre-scripted replies,
//! enabling fast, CI-runnable tests without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use rill_core::traits::backend::{ChatBackend, FragmentStream};
use rill_core::types::{
    Conversation, ConversationCreated, ConversationHistory, ConversationId, MessageFragment,
    MessageId, SendReceipt, SendRequest,
};
use rill_core::RillError;

/// A mock backend that streams pre-scripted replies.
///
/// Each scripted reply is a sequence of content fragments, popped FIFO per
/// send. When the queue is empty, a single default `"mock reply"` fragment
/// is streamed. Every send request is recorded for assertions.
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<Vec<String>>>>,
    sent: Arc<Mutex<Vec<SendRequest>>>,
    conversations: Arc<Mutex<Vec<Conversation>>>,
    histories: Arc<Mutex<HashMap<ConversationId, Vec<rill_core::types::Message>>>>,
    next_id: AtomicU64,
    fail_next_create: Arc<Mutex<Option<String>>>,
    fail_next_send: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    /// Create a new mock backend with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            conversations: Arc::new(Mutex::new(Vec::new())),
            histories: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            fail_next_create: Arc::new(Mutex::new(None)),
            fail_next_send: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock backend pre-loaded with one fragment sequence per send.
    pub fn with_replies(replies: Vec<Vec<&str>>) -> Self {
        let queue: VecDeque<Vec<String>> = replies
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        Self {
            replies: Arc::new(Mutex::new(queue)),
            ..Self::new()
        }
    }

    /// Add one scripted reply (a fragment sequence) to the end of the queue.
    pub async fn add_reply(&self, fragments: Vec<&str>) {
        self.replies
            .lock()
            .await
            .push_back(fragments.into_iter().map(str::to_string).collect());
    }

    /// Seed the conversation list returned by `list_conversations`.
    pub async fn add_conversation(&self, conversation: Conversation) {
        self.conversations.lock().await.push(conversation);
    }

    /// Seed the message history returned by `get_conversation`.
    pub async fn set_history(
        &self,
        conversation: &ConversationId,
        messages: Vec<rill_core::types::Message>,
    ) {
        self.histories
            .lock()
            .await
            .insert(conversation.clone(), messages);
    }

    /// Make the next `create_conversation` fail with the given message.
    pub async fn fail_next_create(&self, message: &str) {
        *self.fail_next_create.lock().await = Some(message.to_string());
    }

    /// Make the next send (`send_message` or `stream_message`) fail.
    pub async fn fail_next_send(&self, message: &str) {
        *self.fail_next_send.lock().await = Some(message.to_string());
    }

    /// All send requests seen so far, in order.
    pub async fn sent_requests(&self) -> Vec<SendRequest> {
        self.sent.lock().await.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn next_reply(&self) -> Vec<String> {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| vec!["mock reply".to_string()])
    }

    async fn take_receipt(&self, request: &SendRequest) -> Result<SendReceipt, RillError> {
        if let Some(message) = self.fail_next_send.lock().await.take() {
            return Err(RillError::Backend {
                message,
                source: None,
            });
        }
        let conversation_id = match &request.conversation_id {
            Some(id) => id.clone(),
            None => ConversationId(self.next_id("mock-conv")),
        };
        Ok(SendReceipt {
            id: MessageId(self.next_id("mock-msg")),
            conversation_id,
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn create_conversation(&self) -> Result<ConversationCreated, RillError> {
        if let Some(message) = self.fail_next_create.lock().await.take() {
            return Err(RillError::Backend {
                message,
                source: None,
            });
        }
        let id = ConversationId(self.next_id("mock-conv"));
        self.conversations
            .lock()
            .await
            .push(Conversation::new(id.clone(), "New conversation"));
        Ok(ConversationCreated {
            conversation_id: id,
            title: None,
        })
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, RillError> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationHistory, RillError> {
        let messages = self
            .histories
            .lock()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default();
        let conversation = self
            .conversations
            .lock()
            .await
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .unwrap_or_else(|| Conversation::new(id.clone(), "Mock conversation"));
        Ok(ConversationHistory {
            conversation,
            messages,
        })
    }

    async fn send_message(&self, request: SendRequest) -> Result<SendReceipt, RillError> {
        let receipt = self.take_receipt(&request).await?;
        self.sent.lock().await.push(request);
        Ok(receipt)
    }

    async fn stream_message(
        &self,
        request: SendRequest,
    ) -> Result<(SendReceipt, FragmentStream), RillError> {
        let receipt = self.take_receipt(&request).await?;
        self.sent.lock().await.push(request);

        let conversation_id = receipt.conversation_id.clone();
        let mut fragments: Vec<Result<MessageFragment, RillError>> = self
            .next_reply()
            .await
            .into_iter()
            .map(|content| {
                Ok(MessageFragment {
                    conversation_id: Some(conversation_id.clone()),
                    content: Some(content),
                    done: false,
                    role: Some(rill_core::types::Role::Assistant),
                })
            })
            .collect();
        fragments.push(Ok(MessageFragment {
            conversation_id: Some(conversation_id),
            content: None,
            done: true,
            role: None,
        }));

        Ok((receipt, Box::pin(stream::iter(fragments))))
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RillError> {
        self.conversations.lock().await.retain(|c| &c.id != id);
        self.histories.lock().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use rill_core::types::SendIntent;

    fn request(content: &str) -> SendRequest {
        SendRequest {
            content: content.to_string(),
            conversation_id: None,
            attachment: None,
            intent: SendIntent::Chat,
        }
    }

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let backend = MockBackend::new();
        let (_, mut stream) = backend.stream_message(request("hi")).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("mock reply"));
        let last = stream.next().await.unwrap().unwrap();
        assert!(last.done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn scripted_replies_stream_in_order() {
        let backend = MockBackend::with_replies(vec![vec!["one ", "two"], vec!["second send"]]);

        let (_, stream) = backend.stream_message(request("a")).await.unwrap();
        let texts: Vec<Option<String>> = stream
            .map(|f| f.unwrap().content)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(
            texts,
            vec![Some("one ".to_string()), Some("two".to_string()), None]
        );

        let (_, mut stream) = backend.stream_message(request("b")).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("second send"));
    }

    #[tokio::test]
    async fn receipt_keeps_requested_conversation() {
        let backend = MockBackend::new();
        let mut req = request("hi");
        req.conversation_id = Some(ConversationId("conv-7".into()));
        let receipt = backend.send_message(req).await.unwrap();
        assert_eq!(receipt.conversation_id.0, "conv-7");
        assert_eq!(backend.sent_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let backend = MockBackend::new();
        backend.fail_next_send("boom").await;
        assert!(backend.send_message(request("x")).await.is_err());
        assert!(backend.send_message(request("y")).await.is_ok());

        backend.fail_next_create("no quota").await;
        assert!(backend.create_conversation().await.is_err());
        assert!(backend.create_conversation().await.is_ok());
    }

    #[tokio::test]
    async fn histories_round_trip() {
        let backend = MockBackend::new();
        let conv = ConversationId("c1".into());
        backend
            .add_conversation(Conversation::new(conv.clone(), "seeded"))
            .await;
        backend.set_history(&conv, Vec::new()).await;

        let history = backend.get_conversation(&conv).await.unwrap();
        assert_eq!(history.conversation.title, "seeded");
        assert!(history.messages.is_empty());

        backend.delete_conversation(&conv).await.unwrap();
        assert!(backend.list_conversations().await.unwrap().is_empty());
    }
}
