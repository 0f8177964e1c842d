// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session controller: the only writer to the chat store.
//!
//! Every mutation flows through the reducer under a single write-lock
//! acquisition per batch, so readers never observe a half-applied
//! transition (user message without its placeholder, promoted conversation
//! with unpromoted messages). Background tasks (fragment drain, event
//! feed, poll loop) all derive their cancellation tokens from the
//! controller's root token and die on `teardown`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rill_core::RillError;
use rill_core::traits::backend::{ChatBackend, FragmentStream};
use rill_core::traits::transport::EventFeed;
use rill_core::types::{
    Attachment, Conversation, ConversationId, Message, MessageDelta, MessageId, MessageStatus,
    SendIntent, SendRequest,
};
use rill_state::{Action, ChatStore, apply, apply_all};

use crate::backoff::Backoff;
use crate::polling;

/// Maximum title length derived from the first message of a conversation.
const TITLE_MAX_CHARS: usize = 40;

/// Tunables for the controller's background transports.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Poll-loop interval when no push feed is configured.
    pub poll_interval: Duration,
    /// Disables the polling fallback entirely.
    pub polling_enabled: bool,
    /// Initial delay before reopening a closed event feed.
    pub reconnect_base: Duration,
    /// Cap for the reconnect backoff.
    pub reconnect_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            polling_enabled: true,
            reconnect_base: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

struct FeedTask {
    conversation: ConversationId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the store, the backend, and the transports for one chat session.
pub struct SessionController {
    store: Arc<RwLock<ChatStore>>,
    backend: Arc<dyn ChatBackend>,
    feed: Option<Arc<dyn EventFeed>>,
    config: ControllerConfig,
    cancel: CancellationToken,
    /// Token for the currently running generation's fragment drain.
    generation: Mutex<CancellationToken>,
    feed_task: Mutex<Option<FeedTask>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        feed: Option<Arc<dyn EventFeed>>,
        config: ControllerConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        Self {
            store: Arc::new(RwLock::new(ChatStore::new())),
            backend,
            feed,
            config,
            generation: Mutex::new(cancel.child_token()),
            cancel,
            feed_task: Mutex::new(None),
            poll_task: Mutex::new(None),
        }
    }

    /// Shared handle for read access to the store.
    pub fn store(&self) -> Arc<RwLock<ChatStore>> {
        Arc::clone(&self.store)
    }

    /// Cancels every background task owned by this controller.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    /// Sends a user message in the active conversation, creating a
    /// conversation first when none is active.
    ///
    /// The user message and the assistant placeholder are inserted
    /// optimistically before any network round trip. Returns the assistant
    /// message's id (the backend's, once the receipt re-keys it).
    pub async fn send_message(
        &self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<MessageId, RillError> {
        let (conversation_id, minted) = {
            let store = self.store.read().await;
            match store.active_conversation() {
                Some(id) => (id.clone(), false),
                None => (
                    ConversationId(format!("conv-{}", uuid::Uuid::new_v4())),
                    true,
                ),
            }
        };

        let user_id = MessageId(format!("user-{}", uuid::Uuid::new_v4()));
        let placeholder_id = MessageId(format!("assistant-{}", uuid::Uuid::new_v4()));
        let user_msg = Message::new(
            user_id.clone(),
            conversation_id.clone(),
            rill_core::types::Role::User,
            text,
            MessageStatus::Sending,
        );
        let mut placeholder = Message::placeholder(placeholder_id.clone(), conversation_id.clone());
        placeholder.status = MessageStatus::Queued;
        // The reply always renders after the message it answers, even when
        // both land in the same millisecond.
        placeholder.timestamp = user_msg.timestamp + 1;

        {
            let mut store = self.store.write().await;
            let mut batch = Vec::new();
            if minted {
                batch.push(Action::RegisterConversation(Conversation::new(
                    conversation_id.clone(),
                    title_from(text),
                )));
                batch.push(Action::SetActiveConversation(Some(conversation_id.clone())));
            }
            batch.push(Action::UpsertMessage(user_msg));
            batch.push(Action::UpsertMessage(placeholder));
            batch.push(Action::SetGenerating(true));
            apply_all(&mut store, batch);
        }

        // Resolve the temporary conversation id against the backend before
        // issuing the send.
        let conversation_id = if minted {
            match self.backend.create_conversation().await {
                Ok(created) => {
                    let real = created.conversation_id;
                    if real != conversation_id {
                        let mut store = self.store.write().await;
                        apply(
                            &mut store,
                            Action::PromoteConversationId {
                                old_id: conversation_id,
                                new_id: real.clone(),
                            },
                        );
                    }
                    real
                }
                Err(e) => {
                    warn!(error = %e, "conversation creation failed");
                    let mut store = self.store.write().await;
                    apply_all(
                        &mut store,
                        [
                            Action::UpsertMessageDelta {
                                message_id: user_id,
                                delta: MessageDelta {
                                    status: Some(MessageStatus::Error),
                                    error: Some(e.to_string()),
                                    ..MessageDelta::default()
                                },
                            },
                            // The placeholder never had a generation behind
                            // it; drop it rather than erroring it.
                            Action::RemoveMessage(placeholder_id),
                            Action::SetGenerating(false),
                        ],
                    );
                    return Err(e);
                }
            }
        } else {
            conversation_id
        };

        let request = SendRequest {
            content: text.to_string(),
            conversation_id: Some(conversation_id.clone()),
            attachment,
            intent: SendIntent::Chat,
        };
        self.issue(request, conversation_id, Some(user_id), placeholder_id)
            .await
    }

    /// Discards everything after the most recent user message and re-issues
    /// it with regenerate intent.
    pub async fn regenerate_last_message(&self) -> Result<MessageId, RillError> {
        let (conversation_id, last_user, user_timestamp, trailing) = {
            let store = self.store.read().await;
            let Some(conversation_id) = store.active_conversation().cloned() else {
                return Err(RillError::Internal(
                    "no active conversation to regenerate in".into(),
                ));
            };
            let messages = store.messages_for(&conversation_id);
            let Some(pos) = messages
                .iter()
                .rposition(|m| m.role == rill_core::types::Role::User)
            else {
                return Err(RillError::Internal(
                    "conversation has no user message to regenerate".into(),
                ));
            };
            let trailing: Vec<MessageId> =
                messages[pos + 1..].iter().map(|m| m.id.clone()).collect();
            (
                conversation_id,
                messages[pos].content.clone(),
                messages[pos].timestamp,
                trailing,
            )
        };

        let placeholder_id = MessageId(format!("assistant-{}", uuid::Uuid::new_v4()));
        {
            let mut store = self.store.write().await;
            let mut batch: Vec<Action> = trailing.into_iter().map(Action::RemoveMessage).collect();
            let mut placeholder =
                Message::placeholder(placeholder_id.clone(), conversation_id.clone());
            placeholder.status = MessageStatus::Queued;
            placeholder.timestamp = placeholder.timestamp.max(user_timestamp + 1);
            batch.push(Action::UpsertMessage(placeholder));
            batch.push(Action::SetGenerating(true));
            apply_all(&mut store, batch);
        }

        let request = SendRequest {
            content: last_user,
            conversation_id: Some(conversation_id.clone()),
            attachment: None,
            intent: SendIntent::Regenerate,
        };
        self.issue(request, conversation_id, None, placeholder_id).await
    }

    /// Forces every live message to `complete` with the stop marker and
    /// cancels the in-flight fragment drain. Authoritative locally,
    /// advisory to the backend; calling it with nothing live is a no-op.
    pub async fn stop_generation(&self) {
        self.generation.lock().await.cancel();
        let mut store = self.store.write().await;
        apply(&mut store, Action::StopGeneration);
        info!("generation stopped by user");
    }

    /// Fetches a conversation, makes it active, and reconciles its message
    /// history into the store.
    pub async fn load_conversation(&self, id: &ConversationId) -> Result<(), RillError> {
        let history = self.backend.get_conversation(id).await?;
        {
            let mut store = self.store.write().await;
            apply_all(
                &mut store,
                [
                    Action::RegisterConversation(history.conversation),
                    Action::SetActiveConversation(Some(id.clone())),
                    Action::SetMessages {
                        conversation_id: id.clone(),
                        messages: history.messages,
                    },
                ],
            );
        }
        self.ensure_feed(id.clone()).await;
        Ok(())
    }

    /// Refreshes the conversation list. Never touches message data.
    pub async fn load_conversations(&self) -> Result<Vec<Conversation>, RillError> {
        let conversations = self.backend.list_conversations().await?;
        let mut store = self.store.write().await;
        apply_all(
            &mut store,
            conversations
                .iter()
                .cloned()
                .map(Action::RegisterConversation),
        );
        Ok(conversations)
    }

    /// Deletes a conversation on the backend and locally.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RillError> {
        self.backend.delete_conversation(id).await?;
        let mut store = self.store.write().await;
        apply(&mut store, Action::RemoveConversation(id.clone()));
        Ok(())
    }

    /// Issues the prepared request and wires up the reply plumbing.
    async fn issue(
        &self,
        request: SendRequest,
        conversation_id: ConversationId,
        user_id: Option<MessageId>,
        placeholder_id: MessageId,
    ) -> Result<MessageId, RillError> {
        let (receipt, fragments) = match self.backend.stream_message(request).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "send failed");
                let mut store = self.store.write().await;
                let mut batch = vec![Action::UpsertMessageDelta {
                    message_id: placeholder_id,
                    delta: MessageDelta {
                        status: Some(MessageStatus::Error),
                        error: Some(e.to_string()),
                        ..MessageDelta::default()
                    },
                }];
                // The user message never reached the backend; `sending`
                // has no other exit.
                if let Some(user_id) = &user_id {
                    batch.push(Action::UpsertMessageDelta {
                        message_id: user_id.clone(),
                        delta: MessageDelta {
                            status: Some(MessageStatus::Error),
                            error: Some(e.to_string()),
                            ..MessageDelta::default()
                        },
                    });
                }
                batch.push(Action::SetGenerating(false));
                apply_all(&mut store, batch);
                return Err(e);
            }
        };

        let assistant_id = {
            let mut store = self.store.write().await;
            let mut batch = Vec::new();
            if receipt.conversation_id != conversation_id {
                batch.push(Action::PromoteConversationId {
                    old_id: conversation_id.clone(),
                    new_id: receipt.conversation_id.clone(),
                });
            }
            // Adopt the backend-assigned message id: the local placeholder
            // moves under the receipt id so transport events land on it.
            let assistant_id = if receipt.id != placeholder_id {
                if store.message(&receipt.id).is_some() {
                    // A transport event already materialized the reply under
                    // the backend id; keep its streamed content and drop the
                    // now-redundant local placeholder.
                    batch.push(Action::RemoveMessage(placeholder_id.clone()));
                } else if let Some(mut adopted) = store.message(&placeholder_id).cloned() {
                    adopted.id = receipt.id.clone();
                    adopted.conversation_id = receipt.conversation_id.clone();
                    batch.push(Action::RemoveMessage(placeholder_id.clone()));
                    batch.push(Action::UpsertMessage(adopted));
                }
                receipt.id.clone()
            } else {
                placeholder_id
            };
            if let Some(user_id) = user_id {
                batch.push(Action::UpsertMessageDelta {
                    message_id: user_id,
                    delta: MessageDelta {
                        status: Some(MessageStatus::Complete),
                        ..MessageDelta::default()
                    },
                });
            }
            apply_all(&mut store, batch);
            assistant_id
        };

        debug!(
            conversation = %receipt.conversation_id,
            message = %assistant_id,
            "send acknowledged, draining reply"
        );

        let drain_cancel = {
            let mut generation = self.generation.lock().await;
            *generation = self.cancel.child_token();
            generation.clone()
        };
        let store = Arc::clone(&self.store);
        let drain_id = assistant_id.clone();
        tokio::spawn(async move {
            drain_fragments(store, drain_id, fragments, drain_cancel).await;
        });

        if self.feed.is_some() {
            self.ensure_feed(receipt.conversation_id.clone()).await;
        } else {
            self.ensure_polling(receipt.conversation_id.clone()).await;
        }

        Ok(assistant_id)
    }

    /// Keeps exactly one feed task alive for the given conversation.
    async fn ensure_feed(&self, conversation: ConversationId) {
        let Some(feed) = self.feed.clone() else {
            return;
        };
        let mut guard = self.feed_task.lock().await;
        if let Some(task) = guard.as_ref()
            && task.conversation == conversation
            && !task.handle.is_finished()
        {
            return;
        }
        if let Some(task) = guard.take() {
            task.cancel.cancel();
        }
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(run_feed(
            Arc::clone(&self.store),
            feed,
            conversation.clone(),
            Backoff::new(self.config.reconnect_base, self.config.reconnect_max),
            cancel.clone(),
        ));
        *guard = Some(FeedTask {
            conversation,
            cancel,
            handle,
        });
    }

    /// Starts the polling fallback unless one is already running.
    async fn ensure_polling(&self, conversation: ConversationId) {
        if !self.config.polling_enabled {
            return;
        }
        let mut guard = self.poll_task.lock().await;
        if let Some(handle) = guard.as_ref()
            && !handle.is_finished()
        {
            return;
        }
        *guard = Some(polling::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.backend),
            conversation,
            self.config.poll_interval,
            self.cancel.child_token(),
        ));
    }
}

/// Applies an in-band fragment stream to the assistant message, in arrival
/// order, until the stream ends or the generation is cancelled.
async fn drain_fragments(
    store: Arc<RwLock<ChatStore>>,
    message_id: MessageId,
    mut fragments: FragmentStream,
    cancel: CancellationToken,
) {
    loop {
        let fragment = tokio::select! {
            _ = cancel.cancelled() => {
                // The stop transition already settled the message state.
                debug!(message = %message_id, "fragment drain cancelled");
                return;
            }
            fragment = fragments.next() => fragment,
        };

        match fragment {
            Some(Ok(fragment)) => {
                let mut batch = Vec::new();
                if let Some(content) = fragment.content {
                    batch.push(Action::UpsertMessageDelta {
                        message_id: message_id.clone(),
                        delta: MessageDelta {
                            content: Some(content),
                            status: Some(MessageStatus::Streaming),
                            conversation_id: fragment.conversation_id.clone(),
                            ..MessageDelta::default()
                        },
                    });
                }
                if fragment.done {
                    batch.push(Action::UpsertMessageDelta {
                        message_id: message_id.clone(),
                        delta: MessageDelta {
                            is_complete: Some(true),
                            ..MessageDelta::default()
                        },
                    });
                    batch.push(Action::SetGenerating(false));
                }
                let done = fragment.done;
                {
                    let mut store = store.write().await;
                    apply_all(&mut store, batch);
                }
                if done {
                    return;
                }
            }
            Some(Err(e)) => {
                warn!(message = %message_id, error = %e, "fragment stream failed");
                let mut store = store.write().await;
                apply_all(
                    &mut store,
                    [
                        Action::UpsertMessageDelta {
                            message_id: message_id.clone(),
                            delta: MessageDelta {
                                status: Some(MessageStatus::Error),
                                error: Some(e.to_string()),
                                ..MessageDelta::default()
                            },
                        },
                        Action::SetGenerating(false),
                    ],
                );
                return;
            }
            // Stream ended without an explicit done marker; treat it as
            // completion rather than leaving the message live forever.
            None => {
                let mut store = store.write().await;
                apply_all(
                    &mut store,
                    [
                        Action::UpsertMessageDelta {
                            message_id: message_id.clone(),
                            delta: MessageDelta {
                                is_complete: Some(true),
                                ..MessageDelta::default()
                            },
                        },
                        Action::SetGenerating(false),
                    ],
                );
                return;
            }
        }
    }
}

/// Reopens the event feed with capped backoff, forwarding every event to
/// the reducer in arrival order and tracking the connected flag.
async fn run_feed(
    store: Arc<RwLock<ChatStore>>,
    feed: Arc<dyn EventFeed>,
    conversation: ConversationId,
    mut backoff: Backoff,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match feed.open(&conversation).await {
            Ok(mut events) => {
                {
                    let mut store = store.write().await;
                    apply(&mut store, Action::SetConnected(true));
                }
                backoff.reset();
                loop {
                    let event = tokio::select! {
                        _ = cancel.cancelled() => {
                            let mut store = store.write().await;
                            apply(&mut store, Action::SetConnected(false));
                            return;
                        }
                        event = events.next() => event,
                    };
                    match event {
                        Some(Ok(event)) => {
                            let (message_id, delta) = event.into_delta();
                            let mut store = store.write().await;
                            apply(&mut store, Action::UpsertMessageDelta { message_id, delta });
                        }
                        Some(Err(e)) => {
                            warn!(conversation = %conversation, error = %e, "event feed error");
                            break;
                        }
                        None => break,
                    }
                }
                let mut store = store.write().await;
                apply(&mut store, Action::SetConnected(false));
            }
            Err(e) => {
                warn!(conversation = %conversation, error = %e, "event feed open failed");
            }
        }

        let delay = backoff.next_delay();
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Derives a conversation title from its first message.
fn title_from(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "New conversation".to_string();
    }
    let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        title.push('…');
    }
    title
}
