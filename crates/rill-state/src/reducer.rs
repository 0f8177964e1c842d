// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reconciliation reducer: the sole mutator of [`ChatStore`].
//!
//! `apply` is a pure, synchronous state transition with no I/O, so every
//! reconciliation rule is testable without a transport. The session
//! controller serializes all applications, which makes each action (and
//! each batch applied under one lock) atomic with respect to readers.

use rill_core::types::{
    Conversation, ConversationId, Message, MessageDelta, MessageId, MessageStatus, Role,
    UpdateMode, RESPONSE_SECTION, STOP_MARKER, THINKING_SECTION, UNRESOLVED_CONVERSATION,
};
use tracing::{debug, trace};

use crate::content;
use crate::store::ChatStore;

/// A typed state transition on the chat store.
#[derive(Debug, Clone)]
pub enum Action {
    /// Inserts or replaces a conversation by id.
    RegisterConversation(Conversation),
    /// Switches the active pointer without touching message data.
    SetActiveConversation(Option<ConversationId>),
    /// Bulk-replaces a conversation's message set from a history fetch.
    /// Prior messages with a live status survive the replace.
    SetMessages {
        conversation_id: ConversationId,
        messages: Vec<Message>,
    },
    /// Inserts or replaces one full message. This is the optimistic-insert
    /// path: the controller registers the local user message and assistant
    /// placeholder before the backend has acknowledged anything.
    UpsertMessage(Message),
    /// The streaming-update entry point. Synthesizes a placeholder when
    /// the message id is unknown.
    UpsertMessageDelta {
        message_id: MessageId,
        delta: MessageDelta,
    },
    /// Re-keys a conversation from a client-minted temporary id to the
    /// backend-assigned one, rewriting every referencing message.
    PromoteConversationId {
        old_id: ConversationId,
        new_id: ConversationId,
    },
    /// Manual stop: forces every live message to `complete` with a
    /// visible stop marker. Client-side display control only.
    StopGeneration,
    /// Coarse UI gate for an in-flight generation.
    SetGenerating(bool),
    /// Coarse UI gate for transport-feed connectivity.
    SetConnected(bool),
    /// Deletes a message by id (regenerate-in-place flows).
    RemoveMessage(MessageId),
    /// Deletes a conversation and all of its messages.
    RemoveConversation(ConversationId),
}

/// Applies one action to the store.
pub fn apply(store: &mut ChatStore, action: Action) {
    match action {
        Action::RegisterConversation(conversation) => {
            trace!(conversation = %conversation.id, "register conversation");
            store
                .conversations
                .insert(conversation.id.clone(), conversation);
        }
        Action::SetActiveConversation(id) => {
            store.active_conversation = id;
        }
        Action::SetMessages {
            conversation_id,
            messages,
        } => set_messages(store, conversation_id, messages),
        Action::UpsertMessage(message) => {
            let conversation_id = message.conversation_id.clone();
            store.messages.insert(message.id.clone(), message);
            touch_conversation(store, &conversation_id);
        }
        Action::UpsertMessageDelta { message_id, delta } => {
            upsert_delta(store, message_id, delta)
        }
        Action::PromoteConversationId { old_id, new_id } => {
            promote_conversation_id(store, old_id, new_id)
        }
        Action::StopGeneration => stop_generation(store),
        Action::SetGenerating(value) => store.generating = value,
        Action::SetConnected(value) => store.connected = value,
        Action::RemoveMessage(id) => {
            store.messages.remove(&id);
        }
        Action::RemoveConversation(id) => {
            store.conversations.remove(&id);
            store.messages.retain(|_, m| m.conversation_id != id);
            if store.active_conversation.as_ref() == Some(&id) {
                store.active_conversation = None;
            }
        }
    }
}

/// Applies a batch of actions. The caller holds whatever lock makes the
/// batch atomic; the reducer itself is lock-free.
pub fn apply_all(store: &mut ChatStore, actions: impl IntoIterator<Item = Action>) {
    for action in actions {
        apply(store, action);
    }
}

/// Bulk replace with the placeholder-preservation rule: a full history
/// fetch can race an in-flight generation the snapshot does not yet
/// reflect, and dropping the live placeholder would make streamed content
/// vanish mid-generation. Live messages therefore survive the replace and
/// win id collisions against the snapshot.
fn set_messages(store: &mut ChatStore, conversation_id: ConversationId, messages: Vec<Message>) {
    let preserved: Vec<Message> = store
        .messages
        .values()
        .filter(|m| m.conversation_id == conversation_id && m.status.is_live())
        .cloned()
        .collect();

    store
        .messages
        .retain(|_, m| m.conversation_id != conversation_id);

    for msg in messages {
        store.messages.insert(msg.id.clone(), msg);
    }
    for msg in preserved {
        // On an id collision the live local copy wins, except against a
        // terminal snapshot message: the server knowing the generation
        // finished is what lets a polled fetch settle the message.
        if let Some(incoming) = store.messages.get(&msg.id)
            && incoming.status.is_terminal()
        {
            continue;
        }
        debug!(message = %msg.id, status = %msg.status, "preserving in-flight message across bulk replace");
        store.messages.insert(msg.id.clone(), msg);
    }

    touch_conversation(store, &conversation_id);
}

fn upsert_delta(store: &mut ChatStore, message_id: MessageId, delta: MessageDelta) {
    // Placeholder-on-demand: a transport event for a not-yet-acknowledged
    // message may arrive before the optimistic insert. Never drop the
    // update because local bookkeeping has not caught up.
    if !store.messages.contains_key(&message_id) {
        let conversation_id = delta
            .conversation_id
            .clone()
            .unwrap_or_else(|| ConversationId(UNRESOLVED_CONVERSATION.into()));
        debug!(message = %message_id, conversation = %conversation_id, "synthesizing placeholder for unknown message id");
        store.messages.insert(
            message_id.clone(),
            Message::placeholder(message_id.clone(), conversation_id),
        );
    }

    let Some(msg) = store.messages.get_mut(&message_id) else {
        return;
    };

    // A delta that knows the conversation resolves a sentinel placeholder.
    if let Some(conversation_id) = &delta.conversation_id
        && msg.conversation_id.0 == UNRESOLVED_CONVERSATION
    {
        msg.conversation_id = conversation_id.clone();
    }

    if let Some(content) = &delta.content {
        match delta.section.as_deref() {
            // A named non-response section gets only that section mutated;
            // `content` and the response mirror are untouched this delta.
            Some(name) if name != RESPONSE_SECTION => {
                let section = msg.section_mut(name);
                match delta.mode {
                    UpdateMode::Append => section.content.push_str(content),
                    UpdateMode::Replace => section.content = content.clone(),
                }
            }
            _ => {
                match delta.mode {
                    UpdateMode::Append => msg.content.push_str(content),
                    UpdateMode::Replace => msg.content = content.clone(),
                }
                if msg.role == Role::Assistant {
                    mirror_assistant_sections(msg);
                }
            }
        }
    }

    // External status signal takes precedence over locally inferred status.
    if let Some(status) = delta.status {
        msg.status = status;
    }
    if let Some(error) = delta.error {
        msg.error = Some(error);
    }

    if delta.is_complete == Some(true) {
        msg.mark_complete();
        // Only a streaming message advances; a message already moved to
        // error by another path is not revived.
        if msg.status == MessageStatus::Streaming {
            msg.status = MessageStatus::Complete;
        }
        if msg.role == Role::Assistant {
            finalize_assistant_content(msg);
        }
    }

    let conversation_id = msg.conversation_id.clone();
    touch_conversation(store, &conversation_id);
}

/// Re-derives the response/thinking sections from the full raw content.
///
/// Recomputing from the accumulated text (rather than classifying each
/// fragment) makes the view independent of how the stream was chunked: a
/// delimiter split across fragments resolves itself once its second half
/// arrives.
fn mirror_assistant_sections(msg: &mut Message) {
    let view = content::separate_streaming(&msg.content);
    msg.section_mut(RESPONSE_SECTION).content = view.response;
    if !view.thinking.is_empty() {
        msg.section_mut(THINKING_SECTION).content = view.thinking;
    }
}

/// Terminal normalization: strips delimiters out of `content` so it
/// converges with the response section.
fn finalize_assistant_content(msg: &mut Message) {
    let finalized = content::separate(&msg.content);
    if !finalized.thinking.is_empty() {
        msg.section_mut(THINKING_SECTION).content = finalized.thinking;
    }
    msg.section_mut(RESPONSE_SECTION).content = finalized.response.clone();
    msg.content = finalized.response;
}

/// Atomic re-key: conversation, every referencing message, and the active
/// pointer move together; re-applying after completion is a no-op.
fn promote_conversation_id(
    store: &mut ChatStore,
    old_id: ConversationId,
    new_id: ConversationId,
) {
    if old_id == new_id {
        return;
    }

    if let Some(mut conversation) = store.conversations.remove(&old_id) {
        conversation.id = new_id.clone();
        store.conversations.insert(new_id.clone(), conversation);
        debug!(old = %old_id, new = %new_id, "conversation id promoted");
    }

    for msg in store.messages.values_mut() {
        if msg.conversation_id == old_id {
            msg.conversation_id = new_id.clone();
        }
    }

    if store.active_conversation.as_ref() == Some(&old_id) {
        store.active_conversation = Some(new_id);
    }
}

fn stop_generation(store: &mut ChatStore) {
    for msg in store.messages.values_mut() {
        if !msg.status.is_live() {
            continue;
        }
        if msg.role == Role::Assistant {
            // Settle a possibly mid-delimiter raw buffer before marking.
            let view = content::separate_streaming(&msg.content);
            if !view.thinking.is_empty() {
                msg.section_mut(THINKING_SECTION).content = view.thinking;
            }
            msg.content = view.response;
        }
        msg.content.push_str(STOP_MARKER);
        msg.section_mut(RESPONSE_SECTION).content = msg.content.clone();
        msg.status = MessageStatus::Complete;
        msg.mark_complete();
    }
    store.generating = false;
}

/// Bumps `updated_at` on every message activity.
fn touch_conversation(store: &mut ChatStore, id: &ConversationId) {
    if let Some(conversation) = store.conversations.get_mut(id) {
        conversation.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::types::{Section, UNRESOLVED_CONVERSATION};

    fn delta(content: &str) -> MessageDelta {
        MessageDelta::append(content)
    }

    fn upsert(store: &mut ChatStore, id: &str, d: MessageDelta) {
        apply(
            store,
            Action::UpsertMessageDelta {
                message_id: MessageId(id.into()),
                delta: d,
            },
        );
    }

    fn get<'a>(store: &'a ChatStore, id: &str) -> &'a Message {
        store.message(&MessageId(id.into())).expect("message exists")
    }

    #[test]
    fn upsert_message_inserts_and_replaces() {
        let mut store = ChatStore::new();
        let msg = Message::new(
            MessageId("u1".into()),
            ConversationId("c1".into()),
            Role::User,
            "first",
            MessageStatus::Sending,
        );
        apply(&mut store, Action::UpsertMessage(msg.clone()));
        assert_eq!(get(&store, "u1").content, "first");

        let mut replaced = msg;
        replaced.content = "second".into();
        replaced.status = MessageStatus::Complete;
        apply(&mut store, Action::UpsertMessage(replaced));
        let stored = get(&store, "u1");
        assert_eq!(stored.content, "second");
        assert_eq!(stored.status, MessageStatus::Complete);
    }

    #[test]
    fn unknown_id_synthesizes_placeholder() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("hello"));

        let msg = get(&store, "m1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.status, MessageStatus::Streaming);
        assert_eq!(msg.conversation_id.0, UNRESOLVED_CONVERSATION);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.response_text(), "hello");
    }

    #[test]
    fn placeholder_resolves_conversation_from_later_delta() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("a"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                content: Some("b".into()),
                conversation_id: Some(ConversationId("conv-9".into())),
                ..MessageDelta::default()
            },
        );
        assert_eq!(get(&store, "m1").conversation_id.0, "conv-9");
    }

    #[test]
    fn append_deltas_concatenate_in_order() {
        let mut store = ChatStore::new();
        for piece in ["one ", "two ", "three"] {
            upsert(&mut store, "m1", delta(piece));
        }
        assert_eq!(get(&store, "m1").content, "one two three");
    }

    #[test]
    fn replace_mode_overwrites_content() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("draft"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                content: Some("final".into()),
                mode: UpdateMode::Replace,
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.content, "final");
        assert_eq!(msg.response_text(), "final");
    }

    #[test]
    fn section_targeted_delta_leaves_content_alone() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("visible"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                content: Some("internal".into()),
                section: Some(THINKING_SECTION.into()),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.content, "visible");
        assert_eq!(msg.response_text(), "visible");
        assert_eq!(msg.section(THINKING_SECTION).unwrap().content, "internal");
    }

    #[test]
    fn thinking_section_created_on_demand() {
        let mut store = ChatStore::new();
        // A message registered via SetMessages may carry no sections at all.
        let mut bare = Message::new(
            MessageId("m1".into()),
            ConversationId("c1".into()),
            Role::Assistant,
            "",
            MessageStatus::Streaming,
        );
        bare.sections.clear();
        apply(
            &mut store,
            Action::SetMessages {
                conversation_id: ConversationId("c1".into()),
                messages: vec![bare],
            },
        );
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                content: Some("hmm".into()),
                section: Some(THINKING_SECTION.into()),
                ..MessageDelta::default()
            },
        );
        let section = get(&store, "m1").section(THINKING_SECTION).unwrap();
        assert_eq!(section.content, "hmm");
        assert!(section.visible);
    }

    #[test]
    fn status_overwrites_unconditionally() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta(""));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                status: Some(MessageStatus::Processing),
                ..MessageDelta::default()
            },
        );
        assert_eq!(get(&store, "m1").status, MessageStatus::Processing);
    }

    #[test]
    fn error_delta_records_description() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("partial"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                status: Some(MessageStatus::Error),
                error: Some("backend error: 500".into()),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.status, MessageStatus::Error);
        assert_eq!(msg.error.as_deref(), Some("backend error: 500"));
    }

    #[test]
    fn is_complete_advances_only_streaming() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("done"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                is_complete: Some(true),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert!(msg.is_complete());
    }

    #[test]
    fn is_complete_does_not_revive_errored_message() {
        let mut store = ChatStore::new();
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                status: Some(MessageStatus::Error),
                ..MessageDelta::default()
            },
        );
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                is_complete: Some(true),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.status, MessageStatus::Error);
        assert!(msg.is_complete(), "metadata flag is still established");
    }

    #[test]
    fn split_think_tag_classifies_once_closed() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("<thi"));
        upsert(&mut store, "m1", delta("nk>reasoning</think>answer"));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                is_complete: Some(true),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.section(THINKING_SECTION).unwrap().content, "reasoning");
        assert_eq!(msg.response_text(), "answer");
        assert_eq!(msg.content, "answer");
    }

    #[test]
    fn partial_open_tag_not_shown_mid_stream() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("Sure.<thi"));
        let msg = get(&store, "m1");
        // Raw content keeps everything; the response view withholds the
        // fragment that may still become a delimiter.
        assert_eq!(msg.content, "Sure.<thi");
        assert_eq!(msg.response_text(), "Sure.");
    }

    #[test]
    fn content_converges_with_response_once_complete() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("<think>a</think> hello "));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                is_complete: Some(true),
                ..MessageDelta::default()
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.content, msg.response_text());
    }

    #[test]
    fn set_messages_replaces_but_preserves_live() {
        let conv = ConversationId("c1".into());
        let mut store = ChatStore::new();

        let mut old_complete = Message::new(
            MessageId("old".into()),
            conv.clone(),
            Role::User,
            "old",
            MessageStatus::Complete,
        );
        old_complete.timestamp = 1;
        let mut live = Message::placeholder(MessageId("live".into()), conv.clone());
        live.timestamp = 2;
        store.messages.insert(old_complete.id.clone(), old_complete);
        store.messages.insert(live.id.clone(), live);

        let fetched = Message::new(
            MessageId("server-1".into()),
            conv.clone(),
            Role::User,
            "hello",
            MessageStatus::Complete,
        );
        apply(
            &mut store,
            Action::SetMessages {
                conversation_id: conv.clone(),
                messages: vec![fetched],
            },
        );

        let ids: Vec<&str> = store
            .messages_for(&conv)
            .iter()
            .map(|m| m.id.0.as_str())
            .collect();
        assert!(ids.contains(&"server-1"));
        assert!(ids.contains(&"live"), "live placeholder must survive");
        assert!(!ids.contains(&"old"), "terminal messages are replaced");
    }

    #[test]
    fn set_messages_live_message_wins_stale_collision() {
        let conv = ConversationId("c1".into());
        let mut store = ChatStore::new();
        let mut live = Message::placeholder(MessageId("m1".into()), conv.clone());
        live.content = "streamed so far".into();
        store.messages.insert(live.id.clone(), live);

        // Snapshot carries a stale empty copy under the same id.
        let stale = Message::new(
            MessageId("m1".into()),
            conv.clone(),
            Role::Assistant,
            "",
            MessageStatus::Processing,
        );
        apply(
            &mut store,
            Action::SetMessages {
                conversation_id: conv,
                messages: vec![stale],
            },
        );
        assert_eq!(get(&store, "m1").content, "streamed so far");
    }

    #[test]
    fn set_messages_terminal_snapshot_settles_live_message() {
        let conv = ConversationId("c1".into());
        let mut store = ChatStore::new();
        let mut live = Message::placeholder(MessageId("m1".into()), conv.clone());
        live.content = "partial".into();
        store.messages.insert(live.id.clone(), live);

        let finished = Message::new(
            MessageId("m1".into()),
            conv.clone(),
            Role::Assistant,
            "full reply",
            MessageStatus::Complete,
        );
        apply(
            &mut store,
            Action::SetMessages {
                conversation_id: conv,
                messages: vec![finished],
            },
        );
        let msg = get(&store, "m1");
        assert_eq!(msg.content, "full reply");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert!(!store.has_live_messages());
    }

    #[test]
    fn set_messages_does_not_touch_other_conversations() {
        let mut store = ChatStore::new();
        let other = Message::new(
            MessageId("other".into()),
            ConversationId("c2".into()),
            Role::User,
            "hi",
            MessageStatus::Complete,
        );
        store.messages.insert(other.id.clone(), other);

        apply(
            &mut store,
            Action::SetMessages {
                conversation_id: ConversationId("c1".into()),
                messages: vec![],
            },
        );
        assert!(store.message(&MessageId("other".into())).is_some());
    }

    #[test]
    fn promotion_rewrites_conversation_messages_and_active_pointer() {
        let temp = ConversationId("temp-1".into());
        let real = ConversationId("conv-42".into());
        let mut store = ChatStore::new();
        apply(
            &mut store,
            Action::RegisterConversation(Conversation::new(temp.clone(), "New chat")),
        );
        apply(&mut store, Action::SetActiveConversation(Some(temp.clone())));
        for id in ["u1", "a1"] {
            upsert(
                &mut store,
                id,
                MessageDelta {
                    conversation_id: Some(temp.clone()),
                    ..MessageDelta::default()
                },
            );
        }

        apply(
            &mut store,
            Action::PromoteConversationId {
                old_id: temp.clone(),
                new_id: real.clone(),
            },
        );

        assert!(store.conversation(&temp).is_none());
        assert_eq!(store.conversation(&real).unwrap().id, real);
        assert_eq!(store.messages_for(&temp).len(), 0);
        assert_eq!(store.messages_for(&real).len(), 2);
        assert_eq!(store.active_conversation(), Some(&real));
    }

    #[test]
    fn promotion_is_idempotent() {
        let temp = ConversationId("temp-1".into());
        let real = ConversationId("conv-42".into());
        let mut store = ChatStore::new();
        apply(
            &mut store,
            Action::RegisterConversation(Conversation::new(temp.clone(), "t")),
        );
        for _ in 0..2 {
            apply(
                &mut store,
                Action::PromoteConversationId {
                    old_id: temp.clone(),
                    new_id: real.clone(),
                },
            );
        }
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].id, real);
    }

    #[test]
    fn promotion_same_id_is_noop() {
        let id = ConversationId("conv-1".into());
        let mut store = ChatStore::new();
        apply(
            &mut store,
            Action::RegisterConversation(Conversation::new(id.clone(), "t")),
        );
        apply(
            &mut store,
            Action::PromoteConversationId {
                old_id: id.clone(),
                new_id: id.clone(),
            },
        );
        assert!(store.conversation(&id).is_some());
    }

    #[test]
    fn stop_appends_marker_once_and_completes() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("partial answer"));
        apply(&mut store, Action::SetGenerating(true));

        apply(&mut store, Action::StopGeneration);
        let msg = get(&store, "m1");
        assert_eq!(msg.content, "partial answer [Stopped]");
        assert_eq!(msg.response_text(), "partial answer [Stopped]");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert!(!store.generating());

        // Second stop is a no-op: nothing is live anymore.
        apply(&mut store, Action::StopGeneration);
        assert_eq!(get(&store, "m1").content, "partial answer [Stopped]");
    }

    #[test]
    fn stop_settles_mid_delimiter_content() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("<think>half a thou"));
        apply(&mut store, Action::StopGeneration);
        let msg = get(&store, "m1");
        assert_eq!(msg.content, " [Stopped]");
        assert_eq!(msg.section(THINKING_SECTION).unwrap().content, "half a thou");
        assert_eq!(msg.content, msg.response_text());
    }

    #[test]
    fn remove_message_deletes_by_id() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("x"));
        apply(&mut store, Action::RemoveMessage(MessageId("m1".into())));
        assert!(store.message(&MessageId("m1".into())).is_none());
    }

    #[test]
    fn remove_conversation_drops_messages_and_active_pointer() {
        let conv = ConversationId("c1".into());
        let mut store = ChatStore::new();
        apply(
            &mut store,
            Action::RegisterConversation(Conversation::new(conv.clone(), "t")),
        );
        apply(&mut store, Action::SetActiveConversation(Some(conv.clone())));
        upsert(
            &mut store,
            "m1",
            MessageDelta {
                conversation_id: Some(conv.clone()),
                ..MessageDelta::default()
            },
        );

        apply(&mut store, Action::RemoveConversation(conv.clone()));
        assert!(store.conversation(&conv).is_none());
        assert!(store.messages_for(&conv).is_empty());
        assert!(store.active_conversation().is_none());
    }

    #[test]
    fn set_active_does_not_alter_messages() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("kept"));
        apply(
            &mut store,
            Action::SetActiveConversation(Some(ConversationId("c2".into()))),
        );
        apply(&mut store, Action::SetActiveConversation(None));
        assert_eq!(get(&store, "m1").content, "kept");
    }

    #[test]
    fn connected_flag_flips() {
        let mut store = ChatStore::new();
        apply(&mut store, Action::SetConnected(true));
        assert!(store.connected());
        apply(&mut store, Action::SetConnected(false));
        assert!(!store.connected());
    }

    #[test]
    fn message_activity_touches_conversation_updated_at() {
        let conv = ConversationId("c1".into());
        let mut store = ChatStore::new();
        let mut conversation = Conversation::new(conv.clone(), "t");
        conversation.updated_at = "2020-01-01T00:00:00+00:00".into();
        apply(&mut store, Action::RegisterConversation(conversation));

        upsert(
            &mut store,
            "m1",
            MessageDelta {
                content: Some("hi".into()),
                conversation_id: Some(conv.clone()),
                ..MessageDelta::default()
            },
        );
        assert!(store.conversation(&conv).unwrap().updated_at.as_str() > "2020-01-02");
    }

    #[test]
    fn sections_stay_independently_toggleable() {
        let mut store = ChatStore::new();
        upsert(&mut store, "m1", delta("<think>a</think>b"));
        let msg = get(&store, "m1");
        let response = msg.section(RESPONSE_SECTION).unwrap();
        let thinking = msg.section(THINKING_SECTION).unwrap();
        assert_eq!(
            (response.visible, thinking.visible),
            (true, true),
            "visibility defaults survive streaming: {:?}",
            Section::empty()
        );
    }
}
