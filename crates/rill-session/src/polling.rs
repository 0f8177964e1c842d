// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling fallback transport.
//!
//! When no push feed is configured, the active conversation is re-fetched
//! on a bounded interval and reconciled through `SetMessages` (the
//! placeholder-preservation rule keeps an in-flight local message from
//! being clobbered by a stale snapshot). The task stops itself once no
//! message in the store is live, so it never runs while nothing is being
//! generated.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rill_core::traits::backend::ChatBackend;
use rill_core::types::ConversationId;
use rill_state::{Action, ChatStore, apply_all};

/// Spawns the poll loop for one conversation.
///
/// Fetches never overlap: the loop awaits each fetch before the next tick
/// is considered.
pub(crate) fn spawn(
    store: Arc<RwLock<ChatStore>>,
    backend: Arc<dyn ChatBackend>,
    conversation: ConversationId,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; the send that
        // started this loop has not reached the backend yet, so skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(conversation = %conversation, "poll loop cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if !store.read().await.has_live_messages() {
                debug!(conversation = %conversation, "generation settled, stopping poll loop");
                return;
            }

            match backend.get_conversation(&conversation).await {
                Ok(history) => {
                    let mut store = store.write().await;
                    apply_all(
                        &mut store,
                        [
                            Action::RegisterConversation(history.conversation),
                            Action::SetMessages {
                                conversation_id: conversation.clone(),
                                messages: history.messages,
                            },
                        ],
                    );
                }
                // Transient: keep polling until generation settles or the
                // loop is cancelled.
                Err(e) => {
                    warn!(conversation = %conversation, error = %e, "poll fetch failed");
                }
            }
        }
    })
}
