// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rill chat` command implementation.
//!
//! Launches an interactive REPL with a colored prompt, streaming output,
//! and readline history. All conversation state lives in the controller's
//! store; the REPL only renders what the reducer has applied, so output
//! stays consistent with whatever transport is delivering updates.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use rill_config::RillConfig;
use rill_core::RillError;
use rill_core::types::{ConversationId, Message, Role, THINKING_SECTION};
use rill_session::SessionController;

/// Render-loop tick while a reply is streaming.
const RENDER_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the `rill chat` interactive REPL.
pub async fn run_chat(
    controller: Arc<SessionController>,
    config: RillConfig,
    conversation: Option<String>,
) -> Result<(), RillError> {
    if let Some(id) = conversation {
        let id = ConversationId(id);
        controller.load_conversation(&id).await?;
        print_history(&controller, &id, &config).await;
    }

    let mut rl = DefaultEditor::new()
        .map_err(|e| RillError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "rill chat".bold().green());
    println!(
        "Type {} to exit, {} to stop a reply, {} to regenerate.\n",
        "/quit".yellow(),
        "/stop".yellow(),
        "/regen".yellow()
    );

    let prompt = format!("{}> ", "rill".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let result = match trimmed {
                    "/stop" => {
                        controller.stop_generation().await;
                        continue;
                    }
                    "/regen" => controller.regenerate_last_message().await,
                    _ => controller.send_message(trimmed, None).await,
                };

                match result {
                    Ok(_) => render_reply(&controller, &config).await,
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                controller.stop_generation().await;
                break;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Streams the in-flight assistant reply to stdout by diffing the store.
///
/// Message ids can be re-keyed mid-generation when the backend's receipt
/// arrives, so the reply is tracked positionally (last assistant message in
/// the active conversation) rather than by id. Section text only grows
/// while streaming, which makes printing the unseen suffix safe.
async fn render_reply(controller: &SessionController, config: &RillConfig) {
    let store = controller.store();
    let mut thinking_printed = 0;
    let mut response_printed = 0;

    loop {
        let snapshot = {
            let guard = store.read().await;
            let Some(conversation) = guard.active_conversation() else {
                return;
            };
            guard
                .messages_for(conversation)
                .into_iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(ReplySnapshot::of)
        };

        let Some(reply) = snapshot else { return };

        if config.client.show_thinking && reply.thinking.len() > thinking_printed {
            print!("{}", reply.thinking[thinking_printed..].dimmed());
            flush();
            thinking_printed = reply.thinking.len();
        }
        if reply.response.len() > response_printed {
            if response_printed == 0 && thinking_printed > 0 {
                println!();
            }
            print!("{}", &reply.response[response_printed..]);
            flush();
            response_printed = reply.response.len();
        }

        if reply.terminal {
            if let Some(error) = reply.error {
                eprintln!("\n{}: {error}", "error".red());
            } else {
                println!();
            }
            debug!(chars = response_printed, "reply rendered");
            return;
        }

        tokio::time::sleep(RENDER_INTERVAL).await;
    }
}

/// Owned view of the fields the render loop needs, so the store lock is
/// released between ticks.
struct ReplySnapshot {
    thinking: String,
    response: String,
    terminal: bool,
    error: Option<String>,
}

impl ReplySnapshot {
    fn of(message: &Message) -> Self {
        Self {
            thinking: message
                .section(THINKING_SECTION)
                .map(|s| s.content.clone())
                .unwrap_or_default(),
            response: message.response_text().to_string(),
            terminal: message.status.is_terminal(),
            error: message.error.clone(),
        }
    }
}

/// Prints the already-loaded history of a resumed conversation.
async fn print_history(
    controller: &SessionController,
    conversation: &ConversationId,
    config: &RillConfig,
) {
    let store = controller.store();
    let guard = store.read().await;
    for message in guard.messages_for(conversation) {
        match message.role {
            Role::User => println!("{}> {}", "you".cyan(), message.content),
            Role::Assistant => {
                if config.client.show_thinking
                    && let Some(thinking) = message.section(THINKING_SECTION)
                    && !thinking.content.is_empty()
                {
                    println!("{}", thinking.content.dimmed());
                }
                println!("{}", message.response_text());
            }
            Role::System => {}
        }
    }
}

fn flush() {
    use std::io::Write;
    let _ = std::io::stdout().flush();
}
