// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rill conversations` command implementation.

use std::sync::Arc;

use chrono::DateTime;
use colored::Colorize;

use rill_core::RillError;
use rill_session::SessionController;

/// Lists conversations on the backend, most recently updated first.
pub async fn run_conversations(controller: Arc<SessionController>) -> Result<(), RillError> {
    let conversations = controller.load_conversations().await?;

    if conversations.is_empty() {
        println!("{}", "no conversations".dimmed());
        return Ok(());
    }

    for conversation in &conversations {
        let updated = DateTime::parse_from_rfc3339(&conversation.updated_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| conversation.updated_at.clone());
        let title = if conversation.title.is_empty() {
            "(untitled)".dimmed().to_string()
        } else {
            conversation.title.clone()
        };
        println!(
            "{}  {}  {}",
            conversation.id.0.cyan(),
            updated.dimmed(),
            title
        );
    }

    Ok(())
}
