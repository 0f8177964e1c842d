// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the rill JSON REST + SSE backend protocol.
//!
//! The REST payloads reuse the core data model directly (it already derives
//! serde); this module only adds the shapes that exist purely on the wire.

use rill_core::types::{Attachment, ConversationId, SendIntent, SendRequest};
use serde::{Deserialize, Serialize};

/// Structured error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail within an API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

/// Outbound body for `POST /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct SendPayload<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<&'a Attachment>,
    pub intent: SendIntent,
    /// True when the reply should be delivered in-band as SSE fragments.
    pub stream: bool,
}

impl<'a> SendPayload<'a> {
    pub fn from_request(request: &'a SendRequest, stream: bool) -> Self {
        Self {
            content: &request.content,
            conversation_id: request.conversation_id.as_ref(),
            attachment: request.attachment.as_ref(),
            intent: request.intent,
            stream,
        }
    }
}
