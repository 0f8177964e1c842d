// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parsers for the rill backend protocol.
//!
//! Two SSE surfaces share one framing: the in-band reply stream returned by
//! `POST /messages` (a `receipt` event followed by `fragment` events) and
//! the per-conversation event feed (`message_update` events). Both are
//! parsed with the `eventsource-stream` crate; unknown event names are
//! silently skipped so the server can add events without breaking older
//! clients.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use rill_core::RillError;
use rill_core::traits::transport::EventStream;
use rill_core::types::{MessageFragment, SendReceipt, TransportEvent};

use crate::types::ApiErrorResponse;

/// One event from the in-band reply stream of `POST /messages`.
#[derive(Debug, Clone)]
pub enum SendEvent {
    /// The backend's acknowledgement; always the first event.
    Receipt(SendReceipt),
    /// One fragment of the assistant reply. The terminal fragment carries
    /// `done: true`.
    Fragment(MessageFragment),
    /// Keep-alive ping.
    Ping,
}

/// Parses the streaming response of `POST /messages`.
pub fn parse_send_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<SendEvent, RillError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let parsed = match event.event.as_str() {
                    "receipt" => serde_json::from_str::<SendReceipt>(&event.data)
                        .map(SendEvent::Receipt)
                        .map_err(|e| RillError::Backend {
                            message: format!("failed to parse receipt event: {e}"),
                            source: Some(Box::new(e)),
                        }),
                    "fragment" => serde_json::from_str::<MessageFragment>(&event.data)
                        .map(SendEvent::Fragment)
                        .map_err(|e| RillError::Backend {
                            message: format!("failed to parse fragment event: {e}"),
                            source: Some(Box::new(e)),
                        }),
                    "ping" => Ok(SendEvent::Ping),
                    "error" => Err(parse_stream_error(&event.data)),
                    // Unknown event names are skipped for forward compatibility.
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(RillError::Backend {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

/// Parses a per-conversation event feed response into transport events.
pub fn parse_event_feed(response: reqwest::Response) -> EventStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => match event.event.as_str() {
                "message_update" => Some(
                    serde_json::from_str::<TransportEvent>(&event.data).map_err(|e| {
                        RillError::Transport {
                            message: format!("failed to parse message_update event: {e}"),
                            source: Some(Box::new(e)),
                        }
                    }),
                ),
                "ping" => None,
                "error" => Some(Err(parse_stream_error(&event.data))),
                _ => None,
            },
            Err(e) => Some(Err(RillError::Transport {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

fn parse_stream_error(data: &str) -> RillError {
    match serde_json::from_str::<ApiErrorResponse>(data) {
        Ok(api_err) => RillError::Backend {
            message: format!("{}: {}", api_err.error.type_, api_err.error.message),
            source: None,
        },
        Err(_) => RillError::Backend {
            message: format!("stream error event: {data}"),
            source: None,
        },
    }
}
