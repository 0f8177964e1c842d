// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the rill backend protocol.
//!
//! Provides [`HttpBackend`] (the `ChatBackend` implementation over JSON
//! REST + in-band SSE replies) and [`SseFeed`] (the `EventFeed`
//! implementation over the per-conversation event stream). Handles request
//! construction, bearer authentication, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use rill_core::RillError;
use rill_core::traits::backend::{ChatBackend, FragmentStream};
use rill_core::traits::transport::{EventFeed, EventStream};
use rill_core::types::{
    Conversation, ConversationCreated, ConversationHistory, ConversationId, SendReceipt,
    SendRequest,
};

use crate::sse::{self, SendEvent};
use crate::types::{ApiErrorResponse, SendPayload};

/// Overall request timeout. Generous because it also bounds the in-band
/// reply stream of a send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Delay before the single transient-error retry.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP implementation of [`ChatBackend`].
///
/// Manages authentication headers, connection pooling, and retry logic for
/// transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpBackend {
    /// Creates a backend client for the given base URL.
    ///
    /// When `api_token` is set, every request carries it as a bearer
    /// authorization header.
    pub fn new(base_url: &str, api_token: Option<&str>) -> Result<Self, RillError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(api_token)?)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RillError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Executes a request, retrying once after a short delay on transient
    /// errors.
    async fn execute_with_retry<F>(
        &self,
        build: F,
        what: &'static str,
    ) -> Result<reqwest::Response, RillError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, what, "retrying request after transient error");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = build().send().await.map_err(|e| RillError::Backend {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

            let status = response.status();
            debug!(status = %status, attempt, what, "response received");

            if status.is_success() {
                return Ok(response);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(RillError::Backend {
                    message: format!("backend returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "{what} failed ({}): {}",
                    api_err.error.type_, api_err.error.message
                ),
                Err(_) => format!("backend returned {status}: {body}"),
            };
            return Err(RillError::Backend {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| RillError::Backend {
            message: format!("{what} failed after retries"),
            source: None,
        }))
    }

    async fn json<T, F>(&self, build: F, what: &'static str) -> Result<T, RillError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.execute_with_retry(build, what).await?;
        let body = response.text().await.map_err(|e| RillError::Backend {
            message: format!("failed to read {what} response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| RillError::Backend {
            message: format!("failed to parse {what} response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn create_conversation(&self) -> Result<ConversationCreated, RillError> {
        let url = self.url("/conversations");
        self.json(
            || self.client.post(&url).json(&serde_json::json!({})),
            "create conversation",
        )
        .await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, RillError> {
        let url = self.url("/conversations");
        self.json(|| self.client.get(&url), "list conversations").await
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationHistory, RillError> {
        let url = self.url(&format!("/conversations/{id}"));
        self.json(|| self.client.get(&url), "get conversation").await
    }

    async fn send_message(&self, request: SendRequest) -> Result<SendReceipt, RillError> {
        let url = self.url("/messages");
        self.json(
            || {
                self.client
                    .post(&url)
                    .json(&SendPayload::from_request(&request, false))
            },
            "send message",
        )
        .await
    }

    async fn stream_message(
        &self,
        request: SendRequest,
    ) -> Result<(SendReceipt, FragmentStream), RillError> {
        let url = self.url("/messages");
        let response = self
            .execute_with_retry(
                || {
                    self.client
                        .post(&url)
                        .json(&SendPayload::from_request(&request, true))
                },
                "stream message",
            )
            .await?;

        let mut events = sse::parse_send_stream(response);

        // The protocol requires the receipt before any fragment.
        let receipt = loop {
            match events.next().await {
                Some(Ok(SendEvent::Receipt(receipt))) => break receipt,
                Some(Ok(SendEvent::Ping)) => continue,
                Some(Ok(SendEvent::Fragment(_))) => {
                    return Err(RillError::Backend {
                        message: "stream yielded a fragment before the receipt".into(),
                        source: None,
                    });
                }
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(RillError::Backend {
                        message: "stream ended before the receipt".into(),
                        source: None,
                    });
                }
            }
        };

        let fragments = events.filter_map(|event| async move {
            match event {
                Ok(SendEvent::Fragment(fragment)) => Some(Ok(fragment)),
                Ok(SendEvent::Receipt(_)) | Ok(SendEvent::Ping) => None,
                Err(e) => Some(Err(e)),
            }
        });

        Ok((receipt, Box::pin(fragments) as FragmentStream))
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RillError> {
        let url = self.url(&format!("/conversations/{id}"));
        self.execute_with_retry(|| self.client.delete(&url), "delete conversation")
            .await?;
        Ok(())
    }
}

/// SSE implementation of [`EventFeed`].
///
/// Opens `GET /conversations/{id}/events` and keeps it as a long-lived
/// stream; no overall timeout is applied since the feed is expected to
/// outlive any single request. Reconnection is the caller's concern.
#[derive(Debug, Clone)]
pub struct SseFeed {
    client: reqwest::Client,
    base_url: String,
}

impl SseFeed {
    pub fn new(base_url: &str, api_token: Option<&str>) -> Result<Self, RillError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(api_token)?)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RillError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventFeed for SseFeed {
    async fn open(&self, conversation: &ConversationId) -> Result<EventStream, RillError> {
        let url = format!("{}/conversations/{conversation}/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RillError::Transport {
                message: format!("feed connection failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RillError::Transport {
                message: format!("feed open returned {status}: {body}"),
                source: None,
            });
        }

        debug!(conversation = %conversation, "event feed opened");
        Ok(sse::parse_event_feed(response))
    }
}

fn default_headers(api_token: Option<&str>) -> Result<HeaderMap, RillError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = api_token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                RillError::Config(format!("invalid API token header value: {e}"))
            })?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// True for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
