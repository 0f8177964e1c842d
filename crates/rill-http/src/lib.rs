// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference HTTP/SSE implementation of the rill backend interfaces.
//!
//! [`HttpBackend`] speaks the JSON REST protocol and drains in-band SSE
//! reply streams; [`SseFeed`] opens the per-conversation transport-event
//! feed. Everything network-shaped in the workspace lives here.

pub mod client;
pub mod sse;
pub mod types;

pub use client::{HttpBackend, SseFeed};
