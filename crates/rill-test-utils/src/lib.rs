// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles shared across the rill workspace.
//!
//! Everything here is deterministic and in-process so the higher layers can
//! exercise full send/stream/reconcile flows without a server.

pub mod mock_backend;
pub mod scripted_feed;

pub use mock_backend::MockBackend;
pub use scripted_feed::ScriptedFeed;
