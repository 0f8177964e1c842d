// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for rill: the controller that owns the chat
//! store, drives the backend, and keeps a transport (push feed or polling
//! fallback) attached while generations are in flight.

pub mod backoff;
pub mod controller;
pub mod polling;

pub use backoff::Backoff;
pub use controller::{ControllerConfig, SessionController};
