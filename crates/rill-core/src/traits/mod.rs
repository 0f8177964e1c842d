// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the core: the chat backend, the
//! transport-event feed, and the editor-insertion capability.

pub mod backend;
pub mod inserter;
pub mod transport;

pub use backend::{ChatBackend, FragmentStream};
pub use inserter::Inserter;
pub use transport::{EventFeed, EventStream};
