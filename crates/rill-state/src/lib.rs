// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side chat state: the content separator, the conversation store,
//! and the reconciliation reducer that is its sole mutator.
//!
//! The crate is deliberately free of I/O and async. The session layer
//! feeds it actions; everything here is synchronous and unit-testable.

pub mod content;
pub mod reducer;
pub mod store;

pub use content::{Separated, StableSplit, separate, separate_streaming, split_stable};
pub use reducer::{Action, apply, apply_all};
pub use store::ChatStore;
