// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability interface for pushing generated snippets into whatever
//! editing surface is currently active. The core never depends on a
//! concrete editor implementation.

/// An editor surface that can receive generated content.
pub trait Inserter: Send + Sync {
    /// Inserts a code block in the given language.
    fn insert_code(&self, text: &str, language: &str);

    /// Inserts a LaTeX math expression.
    fn insert_math(&self, latex: &str);
}
