//! Error types for Stagebook operations.
//!
//! Validation problems are never errors: they are returned as diagnostics.
//! [`StagebookError`] covers what stops a document from being validated at
//! all.

use std::io;

use thiserror::Error;

use stagebook_core::error::ParseError;

/// The main error type for Stagebook operations.
///
/// The `Parse` variant keeps the source text next to the loader diagnostics
/// so that they can be rendered with context.
#[derive(Debug, Error)]
pub enum StagebookError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StagebookError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
