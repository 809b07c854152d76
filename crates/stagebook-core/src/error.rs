//! Error and diagnostic system for Stagebook.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - Multiple labeled spans for rich error context
//! - Severity levels
//! - Diagnostic collector for accumulating multiple findings
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning message with optional error code, multiple source
//! locations, and help text. Loader failures wrap their diagnostics in
//! [`ParseError`]; the validator hands its (advisory) diagnostics back as a
//! plain list.
//!
//! # Example
//!
//! ```
//! # use stagebook_core::error::{Diagnostic, ErrorCode};
//! # use stagebook_core::Span;
//!
//! let span = Span::new(100..120);
//! let original_span = Span::new(50..70);
//!
//! let diag = Diagnostic::warning("Duplicate name \"P\" for element type \"prompt\"")
//!     .with_code(ErrorCode::E301)
//!     .with_label(span, "duplicate name")
//!     .with_secondary_label(original_span, "first declared here")
//!     .with_help("rename one of the elements");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub use collector::DiagnosticCollector;
pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::{Label, LabelStyle};
pub use parse_error::ParseError;
pub use severity::Severity;
