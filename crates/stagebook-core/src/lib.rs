//! Stagebook Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Stagebook loader
//! and validator. It includes:
//!
//! - **Spans**: Character-offset ranges into the source text ([`span::Span`])
//! - **Paths**: Structural addresses into a document ([`path::Path`])
//! - **Tree**: The immutable, position-annotated document tree ([`tree`] module)
//! - **Positions**: Offset to line/column conversion and path resolution
//!   ([`position`] module)
//! - **Errors**: The diagnostic system shared by all phases ([`error`] module)

pub mod error;
pub mod path;
pub mod position;
pub mod span;
pub mod tree;

pub use span::Span;
