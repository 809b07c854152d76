//! # Stagebook Parser
//!
//! Loader for treatment documents. It reads the JSON encoding of a treatment
//! file (the flow subset of YAML) and produces a position-annotated
//! [`Document`] in which every node carries the character span it was read
//! from. The validator never looks at the text again except to turn those
//! spans into line/column ranges.
//!
//! Block-style YAML is not supported. A `*.treatments.yaml` file written with
//! `key: value` lines fails to load with E002 at its first character; convert
//! it to JSON first.
//!
//! ## Usage
//!
//! ```
//! # use stagebook_parser::parse;
//! # use stagebook_core::error::ParseError;
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"{ "treatments": [ { "name": "control", "gameStages": [] } ] }"#;
//!
//!     let document = parse(source)?;
//!     assert!(document.root().is_some());
//!     Ok(())
//! }
//! ```

mod json;
mod offsets;

use log::debug;

use stagebook_core::{error::ParseError, tree::Document};

/// Parse source text into a position-annotated document.
///
/// Empty (or whitespace-only) input yields a document without a root.
///
/// # Errors
///
/// Returns a [`ParseError`] holding one diagnostic per problem found. Spans in
/// those diagnostics are character offsets, like every other span in the
/// tree.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let document = json::parse_document(source)?;
    debug!(has_root = document.root().is_some(); "Document loaded");
    Ok(document)
}
