//! Stagebook - reference and timeline validation for treatment documents.
//!
//! A treatment document describes a multi-stage study: intro sequences,
//! treatments made of game stages and exit steps, and templates that stand in
//! for repeated content. This crate expands templates into one ordered
//! timeline per treatment and checks that every reference to a named survey,
//! prompt or submit button points at an element declared on the same stage or
//! an earlier one. Problems are reported as warnings placed in the source.
//!
//! Documents are read in their JSON encoding only. Block-style YAML fails to
//! load with E002.

pub mod config;
pub mod expand;
pub mod finding;
pub mod model;
pub mod references;
pub mod registry;
pub mod store;
pub mod timeline;
pub mod validate;

mod error;

pub use stagebook_core::{
    Span,
    error::{Diagnostic, ErrorCode, ParseError, Severity},
    path::Path,
    position::{Position, Range},
    tree::Document,
};

pub use error::StagebookError;

use std::fs;

use log::{debug, info};

use config::AppConfig;
use store::DiagnosticStore;

/// Entry point for loading and validating treatment documents.
///
/// # Examples
///
/// ```
/// use stagebook::{Linter, config::AppConfig};
///
/// let source = r#"{
///   "treatments": [ { "name": "control", "gameStages": [
///     { "elements": [ { "type": "display", "reference": "survey.intake.age" } ] }
///   ] } ]
/// }"#;
///
/// let linter = Linter::new(AppConfig::default());
/// let diagnostics = linter.lint(source).expect("document loads");
///
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].range().map(|r| r.start.line), Some(2));
/// ```
#[derive(Debug, Default)]
pub struct Linter {
    config: AppConfig,
}

impl Linter {
    /// Create a linter with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load source text into a position-annotated document.
    ///
    /// # Errors
    ///
    /// Returns [`StagebookError::Parse`] when the text is not a well-formed
    /// document.
    pub fn load(&self, source: &str) -> Result<Document, StagebookError> {
        let document = stagebook_parser::parse(source)
            .map_err(|err| StagebookError::new_parse_error(err, source))?;
        debug!("Document loaded successfully");
        Ok(document)
    }

    /// Run the reference and timeline checks over a loaded document.
    ///
    /// `text` is the source the document was loaded from; it is used to turn
    /// spans into line/column ranges.
    pub fn validate(&self, document: &Document, text: &str) -> Vec<Diagnostic> {
        let diagnostics = validate::validate(document, text, self.config.validation());
        info!(diagnostics = diagnostics.len(); "Validation finished");
        diagnostics
    }

    /// Load and validate `source`.
    ///
    /// # Errors
    ///
    /// Returns [`StagebookError::Parse`] when the text is not a well-formed
    /// document.
    pub fn lint(&self, source: &str) -> Result<Vec<Diagnostic>, StagebookError> {
        let document = self.load(source)?;
        Ok(self.validate(&document, source))
    }

    /// Read, load and validate the file at `path`.
    ///
    /// Returns the file's text along with its diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`StagebookError::Io`] if the file cannot be read and
    /// [`StagebookError::Parse`] if it is not a well-formed document.
    pub fn lint_file(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(String, Vec<Diagnostic>), StagebookError> {
        let path = path.as_ref();
        info!(path:% = path.display(); "Linting file");

        let source = fs::read_to_string(path)?;
        let diagnostics = self.lint(&source)?;
        Ok((source, diagnostics))
    }

    /// Validate `document` as a new pass of `document_id` and publish the
    /// result to `store`.
    ///
    /// Returns `false` if a newer pass for the same document was started
    /// while this one ran, in which case nothing is published.
    pub fn validate_and_publish(
        &self,
        store: &DiagnosticStore,
        document_id: &str,
        document: &Document,
        text: &str,
    ) -> bool {
        let ticket = store.begin_pass(document_id);
        let diagnostics = self.validate(document, text);
        store.publish(&ticket, diagnostics)
    }
}
