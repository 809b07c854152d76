//! Problems found by the validation phases, addressed by path.
//!
//! Phases report a [`Finding`] against a structural [`Path`]; the validator
//! turns each finding into a [`Diagnostic`] once the path has been resolved
//! to a source span.

use stagebook_core::{
    Span,
    error::{Diagnostic, ErrorCode},
    path::Path,
    position::Range,
};

/// A warning that has not been placed in the source yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    code: ErrorCode,
    message: String,
    path: Path,
    help: Option<String>,
}

impl Finding {
    pub fn new(code: ErrorCode, message: impl Into<String>, path: Path) -> Self {
        Self {
            code,
            message: message.into(),
            path,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the problem is, in the document tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert into a warning labelled at `span`.
    pub(crate) fn into_diagnostic(self, span: Span, range: Range) -> Diagnostic {
        let diagnostic = Diagnostic::warning(self.message)
            .with_code(self.code)
            .with_label(span, self.code.description())
            .with_range(range);
        match self.help {
            Some(help) => diagnostic.with_help(help),
            None => diagnostic,
        }
    }
}
