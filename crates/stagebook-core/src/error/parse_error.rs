//! Loader failures.
//!
//! A document that cannot be loaded never reaches validation. The loader stops
//! at the first problem, but [`ParseError`] holds a list so callers render
//! every diagnostic the same way.

use std::fmt;

use crate::error::Diagnostic;

/// Why a document could not be loaded.
#[derive(Debug, Clone)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The diagnostic nearest the start of the document.
    pub fn first(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.first() else {
            return f.write_str("document could not be loaded");
        };

        write!(f, "{first}")?;
        if let Some(offset) = first.primary_span().map(|span| span.start()) {
            write!(f, " (at character {offset})")?;
        }
        match self.diagnostics.len() {
            0 | 1 => Ok(()),
            n => write!(f, " and {} more problem{}", n - 1, if n == 2 { "" } else { "s" }),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Span, error::ErrorCode};

    #[test]
    fn test_display_points_at_first_problem() {
        let err = ParseError::from(
            Diagnostic::error("Unterminated string")
                .with_code(ErrorCode::E001)
                .with_label(Span::new(12..20), "string starts here"),
        );

        assert_eq!(
            err.to_string(),
            "error[E001]: Unterminated string (at character 12)"
        );
    }

    #[test]
    fn test_display_counts_remaining_problems() {
        let err = ParseError::from(vec![
            Diagnostic::error("Expected `,` or `]`").with_code(ErrorCode::E100),
            Diagnostic::error("Trailing content").with_code(ErrorCode::E102),
            Diagnostic::error("Trailing content").with_code(ErrorCode::E102),
        ]);

        assert_eq!(
            err.to_string(),
            "error[E100]: Expected `,` or `]` and 2 more problems"
        );
        assert_eq!(err.into_diagnostics().len(), 3);
    }

    #[test]
    fn test_display_without_diagnostics() {
        assert_eq!(
            ParseError::new(Vec::new()).to_string(),
            "document could not be loaded"
        );
    }
}
