//! Error codes for the Stagebook diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Loader lexical errors
//! - `E1xx` - Loader structural errors
//! - `E2xx` - Reference errors
//! - `E3xx` - Name uniqueness errors
//! - `E4xx` - Template errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Loader Lexical Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A string was opened with a quote but never closed.
    E001,

    /// Unexpected character.
    ///
    /// A character was encountered that cannot start any value or token.
    E002,

    /// Invalid escape sequence.
    ///
    /// Valid escapes are: `\n`, `\r`, `\t`, `\b`, `\f`, `\\`, `\/`, `\"`, `\uXXXX`.
    E003,

    // =========================================================================
    // Loader Structural Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The loader encountered a token it did not expect at this position.
    E100,

    /// Incomplete input.
    ///
    /// The input ended before a complete value was read.
    E101,

    /// Trailing content.
    ///
    /// More content follows the top-level value.
    E102,

    /// Nesting too deep.
    ///
    /// Arrays and objects are nested past the loader's depth limit.
    E103,

    // =========================================================================
    // Reference Errors (E2xx)
    // =========================================================================
    /// Unresolved reference.
    ///
    /// No prompt, survey or submit button with the referenced name is
    /// declared anywhere in the timeline.
    E200,

    /// Reference before initialization.
    ///
    /// The referenced element is declared, but only in a later stage.
    E201,

    /// Unknown field.
    ///
    /// A fixed-vocabulary reference (`connectionInfo`, `browserInfo`) names a
    /// field that does not exist.
    E202,

    // =========================================================================
    // Name Errors (E3xx)
    // =========================================================================
    /// Duplicate name within the intro sequences.
    E300,

    /// Duplicate name within a treatment.
    E301,

    /// Reserved name.
    ///
    /// A treatment declares a name already declared by the intro sequences.
    E302,

    // =========================================================================
    // Template Errors (E4xx)
    // =========================================================================
    /// Unknown template.
    ///
    /// A `template` key names a template that is not defined.
    E400,

    /// Template cycle.
    ///
    /// Expanding a template eventually leads back to itself.
    E401,

    /// Duplicate template name.
    E402,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexical errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            // Structural errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            // Reference errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            // Name errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            // Template errors
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "invalid escape sequence",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "trailing content",
            ErrorCode::E103 => "nesting too deep",
            ErrorCode::E200 => "unresolved reference",
            ErrorCode::E201 => "reference before initialization",
            ErrorCode::E202 => "unknown field",
            ErrorCode::E300 => "duplicate intro name",
            ErrorCode::E301 => "duplicate treatment name",
            ErrorCode::E302 => "reserved intro name",
            ErrorCode::E400 => "unknown template",
            ErrorCode::E401 => "template cycle",
            ErrorCode::E402 => "duplicate template name",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
