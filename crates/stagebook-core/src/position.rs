//! Position resolution: structural paths to source ranges.
//!
//! The validator addresses problems by [`Path`]; editors want zero-based
//! line/column ranges. This module bridges the two:
//!
//! - [`offset_to_position`] turns a character offset into a [`Position`].
//! - [`resolve_span`] walks a [`Path`] through a [`Document`], keeping the span
//!   of the deepest node that has one.
//! - [`find_position_from_path`] combines both into a [`Range`].
//!
//! Conversions are linear in the offset. They only run when a diagnostic is
//! emitted, never inside the validation loops.

use std::fmt;

use log::trace;

use crate::{path::Path, span::Span, tree::Document};

/// A zero-based line/column location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // One-based for humans
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A start/end pair of [`Position`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Convert a [`Span`] of character offsets into a line/column range.
    pub fn from_span(span: Span, text: &str) -> Self {
        Self {
            start: offset_to_position(span.start(), text),
            end: offset_to_position(span.end(), text),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Convert a character offset into a zero-based line/column position.
///
/// The line is the number of `\n` characters before `offset`; the column is
/// the distance from the last of those newlines. Offsets past the end of the
/// text are clamped to the end.
///
/// # Examples
///
/// ```
/// use stagebook_core::position::{Position, offset_to_position};
///
/// let text = "a: 1\nbb: 2\n";
/// assert_eq!(offset_to_position(0, text), Position::new(0, 0));
/// assert_eq!(offset_to_position(7, text), Position::new(1, 2));
/// ```
pub fn offset_to_position(offset: usize, text: &str) -> Position {
    let mut line = 0;
    let mut line_start = 0;
    let mut consumed = 0;

    for (index, ch) in text.chars().take(offset).enumerate() {
        if ch == '\n' {
            line += 1;
            line_start = index + 1;
        }
        consumed = index + 1;
    }

    Position::new(line, consumed - line_start)
}

/// Walk `path` from the document root and return the span of the deepest
/// node along the way that carries one.
///
/// Segments that do not exist in the tree (scaffolding introduced by template
/// expansion, or content that was edited away) stop the descent; the last
/// recorded span is kept. Returns `None` when the document has no root or
/// no node along the path carries a span.
pub fn resolve_span(path: &Path, document: &Document) -> Option<Span> {
    let root = document.root()?;
    let mut last_known = root.span();
    let mut current = root;

    for segment in path.segments() {
        let Some(next) = current.child(segment) else {
            trace!(path:% = path, segment:?; "Path segment not present in tree");
            break;
        };
        if let Some(span) = next.span() {
            last_known = Some(span);
        }
        current = next;
    }

    last_known
}

/// Resolve `path` against `document` and convert the result to a [`Range`].
///
/// Returns `None` if the document has no root or the path meets no spans.
pub fn find_position_from_path(path: &Path, document: &Document, text: &str) -> Option<Range> {
    resolve_span(path, document).map(|span| Range::from_span(span, text))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::tree::Node;

    #[test]
    fn test_offset_to_position_first_line() {
        assert_eq!(offset_to_position(0, "hello"), Position::new(0, 0));
        assert_eq!(offset_to_position(3, "hello"), Position::new(0, 3));
    }

    #[test]
    fn test_offset_to_position_after_newline() {
        let text = "ab\ncd\nef";
        assert_eq!(offset_to_position(2, text), Position::new(0, 2));
        assert_eq!(offset_to_position(3, text), Position::new(1, 0));
        assert_eq!(offset_to_position(7, text), Position::new(2, 1));
    }

    #[test]
    fn test_offset_to_position_clamps_past_end() {
        assert_eq!(offset_to_position(100, "ab\nc"), Position::new(1, 1));
        assert_eq!(offset_to_position(5, ""), Position::new(0, 0));
    }

    #[test]
    fn test_offset_to_position_counts_chars_not_bytes() {
        let text = "é\nü";
        assert_eq!(offset_to_position(1, text), Position::new(0, 1));
        assert_eq!(offset_to_position(3, text), Position::new(1, 1));
    }

    fn spanned_document() -> Document {
        // {"a": [ {"b": "x"} ]}
        let inner = Node::object([("b", Node::string("x").with_span(Span::new(12..15)))])
            .with_span(Span::new(7..16));
        let array = Node::array([inner]).with_span(Span::new(6..18));
        Document::new(Node::object([("a", array)]).with_span(Span::new(0..19)))
    }

    #[test]
    fn test_resolve_span_exact_path() {
        let document = spanned_document();
        let path = Path::root().key("a").index(0).key("b");
        assert_eq!(resolve_span(&path, &document), Some(Span::new(12..15)));
    }

    #[test]
    fn test_resolve_span_keeps_last_known_for_missing_segments() {
        let document = spanned_document();
        let path = Path::root().key("a").index(0).key("elements").index(3);
        assert_eq!(resolve_span(&path, &document), Some(Span::new(7..16)));
    }

    #[test]
    fn test_resolve_span_skips_unspanned_nodes() {
        let inner = Node::object([("name", Node::string("p"))]);
        let document = Document::new(
            Node::object([("list", Node::array([inner]).with_span(Span::new(2..9)))])
                .with_span(Span::new(0..10)),
        );
        let path = Path::root().key("list").index(0).key("name");
        assert_eq!(resolve_span(&path, &document), Some(Span::new(2..9)));
    }

    #[test]
    fn test_find_position_from_path_without_root() {
        let path = Path::root().key("anything");
        assert_eq!(find_position_from_path(&path, &Document::empty(), ""), None);
    }

    #[test]
    fn test_resolve_span_without_any_span() {
        let document = Document::new(Node::object([("a", Node::string("x"))]));
        assert_eq!(resolve_span(&Path::root().key("a"), &document), None);
    }

    #[test]
    fn test_find_position_from_path_converts_range() {
        let text = "{\"a\":\n [ {\"b\": \"x\"} ]}";
        let b = Node::string("x").with_span(Span::new(15..18));
        let document = Document::new(
            Node::object([("a", Node::array([Node::object([("b", b)])]))])
                .with_span(Span::new(0..22)),
        );
        let path = Path::root().key("a").index(0).key("b");
        let range = find_position_from_path(&path, &document, text).expect("root present");
        assert_eq!(range.start, Position::new(1, 9));
        assert_eq!(range.end, Position::new(1, 12));
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Rebuilding the offset from line starts and column gives the offset back.
    fn check_position_reconstructs_offset(text: &str, offset: usize) -> Result<(), TestCaseError> {
        let char_count = text.chars().count();
        let offset = offset.min(char_count);
        let position = offset_to_position(offset, text);

        let line_start: usize = text
            .split('\n')
            .take(position.line)
            .map(|line| line.chars().count() + 1)
            .sum();

        prop_assert_eq!(line_start + position.column, offset);
        Ok(())
    }

    /// Positions never decrease as the offset grows.
    fn check_positions_are_monotonic(text: &str, offset: usize) -> Result<(), TestCaseError> {
        let a = offset_to_position(offset, text);
        let b = offset_to_position(offset + 1, text);
        prop_assert!(a <= b, "{a:?} should not be after {b:?}");
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn position_reconstructs_offset(text in "[a-z\n]{0,60}", offset in 0usize..80) {
            check_position_reconstructs_offset(&text, offset)?;
        }

        #[test]
        fn positions_are_monotonic(text in "[a-zé\n]{0,60}", offset in 0usize..80) {
            check_positions_are_monotonic(&text, offset)?;
        }
    }
}
