//! Byte to character offset conversion.
//!
//! winnow reports byte positions; the document tree uses character offsets.

use stagebook_core::{
    Span,
    tree::{Node, Value},
};

/// Lookup table from byte offsets to character offsets.
pub(crate) struct CharIndex {
    /// `chars_before[b]` is the number of chars starting before byte `b`.
    chars_before: Vec<usize>,
    ascii: bool,
}

impl CharIndex {
    pub(crate) fn new(source: &str) -> Self {
        if source.is_ascii() {
            return Self {
                chars_before: Vec::new(),
                ascii: true,
            };
        }

        let mut chars_before = Vec::with_capacity(source.len() + 1);
        let mut count = 0;
        for (byte, _) in source.char_indices() {
            while chars_before.len() <= byte {
                chars_before.push(count);
            }
            count += 1;
        }
        while chars_before.len() <= source.len() {
            chars_before.push(count);
        }

        Self {
            chars_before,
            ascii: false,
        }
    }

    pub(crate) fn char_offset(&self, byte: usize) -> usize {
        if self.ascii {
            return byte;
        }
        self.chars_before
            .get(byte)
            .copied()
            .unwrap_or_else(|| self.chars_before.last().copied().unwrap_or_default())
    }

    pub(crate) fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.char_offset(start)..self.char_offset(end))
    }

    /// Rewrite every byte span in `node` as a character span.
    pub(crate) fn rebase(&self, node: Node) -> Node {
        if self.ascii {
            return node;
        }

        let (value, span) = node.into_parts();
        let value = match value {
            Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, self.rebase(child)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.rebase(item)).collect())
            }
            scalar => scalar,
        };

        match span {
            Some(span) => Node::spanned(value, self.span(span.start(), span.end())),
            None => Node::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_identity() {
        let index = CharIndex::new("abc");
        assert_eq!(index.char_offset(2), 2);
        assert_eq!(index.span(1, 3), Span::new(1..3));
    }

    #[test]
    fn test_multibyte_offsets() {
        // 'é' is two bytes, '😂' four
        let index = CharIndex::new("é😂x");
        assert_eq!(index.char_offset(0), 0);
        assert_eq!(index.char_offset(2), 1);
        assert_eq!(index.char_offset(6), 2);
        assert_eq!(index.char_offset(7), 3);
    }
}
