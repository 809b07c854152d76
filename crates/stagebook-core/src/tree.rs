//! The position-annotated document tree.
//!
//! A [`Document`] mirrors the parsed source of a treatment file. Every node may
//! carry the [`Span`] of source text it was read from; nodes produced without a
//! source (for example in tests) simply have no span. The tree is immutable
//! once built and is shared read-only by every validation phase.

use indexmap::IndexMap;

use crate::{path::PathSegment, span::Span};

/// The value held by a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Key/value mapping; keys keep their source order.
    Object(IndexMap<String, Node>),
    Array(Vec<Node>),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// A tree node with an optional source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    value: Value,
    span: Option<Span>,
}

impl Node {
    /// Create a node without span information.
    pub fn new(value: Value) -> Self {
        Self { value, span: None }
    }

    /// Create a node read from `span` of the source.
    pub fn spanned(value: Value, span: Span) -> Self {
        Self {
            value,
            span: Some(span),
        }
    }

    /// Build an object node from key/node pairs, preserving their order.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::new(Value::Object(
            entries
                .into_iter()
                .map(|(key, node)| (key.into(), node))
                .collect(),
        ))
    }

    /// Build an array node.
    pub fn array(items: impl IntoIterator<Item = Node>) -> Self {
        Self::new(Value::Array(items.into_iter().collect()))
    }

    /// Build a string node.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Value::String(value.into()))
    }

    /// Attach a span to this node.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// The value of this node.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The source span of this node, if it was read from text.
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Split the node into its value and span.
    pub fn into_parts(self) -> (Value, Option<Span>) {
        (self.value, self.span)
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match &self.value {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up an object member by key. Returns `None` for non-objects.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|entries| entries.get(key))
    }

    /// Descend one path segment: a key into an object or an index into an array.
    pub fn child(&self, segment: &PathSegment) -> Option<&Node> {
        match (segment, &self.value) {
            (PathSegment::Key(key), Value::Object(entries)) => entries.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
    }

    /// Short human-readable name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.value {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        }
    }
}

/// A parsed treatment document.
///
/// The root is absent when the source contained no content at all (an empty
/// file); every consumer treats that as "nothing to validate".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    root: Option<Node>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root: Some(root) }
    }

    /// A document without any content.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }
}
