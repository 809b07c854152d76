//! Grammar for the JSON encoding of treatment documents.
//!
//! The grammar is plain JSON: objects, arrays, strings, numbers, `true`,
//! `false` and `null`, separated by arbitrary whitespace. Each value is wrapped
//! in a [`Node`] carrying the span it was read from, so that the validator can
//! point at any value later.
//!
//! Only this encoding is accepted. Block-style YAML (`key: value` lines
//! without braces) is rejected at its first character with E002, as is any
//! raw control character inside a string. Arrays and objects may nest at
//! most [`MAX_DEPTH`] levels deep.

use indexmap::IndexMap;
use winnow::{
    Parser as _,
    ascii::{digit1, multispace0},
    combinator::{alt, cut_err, opt, preceded, separated, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{one_of, take_while},
};

use stagebook_core::{
    Span,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    tree::{Document, Node, Value},
};

use crate::offsets::CharIndex;

/// Rich diagnostic information for loader errors.
///
/// Attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoaderDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    /// Byte offset the error span starts at; `None` points at the failure
    /// position itself.
    start: Option<usize>,
}

impl LoaderDiagnostic {
    const fn at_failure(code: ErrorCode, message: &'static str, help: Option<&'static str>) -> Self {
        Self {
            code,
            message,
            help,
            start: None,
        }
    }
}

/// Deepest array/object nesting the loader accepts.
pub(crate) const MAX_DEPTH: usize = 128;

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<LoaderDiagnostic>>;

/// Build a committed error carrying `diagnostic`.
fn cut_with(input: &Input<'_>, diagnostic: LoaderDiagnostic) -> ErrMode<ContextError<LoaderDiagnostic>> {
    ErrMode::Cut(ContextError::new().add_context(input, &input.checkpoint(), diagnostic))
}

/// Skip whitespace
fn ws(input: &mut Input<'_>) -> IResult<()> {
    multispace0.void().parse_next(input)
}

/// Parse four hex digits of a `\u` escape.
fn hex4(input: &mut Input<'_>, escape_start: usize) -> IResult<u32> {
    let digits = take_while(4..=4, |c: char| c.is_ascii_hexdigit())
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError<LoaderDiagnostic>>| cut_with(input, invalid_escape(escape_start)))?;
    u32::from_str_radix(digits, 16).map_err(|_| cut_with(input, invalid_escape(escape_start)))
}

fn invalid_escape(escape_start: usize) -> LoaderDiagnostic {
    LoaderDiagnostic {
        code: ErrorCode::E003,
        message: "invalid escape sequence",
        help: Some(r#"valid escapes are `\n`, `\r`, `\t`, `\b`, `\f`, `\\`, `\/`, `\"` and `\uXXXX`"#),
        start: Some(escape_start),
    }
}

/// Parse the remainder of an escape sequence; the backslash is already consumed.
fn string_escape(input: &mut Input<'_>) -> IResult<char> {
    let escape_start = input.current_token_start().saturating_sub(1);

    let ch = match input.next_token() {
        Some('n') => '\n',
        Some('r') => '\r',
        Some('t') => '\t',
        Some('b') => '\u{08}',
        Some('f') => '\u{0C}',
        Some('/') => '/',
        Some('\\') => '\\',
        Some('"') => '"',
        Some('u') => {
            let high = hex4(input, escape_start)?;
            let code = if (0xD800..0xDC00).contains(&high) {
                // Surrogate pair: a second `\uXXXX` must follow
                "\\u".parse_next(input)
                    .map_err(|_: ErrMode<ContextError<LoaderDiagnostic>>| {
                        cut_with(input, invalid_escape(escape_start))
                    })?;
                let low = hex4(input, escape_start)?;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(cut_with(input, invalid_escape(escape_start)));
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            } else {
                high
            };
            char::from_u32(code).ok_or_else(|| cut_with(input, invalid_escape(escape_start)))?
        }
        _ => return Err(cut_with(input, invalid_escape(escape_start))),
    };

    Ok(ch)
}

/// Parse a double-quoted string literal.
fn string_literal(input: &mut Input<'_>) -> IResult<String> {
    let start = input.current_token_start();
    '"'.parse_next(input)?;

    let unterminated = LoaderDiagnostic {
        code: ErrorCode::E001,
        message: "unterminated string literal",
        help: Some("close the string with `\"` before the end of the line"),
        start: Some(start),
    };

    let mut out = String::new();
    loop {
        let char_start = input.current_token_start();
        match input.next_token() {
            Some('"') => return Ok(out),
            Some('\\') => out.push(string_escape(input)?),
            Some('\n') | None => return Err(cut_with(input, unterminated)),
            Some('\u{0}'..='\u{1F}') => {
                return Err(cut_with(
                    input,
                    LoaderDiagnostic {
                        code: ErrorCode::E002,
                        message: "control character in string literal",
                        help: Some(r#"write it as an escape such as `\t` or `\u0009`"#),
                        start: Some(char_start),
                    },
                ));
            }
            Some(c) => out.push(c),
        }
    }
}

/// Parse a JSON number.
fn number(input: &mut Input<'_>) -> IResult<f64> {
    (
        opt('-'),
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .try_map(str::parse::<f64>)
        .parse_next(input)
}

/// Parse an array body after `[`; items sit at `depth`.
fn array<'a>(input: &mut Input<'a>, depth: usize) -> IResult<Vec<Node>> {
    '['.parse_next(input)?;

    let item = |i: &mut Input<'a>| value(i, depth);
    cut_err(terminated(
        preceded(ws, separated(0.., terminated(item, ws), terminated(',', ws))),
        ']',
    ))
    .context(LoaderDiagnostic::at_failure(
        ErrorCode::E100,
        "expected a value or `]`",
        Some("array items are separated by commas; trailing commas are not allowed"),
    ))
    .parse_next(input)
}

/// Parse one `"key": value` member of an object.
fn member<'a>(input: &mut Input<'a>, depth: usize) -> IResult<(String, Node)> {
    let key = string_literal.parse_next(input)?;

    cut_err((ws, ':', ws))
        .context(LoaderDiagnostic::at_failure(
            ErrorCode::E100,
            "expected `:` after object key",
            None,
        ))
        .parse_next(input)?;

    let node = cut_err(|i: &mut Input<'a>| value(i, depth))
        .context(LoaderDiagnostic::at_failure(
            ErrorCode::E100,
            "expected a value",
            None,
        ))
        .parse_next(input)?;

    Ok((key, node))
}

/// Parse an object body after `{`; member values sit at `depth`.
fn object<'a>(input: &mut Input<'a>, depth: usize) -> IResult<IndexMap<String, Node>> {
    '{'.parse_next(input)?;

    let entry = |i: &mut Input<'a>| member(i, depth);
    let members: Vec<(String, Node)> = cut_err(terminated(
        preceded(ws, separated(0.., terminated(entry, ws), terminated(',', ws))),
        '}',
    ))
    .context(LoaderDiagnostic::at_failure(
        ErrorCode::E100,
        "expected a `\"key\": value` member or `}`",
        Some("object members are separated by commas; trailing commas are not allowed"),
    ))
    .parse_next(input)?;

    // Later duplicates replace earlier ones, as in JSON.parse
    Ok(members.into_iter().collect())
}

/// Parse any value nested `depth` containers deep, recording its byte span.
fn value<'a>(input: &mut Input<'a>, depth: usize) -> IResult<Node> {
    let start = input.current_token_start();

    if depth >= MAX_DEPTH && input.starts_with(['[', '{']) {
        return Err(cut_with(
            input,
            LoaderDiagnostic {
                code: ErrorCode::E103,
                message: "arrays and objects are nested too deeply",
                help: Some("treatment documents never need more than a few dozen levels"),
                start: Some(start),
            },
        ));
    }

    let value = alt((
        (|i: &mut Input<'a>| object(i, depth + 1)).map(Value::Object),
        (|i: &mut Input<'a>| array(i, depth + 1)).map(Value::Array),
        string_literal.map(Value::String),
        number.map(Value::Number),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        "null".value(Value::Null),
    ))
    .parse_next(input)?;

    let end = input.current_token_start();
    Ok(Node::spanned(value, Span::new(start..end)))
}

/// Convert an ErrMode and error position to a Diagnostic.
///
/// Uses the innermost `LoaderDiagnostic` context when present. Failures at
/// the end of the input are reported as incomplete input; anything else
/// without context is an unexpected character.
fn convert_err_mode(
    err: ErrMode<ContextError<LoaderDiagnostic>>,
    error_pos: usize,
    source_len: usize,
    index: &CharIndex,
) -> Diagnostic {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };
    let at_eof = error_pos >= source_len;
    let point = index.span(error_pos, (error_pos + 1).min(source_len));

    if let Some(LoaderDiagnostic {
        code,
        message,
        help,
        start,
    }) = context_error.context().next()
    {
        if at_eof && *code == ErrorCode::E100 {
            return incomplete(point);
        }

        let span = match start {
            Some(start) => index.span(*start, error_pos),
            None => point,
        };
        let mut diag = Diagnostic::error(*message)
            .with_code(*code)
            .with_label(span, code.description());
        if let Some(h) = help {
            diag = diag.with_help(*h);
        }
        return diag;
    }

    if at_eof {
        return incomplete(point);
    }

    Diagnostic::error("unexpected character")
        .with_code(ErrorCode::E002)
        .with_label(point, ErrorCode::E002.description())
        .with_help("expected an object, array, string, number, `true`, `false` or `null`")
}

fn incomplete(span: Span) -> Diagnostic {
    Diagnostic::error("unexpected end of input")
        .with_code(ErrorCode::E101)
        .with_label(span, ErrorCode::E101.description())
}

/// Parse a whole document.
pub(crate) fn parse_document(source: &str) -> Result<Document, ParseError> {
    let index = CharIndex::new(source);
    let mut input = LocatingSlice::new(source);
    let mut diagnostics = DiagnosticCollector::new();

    ws(&mut input).map_err(|err| {
        ParseError::from(convert_err_mode(err, 0, source.len(), &index))
    })?;
    if input.is_empty() {
        return Ok(Document::empty());
    }

    match value(&mut input, 0) {
        Ok(root) => {
            ws(&mut input).map_err(|err| {
                let pos = input.current_token_start();
                ParseError::from(convert_err_mode(err, pos, source.len(), &index))
            })?;

            if input.is_empty() {
                return Ok(Document::new(index.rebase(root)));
            }

            let pos = input.current_token_start();
            diagnostics.emit(
                Diagnostic::error("unexpected content after the document")
                    .with_code(ErrorCode::E102)
                    .with_label(index.span(pos, source.len()), ErrorCode::E102.description())
                    .with_help("a treatment document holds exactly one top-level value"),
            );
        }
        Err(err) => {
            let pos = input.current_token_start();
            diagnostics.emit(convert_err_mode(err, pos, source.len(), &index));
        }
    }

    match diagnostics.finish() {
        Err(err) => Err(err),
        // Only reachable if no diagnostic was emitted, which the branches above rule out
        Ok(()) => Ok(Document::empty()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn parse_value(source: &str) -> Node {
        parse_document(source)
            .expect("document should parse")
            .root()
            .cloned()
            .expect("document should have a root")
    }

    fn first_error(source: &str) -> Diagnostic {
        let err = parse_document(source).expect_err("document should fail to parse");
        err.diagnostics()[0].clone()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse_value("true").value(), &Value::Bool(true));
        assert_eq!(parse_value("null").value(), &Value::Null);
        assert_eq!(parse_value("-12.5e1").value(), &Value::Number(-125.0));
        assert_eq!(parse_value(r#""a\"b""#).as_str(), Some("a\"b"));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(parse_value(r#""tab\there""#).as_str(), Some("tab\there"));
        assert_eq!(parse_value(r#""é""#).as_str(), Some("é"));
        assert_eq!(parse_value(r#""😂""#).as_str(), Some("😂"));
    }

    #[test]
    fn test_object_spans() {
        let source = r#"{ "name": "intro", "steps": [1, 2] }"#;
        let root = parse_value(source);

        assert_eq!(root.span(), Some(Span::new(0..source.len())));
        let name = root.get("name").unwrap();
        assert_eq!(name.span(), Some(Span::new(10..17)));
        let steps = root.get("steps").unwrap();
        assert_eq!(steps.as_array().map(<[Node]>::len), Some(2));
        assert_eq!(steps.span(), Some(Span::new(28..34)));
    }

    #[test]
    fn test_spans_are_character_offsets() {
        let root = parse_value(r#"{"é": "ü", "k": "v"}"#);
        // {"é": "ü", "k": "v"}
        // 0123456789...
        assert_eq!(root.get("é").unwrap().span(), Some(Span::new(6..9)));
        assert_eq!(root.get("k").unwrap().span(), Some(Span::new(16..19)));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let root = parse_value(r#"{"b": 1, "a": 2, "c": 3}"#);
        let keys: Vec<_> = root.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_input() {
        let document = parse_document("  \n ").expect("whitespace is an empty document");
        assert!(document.root().is_none());
    }

    #[test]
    fn test_unterminated_string() {
        let diag = first_error(r#"{"name": "oops}"#);
        assert_eq!(diag.code(), Some(ErrorCode::E001));
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(9));
    }

    #[test]
    fn test_invalid_escape() {
        let diag = first_error(r#""bad \q""#);
        assert_eq!(diag.code(), Some(ErrorCode::E003));
    }

    #[test]
    fn test_trailing_comma() {
        let diag = first_error("[1, 2,]");
        assert_eq!(diag.code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_missing_colon() {
        let diag = first_error(r#"{"a" 1}"#);
        assert_eq!(diag.code(), Some(ErrorCode::E100));
        assert_eq!(diag.message(), "expected `:` after object key");
    }

    #[test]
    fn test_incomplete_input() {
        let diag = first_error(r#"{"a": [1, 2"#);
        assert_eq!(diag.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_unexpected_character() {
        let diag = first_error("@");
        assert_eq!(diag.code(), Some(ErrorCode::E002));
    }

    #[test]
    fn test_raw_control_character_in_string() {
        let diag = first_error("{\"name\": \"a\tb\"}");
        assert_eq!(diag.code(), Some(ErrorCode::E002));
        assert_eq!(diag.message(), "control character in string literal");
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(11));
    }

    #[test]
    fn test_escaped_control_character_is_accepted() {
        assert_eq!(parse_value(r#""a\u0001b""#).as_str(), Some("a\u{1}b"));
    }

    #[test]
    fn test_nesting_at_limit() {
        let source = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_document(&source).is_ok());
    }

    #[test]
    fn test_nesting_past_limit() {
        let source = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        let diag = first_error(&source);
        assert_eq!(diag.code(), Some(ErrorCode::E103));
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(MAX_DEPTH));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let diag = first_error(&"[".repeat(200_000));
        assert_eq!(diag.code(), Some(ErrorCode::E103));

        let diag = first_error(&"{\"a\":".repeat(200_000));
        assert_eq!(diag.code(), Some(ErrorCode::E103));
    }

    #[test]
    fn test_block_yaml_is_rejected() {
        let diag = first_error("treatments:\n  - name: control\n");
        assert_eq!(diag.code(), Some(ErrorCode::E002));
        assert_eq!(diag.primary_span(), Some(Span::new(0..1)));
    }

    #[test]
    fn test_trailing_content() {
        let diag = first_error("{} {}");
        assert_eq!(diag.code(), Some(ErrorCode::E102));
        assert_eq!(diag.primary_span(), Some(Span::new(3..5)));
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Any plain string round-trips through a quoted literal with an exact span.
    fn check_plain_strings_parse(text: &str) -> Result<(), TestCaseError> {
        let source = format!("\"{text}\"");
        let node = parse_value(&source);
        prop_assert_eq!(node.as_str(), Some(text));
        prop_assert_eq!(node.span(), Some(Span::new(0..source.chars().count())));
        Ok(())
    }

    /// Integers are read as numbers with their value intact.
    fn check_integers_parse(n: i64) -> Result<(), TestCaseError> {
        let node = parse_value(&n.to_string());
        prop_assert_eq!(node.value(), &Value::Number(n as f64));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn plain_strings_parse(text in "[a-zA-Z0-9 .${}é]{0,24}") {
            check_plain_strings_parse(&text)?;
        }

        #[test]
        fn integers_parse(n in -1_000_000i64..1_000_000) {
            check_integers_parse(n)?;
        }
    }
}
