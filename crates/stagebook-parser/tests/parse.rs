use stagebook_core::{
    error::ErrorCode,
    path::Path,
    position::{Position, find_position_from_path},
    tree::Value,
};
use stagebook_parser::parse;

const TREATMENT_FILE: &str = r#"{
  "introSequences": [
    {
      "name": "default",
      "introSteps": [
        { "name": "consent", "elements": [ { "type": "survey", "name": "demographics" } ] }
      ]
    }
  ],
  "treatments": [
    {
      "name": "control",
      "playerCount": 2,
      "gameStages": [
        {
          "name": "discussion",
          "duration": 300,
          "elements": [
            { "type": "display", "reference": "survey.demographics.result.age" }
          ]
        }
      ]
    }
  ]
}
"#;

#[test]
fn loads_treatment_file() {
    let document = parse(TREATMENT_FILE).expect("treatment file should load");
    let root = document.root().expect("root");

    let treatment = root
        .get("treatments")
        .and_then(|t| t.as_array())
        .and_then(|t| t.first())
        .expect("one treatment");
    assert_eq!(treatment.get("name").and_then(|n| n.as_str()), Some("control"));
    assert_eq!(
        treatment.get("playerCount").map(|n| n.value()),
        Some(&Value::Number(2.0))
    );
}

#[test]
fn paths_resolve_to_source_lines() {
    let document = parse(TREATMENT_FILE).expect("treatment file should load");

    let path = Path::root()
        .key("treatments")
        .index(0)
        .key("gameStages")
        .index(0)
        .key("elements")
        .index(0)
        .key("reference");
    let range = find_position_from_path(&path, &document, TREATMENT_FILE).expect("range");

    // Line 18 (0-based) holds the display element
    assert_eq!(range.start.line, 18);
    assert!(range.start < range.end);
    assert_eq!(range.end.line, 18);

    let root_range =
        find_position_from_path(&Path::root(), &document, TREATMENT_FILE).expect("root range");
    assert_eq!(root_range.start, Position::new(0, 0));
}

#[test]
fn reports_error_position_in_characters() {
    let source = "{\"naïve\": [1, 2 3]}";
    let err = parse(source).expect_err("missing comma is invalid");
    let diag = &err.diagnostics()[0];

    assert_eq!(diag.code(), Some(ErrorCode::E100));
    // `3` is the 17th character even though it starts at the 18th byte
    assert_eq!(diag.primary_span().map(|s| s.start()), Some(16));
}

#[test]
fn empty_file_has_no_root() {
    let document = parse("").expect("empty input is valid");
    assert!(document.root().is_none());
}
