//! Reference and timeline validation.
//!
//! A pass builds the template registry and the global intro timeline once,
//! then for each treatment lays out its template-intro and body segments
//! after the intro and checks:
//!
//! - names are unique per element type within the intro, and within each
//!   treatment's own stages, which may not reuse intro names;
//! - every static reference to a prompt, survey or submit button resolves to
//!   a declaration on the same stage or an earlier one;
//! - `connectionInfo` and `browserInfo` references name a known field.
//!
//! Every problem is a warning. Problems are gathered as [`Finding`]s and
//! placed in the source at the end of the pass; identical diagnostics raised
//! for several treatments are emitted once.

use std::collections::HashSet;

use indexmap::{IndexMap, map::Entry};
use log::{debug, warn};

use stagebook_core::{
    Span,
    error::{Diagnostic, ErrorCode},
    position::{Range, resolve_span},
    tree::Document,
};

use crate::{
    config::{PositionFallback, ValidationConfig},
    expand::Expander,
    finding::Finding,
    model::{Model, Treatment},
    references::{self, Collected, FieldRefOccurrence, InitOccurrence, RefKey},
    registry::TemplateRegistry,
    timeline,
};

/// Validate `document`, whose source text is `text`.
///
/// A document whose containers have the wrong shape yields no diagnostics;
/// the problem is logged instead.
pub fn validate(document: &Document, text: &str, config: &ValidationConfig) -> Vec<Diagnostic> {
    let model = match Model::build(document) {
        Ok(model) => model,
        Err(err) => {
            warn!(error:% = err; "Skipping reference validation of malformed document");
            return Vec::new();
        }
    };

    let findings = check(&model, config);
    place(findings, document, text, config.position_fallback())
}

/// Run every check over `model` and return the findings in emission order.
pub fn check(model: &Model, config: &ValidationConfig) -> Vec<Finding> {
    let registry = TemplateRegistry::build(model);
    let mut findings = registry.findings().to_vec();

    // Intro content is only checked as part of some treatment's timeline
    if model.treatments().is_empty() {
        debug!(templates = registry.len(); "No treatments, skipping timeline checks");
        return findings;
    }

    let mut expander = Expander::new(&registry, config.detect_template_cycles());

    let intro = timeline::collect_intro_stages(model, &mut expander);
    findings.append(&mut expander.take_findings());
    let intro_collected = references::collect(&intro);

    let intro_names = check_intro_duplicates(&intro_collected, &mut findings);
    check_fields(&intro_collected.field_refs, config, &mut findings);

    for treatment in model.treatments() {
        let mut template_intro = timeline::collect_template_intro_stages(treatment, &mut expander);
        let mut body = timeline::collect_body_stages(treatment, &mut expander);
        findings.append(&mut expander.take_findings());

        timeline::offset(&mut template_intro, intro.len());
        timeline::offset(&mut body, intro.len() + template_intro.len());

        debug!(
            treatment:% = treatment.label(),
            intro = intro.len(),
            template_intro = template_intro.len(),
            body = body.len();
            "Checking treatment timeline"
        );

        let template_intro = references::collect(&template_intro);
        let body = references::collect(&body);
        let segments = [&intro_collected, &template_intro, &body];

        check_treatment_scope(treatment, &intro_names, &segments[1..], &mut findings);
        let inits = merge_inits(&segments);
        check_references(&inits, &segments, &mut findings);
        check_fields(&template_intro.field_refs, config, &mut findings);
        check_fields(&body.field_refs, config, &mut findings);
    }

    debug!(
        treatments = model.treatments().len(),
        findings = findings.len();
        "Reference validation finished"
    );
    findings
}

/// Report repeated names within the global intro; return the names seen.
fn check_intro_duplicates(intro: &Collected, findings: &mut Vec<Finding>) -> HashSet<RefKey> {
    let mut seen = HashSet::new();

    for declaration in &intro.declarations {
        let key = declaration.key();
        if !seen.insert(key.clone()) {
            findings.push(Finding::new(
                ErrorCode::E300,
                format!(
                    r#"Duplicate name "{}" for element type "{}" within intro sequences. Names must be unique per element type."#,
                    key.name(),
                    key.element_type()
                ),
                declaration.path().clone(),
            ));
        }
    }

    seen
}

/// Report treatment names that reuse an intro name or repeat within the treatment.
fn check_treatment_scope(
    treatment: &Treatment,
    intro_names: &HashSet<RefKey>,
    segments: &[&Collected],
    findings: &mut Vec<Finding>,
) {
    let mut own = HashSet::new();

    for declaration in segments.iter().copied().flat_map(|segment| &segment.declarations) {
        let key = declaration.key();
        let (name, element_type) = (key.name(), key.element_type());

        if intro_names.contains(key) {
            findings.push(
                Finding::new(
                    ErrorCode::E302,
                    format!(
                        r#"Name "{name}" for element type "{element_type}" is already used in intro sequences; intro names of type "{element_type}" are reserved."#
                    ),
                    declaration.path().clone(),
                )
                .with_help("rename this element or the intro element it collides with"),
            );
        } else if !own.insert(key.clone()) {
            findings.push(Finding::new(
                ErrorCode::E301,
                format!(
                    r#"Duplicate name "{name}" for element type "{element_type}" within treatment "{}"."#,
                    treatment.label()
                ),
                declaration.path().clone(),
            ));
        }
    }
}

/// Merge declarations of the timeline segments, earliest stage winning.
fn merge_inits<'c>(segments: &[&'c Collected]) -> IndexMap<&'c RefKey, &'c InitOccurrence> {
    let mut merged: IndexMap<&RefKey, &InitOccurrence> = IndexMap::new();

    for (key, init) in segments.iter().copied().flat_map(|segment| &segment.inits) {
        match merged.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(init);
            }
            Entry::Occupied(mut entry) => {
                if init.stage_index() < entry.get().stage_index() {
                    entry.insert(init);
                }
            }
        }
    }

    merged
}

/// Resolve every static reference of the segments against `inits`.
fn check_references(
    inits: &IndexMap<&RefKey, &InitOccurrence>,
    segments: &[&Collected],
    findings: &mut Vec<Finding>,
) {
    for reference in segments.iter().copied().flat_map(|segment| &segment.refs) {
        if reference.is_dynamic() {
            continue;
        }

        let key = reference.key();
        let (raw, name, element_type) = (reference.raw(), key.name(), key.element_type());

        match inits.get(key) {
            None => findings.push(
                Finding::new(
                    ErrorCode::E200,
                    format!(
                        r#"Reference "{raw}" must be initialized by a {element_type} with name "{name}" earlier in the intro/template-intro/game/exit timeline."#
                    ),
                    reference.path().clone(),
                )
                .with_help(format!(
                    r#"add a {element_type} element named "{name}" to this stage or an earlier one"#
                )),
            ),
            Some(init) if reference.stage_index() < init.stage_index() => findings.push(Finding::new(
                ErrorCode::E201,
                format!(
                    r#"Reference "{raw}" appears before its {element_type} "{name}" is initialized (init stage {}, found at stage {})."#,
                    init.stage_index(),
                    reference.stage_index()
                ),
                reference.path().clone(),
            )),
            Some(_) => {}
        }
    }
}

/// Check fixed-vocabulary references against the configured field lists.
fn check_fields(
    field_refs: &[FieldRefOccurrence],
    config: &ValidationConfig,
    findings: &mut Vec<Finding>,
) {
    for reference in field_refs {
        if reference.is_dynamic() || config.is_known_field(reference.field_type(), reference.field()) {
            continue;
        }

        let field_type = reference.field_type();
        findings.push(
            Finding::new(
                ErrorCode::E202,
                format!(
                    r#"Reference "{}" does not match any defined {field_type} element name."#,
                    reference.raw()
                ),
                reference.path().clone(),
            )
            .with_help(format!(
                "known {field_type} fields: {}",
                config.fields(field_type).join(", ")
            )),
        );
    }
}

/// Place findings in the source and drop repeats.
fn place(
    findings: Vec<Finding>,
    document: &Document,
    text: &str,
    fallback: PositionFallback,
) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut diagnostics = Vec::with_capacity(findings.len());

    for finding in findings {
        let span = match (resolve_span(finding.path(), document), fallback) {
            (Some(span), _) => span,
            (None, PositionFallback::DocumentStart) => {
                debug!(path:% = finding.path(); "Anchoring diagnostic at document start");
                Span::default()
            }
            (None, PositionFallback::Drop) => {
                debug!(path:% = finding.path(); "Dropping diagnostic without a position");
                continue;
            }
        };

        if !seen.insert((span, finding.message().to_string())) {
            continue;
        }

        let range = Range::from_span(span, text);
        diagnostics.push(finding.into_diagnostic(span, range));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use stagebook_core::tree::Node;

    use super::*;

    fn run(text: &str) -> Vec<Diagnostic> {
        let document = stagebook_parser::parse(text).expect("test document should load");
        validate(&document, text, &ValidationConfig::default())
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(Diagnostic::message).collect()
    }

    fn slice(text: &str, diagnostic: &Diagnostic) -> String {
        let span = diagnostic.primary_span().expect("diagnostics carry a span");
        text.chars().skip(span.start()).take(span.len()).collect()
    }

    /// A document with one treatment whose game stages are `stages`.
    fn treatment_with_stages(stages: &str) -> String {
        format!(r#"{{ "treatments": [ {{ "name": "t1", "gameStages": [ {stages} ] }} ] }}"#)
    }

    #[test]
    fn test_no_treatments_no_templates() {
        let text = r#"{
            "introSequences": [ { "introSteps": [
                { "elements": [ { "type": "display", "reference": "survey.missing.value" } ] }
            ] } ]
        }"#;
        assert!(run(text).is_empty());
        assert!(run("").is_empty());
        assert!(run("{}").is_empty());
    }

    #[test]
    fn test_intro_only_document_is_not_checked() {
        let text = r#"{
            "introSequences": [ { "introSteps": [
                { "elements": [
                    { "type": "prompt", "name": "P" },
                    { "type": "display", "reference": "connectionInfo.fake" }
                ] },
                { "elements": [ { "type": "prompt", "name": "P" }, { "template": "missing" } ] }
            ] } ]
        }"#;
        assert!(run(text).is_empty());
    }

    #[test]
    fn test_template_findings_without_treatments() {
        let text = r#"{
            "templates": [
                { "templateName": "T", "templateContent": { "elements": [] } },
                { "templateName": "T", "templateContent": { "elements": [] } }
            ]
        }"#;
        let diagnostics = run(text);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E402));
    }

    #[test]
    fn test_reference_after_declaration_is_valid() {
        let text = treatment_with_stages(
            r#"{ "elements": [ { "type": "survey", "name": "S1" } ] },
               { "elements": [ { "type": "display", "reference": "survey.S1.done" } ] }"#,
        );
        assert!(run(&text).is_empty());
    }

    #[test]
    fn test_same_stage_reference_is_valid() {
        let text = treatment_with_stages(
            r#"{ "elements": [
                   { "type": "display", "reference": "survey.S1.done" },
                   { "type": "survey", "name": "S1" }
               ] }"#,
        );
        assert!(run(&text).is_empty());
    }

    #[test]
    fn test_reference_before_declaration() {
        let text = treatment_with_stages(
            r#"{ "elements": [ { "type": "display", "reference": "survey.S1.done" } ] },
               { "elements": [] },
               { "elements": [ { "type": "survey", "name": "S1" } ] }"#,
        );
        let diagnostics = run(&text);

        assert_eq!(
            messages(&diagnostics),
            vec![r#"Reference "survey.S1.done" appears before its survey "S1" is initialized (init stage 2, found at stage 0)."#]
        );
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E201));
        assert!(diagnostics[0].severity().is_warning());
        assert_eq!(slice(&text, &diagnostics[0]), r#""survey.S1.done""#);
    }

    #[test]
    fn test_unresolved_reference() {
        let text = treatment_with_stages(
            r#"{ "elements": [ { "type": "display", "conditions": [ { "reference": "prompt.P.value" } ] } ] }"#,
        );
        let diagnostics = run(&text);

        assert_eq!(
            messages(&diagnostics),
            vec![r#"Reference "prompt.P.value" must be initialized by a prompt with name "P" earlier in the intro/template-intro/game/exit timeline."#]
        );
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E200));
    }

    #[test]
    fn test_dynamic_reference_is_exempt() {
        let text = treatment_with_stages(
            r#"{ "elements": [ { "type": "display", "reference": "survey.${dynamicName}.value" } ] }"#,
        );
        assert!(run(&text).is_empty());
    }

    #[test]
    fn test_intro_duplicate_reported_once_at_second() {
        let text = r#"{
  "introSequences": [ { "introSteps": [
    { "elements": [ { "type": "prompt", "name": "P" } ] },
    { "elements": [ { "type": "prompt", "name": "P" } ] }
  ] } ],
  "treatments": [ { "name": "t1", "gameStages": [] }, { "name": "t2", "gameStages": [] } ]
}"#;
        let diagnostics = run(text);

        assert_eq!(
            messages(&diagnostics),
            vec![r#"Duplicate name "P" for element type "prompt" within intro sequences. Names must be unique per element type."#]
        );
        let range = diagnostics[0].range().expect("range");
        assert_eq!(range.start.line, 3);
    }

    #[test]
    fn test_reserved_intro_name_is_not_also_a_duplicate() {
        let text = r#"{
  "introSequences": [ { "introSteps": [
    { "elements": [ { "type": "prompt", "name": "P" } ] }
  ] } ],
  "treatments": [ { "name": "t1", "gameStages": [
    { "elements": [ { "type": "prompt", "name": "P" } ] },
    { "elements": [ { "type": "prompt", "name": "P" } ] }
  ] } ]
}"#;
        let diagnostics = run(text);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.code() == Some(ErrorCode::E302)));
        assert_eq!(
            diagnostics[0].message(),
            r#"Name "P" for element type "prompt" is already used in intro sequences; intro names of type "prompt" are reserved."#
        );
    }

    #[test]
    fn test_treatment_duplicate() {
        let text = treatment_with_stages(
            r#"{ "elements": [ { "type": "submitButton", "name": "go" } ] },
               { "elements": [ { "type": "submitButton", "name": "go" }, { "type": "survey", "name": "go" } ] }"#,
        );
        let diagnostics = run(&text);

        assert_eq!(
            messages(&diagnostics),
            vec![r#"Duplicate name "go" for element type "submitButton" within treatment "t1"."#]
        );
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E301));
    }

    #[test]
    fn test_intro_declarations_resolve_treatment_references() {
        let text = r#"{
  "introSequences": [ { "introSteps": [
    { "elements": [ { "type": "survey", "name": "demographics" } ] }
  ] } ],
  "treatments": [ { "name": "t1", "gameStages": [
    { "elements": [ { "type": "display", "reference": "survey.demographics.result.age" } ] }
  ] } ]
}"#;
        assert!(run(text).is_empty());
    }

    #[test]
    fn test_inherited_stages_resolve_under_template() {
        let text = r#"{
  "templates": [
    { "templateName": "T", "templateContent": { "gameStages": [
      { "elements": [ { "type": "display", "reference": "survey.nowhere.value" } ] }
    ] } }
  ],
  "treatments": [ { "name": "t1", "template": "T" } ]
}"#;
        let document = stagebook_parser::parse(text).unwrap();
        let model = Model::build(&document).unwrap();
        let findings = check(&model, &ValidationConfig::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].path().to_string(),
            "templates[0].templateContent.gameStages[0].elements[0].reference"
        );

        let diagnostics = run(text);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range().map(|r| r.start.line), Some(3));
    }

    #[test]
    fn test_shared_template_diagnostic_reported_once() {
        let text = r#"{
  "templates": [
    { "templateName": "T", "templateContent": { "gameStages": [
      { "elements": [ { "type": "display", "reference": "survey.nowhere.value" } ] }
    ] } }
  ],
  "treatments": [ { "name": "a", "template": "T" }, { "name": "b", "template": "T" } ]
}"#;
        assert_eq!(run(text).len(), 1);
    }

    #[test]
    fn test_template_intro_precedes_body() {
        let text = r#"{
  "templates": [
    { "templateName": "T", "templateContent": {
      "introSequences": [ { "introSteps": [
        { "elements": [ { "type": "display", "reference": "prompt.late.value" } ] }
      ] } ],
      "gameStages": [ { "elements": [ { "type": "prompt", "name": "late" } ] } ]
    } }
  ],
  "treatments": [ { "name": "t1", "template": "T" } ]
}"#;
        assert_eq!(
            messages(&run(text)),
            vec![r#"Reference "prompt.late.value" appears before its prompt "late" is initialized (init stage 1, found at stage 0)."#]
        );
    }

    #[test]
    fn test_unknown_info_fields() {
        let text = treatment_with_stages(
            r#"{ "elements": [
                   { "type": "display", "reference": "connectionInfo.fake" },
                   { "type": "display", "reference": "connectionInfo.country" },
                   { "type": "display", "reference": "browserInfo.screenWidth" },
                   { "type": "display", "reference": "browserInfo.country" }
               ] }"#,
        );
        let diagnostics = run(&text);

        assert_eq!(
            messages(&diagnostics),
            vec![
                r#"Reference "connectionInfo.fake" does not match any defined connectionInfo element name."#,
                r#"Reference "browserInfo.country" does not match any defined browserInfo element name."#,
            ]
        );
        assert!(diagnostics.iter().all(|d| d.code() == Some(ErrorCode::E202)));
    }

    #[test]
    fn test_configured_fields_replace_defaults() {
        let text = treatment_with_stages(
            r#"{ "elements": [
                   { "type": "display", "reference": "connectionInfo.asn" },
                   { "type": "display", "reference": "connectionInfo.country" }
               ] }"#,
        );
        let document = stagebook_parser::parse(&text).expect("test document should load");
        let config: ValidationConfig =
            toml::from_str(r#"connection_info_fields = ["asn"]"#).expect("config parses");

        let diagnostics = validate(&document, &text, &config);

        assert_eq!(
            messages(&diagnostics),
            vec![r#"Reference "connectionInfo.country" does not match any defined connectionInfo element name."#]
        );
        assert_eq!(diagnostics[0].help(), Some("known connectionInfo fields: asn"));
    }

    #[test]
    fn test_unknown_template_and_cycle() {
        let text = r#"{
  "templates": [ { "templateName": "loop", "templateContent": { "template": "loop" } } ],
  "treatments": [
    { "name": "a", "template": "loop" },
    { "name": "b", "gameStages": [ { "template": "missing" } ] }
  ]
}"#;
        let diagnostics = run(text);

        assert_eq!(
            messages(&diagnostics),
            vec![
                "Template cycle detected: loop -> loop.",
                r#"Template "missing" is not defined."#,
            ]
        );
    }

    #[test]
    fn test_malformed_container_yields_nothing() {
        let text = treatment_with_stages(r#"{ "elements": "not a list" }"#);
        assert!(run(&text).is_empty());
    }

    #[test]
    fn test_position_fallback_policy() {
        // Built without spans, so no finding can be placed
        let document = Document::new(Node::object([(
            "treatments",
            Node::array([Node::object([(
                "gameStages",
                Node::array([Node::object([("template", Node::string("missing"))])]),
            )])]),
        )]));

        let anchored = validate(&document, "", &ValidationConfig::default());
        assert_eq!(anchored.len(), 1);
        assert_eq!(anchored[0].primary_span(), Some(Span::default()));

        let config = ValidationConfig::default().with_position_fallback(PositionFallback::Drop);
        assert!(validate(&document, "", &config).is_empty());
    }

    // ===================
    // Property Test Functions
    // ===================

    /// One stage declaring `S1` at `init` and one referencing it at `used`.
    fn ordering_document(stage_count: usize, init: usize, used: usize) -> String {
        let stages: Vec<String> = (0..stage_count)
            .map(|i| {
                let mut elements = Vec::new();
                if i == init {
                    elements.push(r#"{ "type": "survey", "name": "S1" }"#);
                }
                if i == used {
                    elements.push(r#"{ "type": "display", "reference": "survey.S1.done" }"#);
                }
                format!(r#"{{ "elements": [ {} ] }}"#, elements.join(", "))
            })
            .collect();
        treatment_with_stages(&stages.join(",\n"))
    }

    /// An ordering diagnostic appears exactly when the reference comes first.
    fn check_ordering(stage_count: usize, init: usize, used: usize) -> Result<(), TestCaseError> {
        let text = ordering_document(stage_count, init, used);
        let diagnostics = run(&text);

        if used >= init {
            prop_assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
        } else {
            let expected = format!(
                r#"Reference "survey.S1.done" appears before its survey "S1" is initialized (init stage {init}, found at stage {used})."#
            );
            prop_assert_eq!(messages(&diagnostics), vec![expected.as_str()]);
        }
        Ok(())
    }

    /// Two passes over the same document agree exactly.
    fn check_idempotent(stage_count: usize, init: usize, used: usize) -> Result<(), TestCaseError> {
        let text = ordering_document(stage_count, init, used);
        prop_assert_eq!(run(&text), run(&text));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    fn layout() -> impl Strategy<Value = (usize, usize, usize)> {
        (1usize..6).prop_flat_map(|count| (Just(count), 0..count, 0..count))
    }

    proptest! {
        #[test]
        fn ordering_follows_stage_indices((count, init, used) in layout()) {
            check_ordering(count, init, used)?;
        }

        #[test]
        fn validation_is_idempotent((count, init, used) in layout()) {
            check_idempotent(count, init, used)?;
        }
    }
}
