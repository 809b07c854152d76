//! Reference strings and the declarations they point at.
//!
//! A reference has the form `<type>.<name>[.<subpath>...]`. Only prompts,
//! surveys and submit buttons are declared by stage elements and take part in
//! ordering checks; `connectionInfo` and `browserInfo` references name a field
//! from a fixed vocabulary. The remaining types are accepted but not checked.

use std::fmt;

use indexmap::IndexMap;

use stagebook_core::path::Path;

use crate::timeline::StageDescriptor;

/// Marker for an interpolated, and therefore dynamic, name.
const INTERPOLATION: &str = "${";

/// Every type prefix a reference may start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Survey,
    SubmitButton,
    Qualtrics,
    Discussion,
    ParticipantInfo,
    Prompt,
    UrlParams,
    ConnectionInfo,
    BrowserInfo,
}

impl ReferenceType {
    /// Parse a type prefix. Matching is case-sensitive.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "survey" => Self::Survey,
            "submitButton" => Self::SubmitButton,
            "qualtrics" => Self::Qualtrics,
            "discussion" => Self::Discussion,
            "participantInfo" => Self::ParticipantInfo,
            "prompt" => Self::Prompt,
            "urlParams" => Self::UrlParams,
            "connectionInfo" => Self::ConnectionInfo,
            "browserInfo" => Self::BrowserInfo,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::SubmitButton => "submitButton",
            Self::Qualtrics => "qualtrics",
            Self::Discussion => "discussion",
            Self::ParticipantInfo => "participantInfo",
            Self::Prompt => "prompt",
            Self::UrlParams => "urlParams",
            Self::ConnectionInfo => "connectionInfo",
            Self::BrowserInfo => "browserInfo",
        }
    }

    /// The declared element type this reference resolves against, if any.
    pub fn checked(&self) -> Option<CheckedType> {
        match self {
            Self::Prompt => Some(CheckedType::Prompt),
            Self::Survey => Some(CheckedType::Survey),
            Self::SubmitButton => Some(CheckedType::SubmitButton),
            _ => None,
        }
    }

    /// The fixed-vocabulary type this reference is checked against, if any.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::ConnectionInfo => Some(FieldType::ConnectionInfo),
            Self::BrowserInfo => Some(FieldType::BrowserInfo),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element types that declare names and take part in ordering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckedType {
    Prompt,
    Survey,
    SubmitButton,
}

impl CheckedType {
    /// Parse an element's `type`.
    pub fn from_element_type(element_type: &str) -> Option<Self> {
        ReferenceType::from_prefix(element_type).and_then(|ty| ty.checked())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Survey => "survey",
            Self::SubmitButton => "submitButton",
        }
    }
}

impl fmt::Display for CheckedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference types whose names come from a fixed field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    ConnectionInfo,
    BrowserInfo,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionInfo => f.write_str("connectionInfo"),
            Self::BrowserInfo => f.write_str("browserInfo"),
        }
    }
}

/// A reference string split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference<'s> {
    reference_type: ReferenceType,
    name: &'s str,
    subpath: Vec<&'s str>,
    dynamic: bool,
}

impl<'s> ParsedReference<'s> {
    pub fn reference_type(&self) -> ReferenceType {
        self.reference_type
    }

    pub fn name(&self) -> &'s str {
        self.name
    }

    /// Segments after the name.
    pub fn subpath(&self) -> &[&'s str] {
        &self.subpath
    }

    /// `true` when the name is interpolated.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Parse `<type>.<name>[.<subpath>...]`.
///
/// Returns `None` for an unknown type prefix or an empty name.
///
/// # Examples
///
/// ```
/// use stagebook::references::{ReferenceType, parse_reference};
///
/// let reference = parse_reference("survey.S1.result.age").unwrap();
/// assert_eq!(reference.reference_type(), ReferenceType::Survey);
/// assert_eq!(reference.name(), "S1");
/// assert_eq!(reference.subpath(), ["result", "age"]);
/// assert!(!reference.is_dynamic());
///
/// assert!(parse_reference("survey.${name}.value").unwrap().is_dynamic());
/// assert!(parse_reference("unknown.thing").is_none());
/// ```
pub fn parse_reference(raw: &str) -> Option<ParsedReference<'_>> {
    let mut segments = raw.split('.');
    let reference_type = ReferenceType::from_prefix(segments.next()?)?;
    let name = segments.next().filter(|name| !name.is_empty())?;

    Some(ParsedReference {
        reference_type,
        name,
        dynamic: name.contains(INTERPOLATION),
        subpath: segments.collect(),
    })
}

/// A declared `(type, name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey {
    element_type: CheckedType,
    name: String,
}

impl RefKey {
    pub fn new(element_type: CheckedType, name: impl Into<String>) -> Self {
        Self {
            element_type,
            name: name.into(),
        }
    }

    pub fn element_type(&self) -> CheckedType {
        self.element_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.element_type, self.name)
    }
}

/// A named element of a checked type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOccurrence {
    key: RefKey,
    stage_index: usize,
    path: Path,
}

impl InitOccurrence {
    pub fn key(&self) -> &RefKey {
        &self.key
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    /// Path of the element's `name`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A reference to a checked type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefOccurrence {
    key: RefKey,
    stage_index: usize,
    path: Path,
    raw: String,
    dynamic: bool,
}

impl RefOccurrence {
    pub fn key(&self) -> &RefKey {
        &self.key
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    /// Path of the `reference` string.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The reference as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// A reference to a fixed-vocabulary field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRefOccurrence {
    field_type: FieldType,
    field: String,
    path: Path,
    raw: String,
    dynamic: bool,
}

impl FieldRefOccurrence {
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Declarations and references found in a list of stages.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// First declaration of each key.
    pub inits: IndexMap<RefKey, InitOccurrence>,
    /// Every declaration, repeats included, in timeline order.
    pub declarations: Vec<InitOccurrence>,
    pub refs: Vec<RefOccurrence>,
    pub field_refs: Vec<FieldRefOccurrence>,
}

/// Collect declarations and references from `stages`.
pub fn collect(stages: &[StageDescriptor<'_>]) -> Collected {
    let mut collected = Collected::default();

    for stage in stages {
        let stage_index = stage.stage_index();

        for element in stage.elements() {
            let declared = element
                .element_type()
                .and_then(CheckedType::from_element_type)
                .zip(element.name().filter(|name| !name.trim().is_empty()));

            if let Some((element_type, name)) = declared {
                let init = InitOccurrence {
                    key: RefKey::new(element_type, name),
                    stage_index,
                    path: element.path().key("name"),
                };
                collected
                    .inits
                    .entry(init.key.clone())
                    .or_insert_with(|| init.clone());
                collected.declarations.push(init);
            }

            if let Some(raw) = element.reference() {
                collected.record(raw, stage_index, element.path().key("reference"));
            }
            for condition in element.conditions() {
                if let Some(raw) = condition.reference() {
                    collected.record(raw, stage_index, condition.path().key("reference"));
                }
            }
        }
    }

    collected
}

impl Collected {
    fn record(&mut self, raw: &str, stage_index: usize, path: Path) {
        let Some(parsed) = parse_reference(raw) else {
            return;
        };
        let reference_type = parsed.reference_type();

        if let Some(element_type) = reference_type.checked() {
            self.refs.push(RefOccurrence {
                key: RefKey::new(element_type, parsed.name()),
                stage_index,
                path,
                raw: raw.to_string(),
                dynamic: parsed.is_dynamic(),
            });
        } else if let Some(field_type) = reference_type.field_type() {
            self.field_refs.push(FieldRefOccurrence {
                field_type,
                field: parsed.name().to_string(),
                path,
                raw: raw.to_string(),
                dynamic: parsed.is_dynamic(),
            });
        }
    }
}
