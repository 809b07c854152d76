//! Typed view over a treatment document.
//!
//! [`Model::build`] walks the generic [`Document`] tree once and decides the
//! shape of every node up front: a stage slot is either an inline [`Stage`] or
//! a [`TemplateRef`], template content is one of the [`TemplateContent`]
//! variants, and so on. Consumers match on those variants instead of probing
//! for keys.
//!
//! Every typed node keeps the [`Path`] of the tree node it was built from.
//! Content reached through a template is therefore addressed by its origin
//! path under `templates[idx].templateContent` without being copied.
//!
//! Scalars are read leniently: a `name` that is not a string is treated as
//! absent. Containers are not: an `elements` member that is not an array (or
//! an element that is not an object) is a [`ModelError`].

use thiserror::Error;

use stagebook_core::{
    path::Path,
    tree::{Document, Node, Value},
};

/// A container node of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("expected {expected} at `{path}`, found {found}")]
    Shape {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },
}

type Result<T> = std::result::Result<T, ModelError>;

/// The typed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    templates: Vec<Template>,
    intro_sequences: Vec<IntroSequence>,
    treatments: Vec<Treatment>,
}

impl Model {
    /// Build the typed model for `document`.
    ///
    /// A document without a root yields an empty model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Shape`] when the root, or any container the
    /// validator walks, has the wrong kind.
    pub fn build(document: &Document) -> Result<Self> {
        let Some(root) = document.root() else {
            return Ok(Self::default());
        };
        let path = Path::root();
        expect_object(root, &path)?;

        let templates = member_array(root, &path, "templates")?
            .map(|(path, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, node)| Template::build(node, path.index(index), index))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let intro_sequences = intro_sequences(root, &path)?.unwrap_or_default();

        let treatments = member_array(root, &path, "treatments")?
            .map(|(path, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, node)| Treatment::build(node, path.index(index), index))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            templates,
            intro_sequences,
            treatments,
        })
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// The global intro sequences.
    pub fn intro_sequences(&self) -> &[IntroSequence] {
        &self.intro_sequences
    }

    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }
}

/// A `{ template: name }` pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    name: String,
    path: Path,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>, path: Path) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// The name of the template pointed at.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the object holding the `template` key.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `template` key itself.
    pub fn template_path(&self) -> Path {
        self.path.key("template")
    }

    /// Read a pointer from an object whose `template` member is a string.
    fn from_node(node: &Node, path: &Path) -> Option<Self> {
        string_member(node, "template").map(|name| Self::new(name, path.clone()))
    }
}

/// An entry of the root `templates` array.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    index: usize,
    name: Option<String>,
    path: Path,
    content: Option<TemplateContent>,
}

impl Template {
    fn build(node: &Node, path: Path, index: usize) -> Result<Self> {
        expect_object(node, &path)?;

        let content = match node.get("templateContent") {
            None => None,
            Some(content) if is_null(content) => None,
            Some(content) => Some(TemplateContent::build(content, path.key("templateContent"))?),
        };

        Ok(Self {
            index,
            name: string_member(node, "templateName"),
            path,
            content,
        })
    }

    /// Position of this template in the `templates` array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `templateName` key.
    pub fn name_path(&self) -> Path {
        self.path.key("templateName")
    }

    pub fn content(&self) -> Option<&TemplateContent> {
        self.content.as_ref()
    }
}

/// What a template's `templateContent` holds.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateContent {
    /// The content is itself a pointer to another template.
    Pointer(TemplateRef),
    /// Only `introSequences`.
    Intro(IntroContent),
    /// `gameStages` and/or `exitSequence`, optionally with `introSequences`.
    Treatment(TreatmentContent),
    /// A single stage.
    Stage(Stage),
    /// A single element.
    Element(Element),
    /// A bare array of any of the above.
    List(Vec<TemplateContent>),
}

impl TemplateContent {
    fn build(node: &Node, path: Path) -> Result<Self> {
        if let Some(items) = node.as_array() {
            return items
                .iter()
                .enumerate()
                .map(|(index, item)| Self::build(item, path.index(index)))
                .collect::<Result<Vec<_>>>()
                .map(Self::List);
        }

        expect_object_or(node, &path, "an object or array")?;

        if let Some(pointer) = TemplateRef::from_node(node, &path) {
            return Ok(Self::Pointer(pointer));
        }
        if node.get("type").is_some() {
            return Element::build(node, path).map(Self::Element);
        }
        if node.get("gameStages").is_some() || node.get("exitSequence").is_some() {
            return TreatmentContent::build(node, &path).map(Self::Treatment);
        }
        if node.get("introSequences").is_some() {
            return intro_sequences(node, &path)
                .map(|sequences| Self::Intro(IntroContent::new(sequences.unwrap_or_default())));
        }
        Stage::build(node, path).map(Self::Stage)
    }
}

/// Template content carrying intro sequences only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntroContent {
    sequences: Vec<IntroSequence>,
}

impl IntroContent {
    pub fn new(sequences: Vec<IntroSequence>) -> Self {
        Self { sequences }
    }

    pub fn sequences(&self) -> &[IntroSequence] {
        &self.sequences
    }
}

/// Template content shaped like a treatment body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreatmentContent {
    game_stages: Option<Vec<StageSlot>>,
    exit_sequence: Option<Vec<StageSlot>>,
    intro_sequences: Option<Vec<IntroSequence>>,
}

impl TreatmentContent {
    fn build(node: &Node, path: &Path) -> Result<Self> {
        Ok(Self {
            game_stages: stage_slots(node, path, "gameStages")?,
            exit_sequence: stage_slots(node, path, "exitSequence")?,
            intro_sequences: intro_sequences(node, path)?,
        })
    }

    pub fn game_stages(&self) -> Option<&[StageSlot]> {
        self.game_stages.as_deref()
    }

    pub fn exit_sequence(&self) -> Option<&[StageSlot]> {
        self.exit_sequence.as_deref()
    }

    pub fn intro_sequences(&self) -> Option<&[IntroSequence]> {
        self.intro_sequences.as_deref()
    }
}

/// One entry of an `introSequences` array.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroSequence {
    name: Option<String>,
    path: Path,
    steps: Vec<StageSlot>,
}

impl IntroSequence {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;
        Ok(Self {
            name: string_member(node, "name"),
            steps: stage_slots(node, &path, "introSteps")?.unwrap_or_default(),
            path,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn steps(&self) -> &[StageSlot] {
        &self.steps
    }
}

/// A game stage, exit step or intro step.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    name: Option<String>,
    path: Path,
    elements: Vec<ElementSlot>,
}

impl Stage {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;

        let elements = member_array(node, &path, "elements")?
            .map(|(elements_path, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| ElementSlot::build(item, elements_path.index(index)))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            name: string_member(node, "name"),
            path,
            elements,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elements(&self) -> &[ElementSlot] {
        &self.elements
    }
}

/// An entry of a stage array.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSlot {
    Stage(Stage),
    Template(TemplateRef),
}

impl StageSlot {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;
        match TemplateRef::from_node(node, &path) {
            Some(pointer) => Ok(Self::Template(pointer)),
            None => Stage::build(node, path).map(Self::Stage),
        }
    }
}

/// A stage element such as a survey, prompt or submit button.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    path: Path,
    element_type: Option<String>,
    name: Option<String>,
    reference: Option<String>,
    conditions: Vec<Condition>,
}

impl Element {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;

        let conditions = member_array(node, &path, "conditions")?
            .map(|(conditions_path, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| Condition::build(item, conditions_path.index(index)))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            element_type: string_member(node, "type"),
            name: string_member(node, "name"),
            reference: string_member(node, "reference"),
            conditions,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `type` member.
    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// One entry of an element's `conditions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    path: Path,
    reference: Option<String>,
}

impl Condition {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;
        Ok(Self {
            reference: string_member(node, "reference"),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

/// An entry of an `elements` array.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSlot {
    Element(Element),
    Template(TemplateRef),
}

impl ElementSlot {
    fn build(node: &Node, path: Path) -> Result<Self> {
        expect_object(node, &path)?;
        match TemplateRef::from_node(node, &path) {
            Some(pointer) => Ok(Self::Template(pointer)),
            None => Element::build(node, path).map(Self::Element),
        }
    }
}

/// An entry of the root `treatments` array.
#[derive(Debug, Clone, PartialEq)]
pub struct Treatment {
    index: usize,
    name: Option<String>,
    path: Path,
    template: Option<TemplateRef>,
    game_stages: Option<Vec<StageSlot>>,
    exit_sequence: Option<Vec<StageSlot>>,
}

impl Treatment {
    fn build(node: &Node, path: Path, index: usize) -> Result<Self> {
        expect_object(node, &path)?;
        Ok(Self {
            index,
            name: string_member(node, "name"),
            template: TemplateRef::from_node(node, &path),
            game_stages: stage_slots(node, &path, "gameStages")?,
            exit_sequence: stage_slots(node, &path, "exitSequence")?,
            path,
        })
    }

    /// Position of this treatment in the `treatments` array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used for this treatment in messages: its `name`, or its path.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.path.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The template this treatment delegates to, if any.
    pub fn template(&self) -> Option<&TemplateRef> {
        self.template.as_ref()
    }

    pub fn game_stages(&self) -> Option<&[StageSlot]> {
        self.game_stages.as_deref()
    }

    pub fn exit_sequence(&self) -> Option<&[StageSlot]> {
        self.exit_sequence.as_deref()
    }

    /// `true` when the treatment declares its own body, which then takes
    /// precedence over its template.
    pub fn has_own_body(&self) -> bool {
        self.game_stages.is_some() || self.exit_sequence.is_some()
    }
}

fn is_null(node: &Node) -> bool {
    matches!(node.value(), Value::Null)
}

fn string_member(node: &Node, key: &str) -> Option<String> {
    node.get(key).and_then(Node::as_str).map(str::to_string)
}

fn expect_object(node: &Node, path: &Path) -> Result<()> {
    expect_object_or(node, path, "an object")
}

fn expect_object_or(node: &Node, path: &Path, expected: &'static str) -> Result<()> {
    match node.value() {
        Value::Object(_) => Ok(()),
        _ => Err(ModelError::Shape {
            path: path.clone(),
            expected,
            found: node.kind_name(),
        }),
    }
}

/// Look up an array member. Absent and `null` members both yield `None`.
fn member_array<'n>(node: &'n Node, path: &Path, key: &str) -> Result<Option<(Path, &'n [Node])>> {
    let path = path.key(key);
    match node.get(key) {
        None => Ok(None),
        Some(member) if is_null(member) => Ok(None),
        Some(member) => match member.as_array() {
            Some(items) => Ok(Some((path, items))),
            None => Err(ModelError::Shape {
                path,
                expected: "an array",
                found: member.kind_name(),
            }),
        },
    }
}

fn stage_slots(node: &Node, path: &Path, key: &str) -> Result<Option<Vec<StageSlot>>> {
    member_array(node, path, key)?
        .map(|(slots_path, items)| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| StageSlot::build(item, slots_path.index(index)))
                .collect()
        })
        .transpose()
}

fn intro_sequences(node: &Node, path: &Path) -> Result<Option<Vec<IntroSequence>>> {
    member_array(node, path, "introSequences")?
        .map(|(sequences_path, items)| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| IntroSequence::build(item, sequences_path.index(index)))
                .collect()
        })
        .transpose()
}
