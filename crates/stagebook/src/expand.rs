//! Template expansion.
//!
//! The [`Expander`] resolves `{ template: name }` pointers against the
//! [`TemplateRegistry`] and splices the content they stand for into stage and
//! element lists. Expansion borrows the template's typed content, so every
//! stage or element it yields still carries its origin path under
//! `templates[idx].templateContent`.
//!
//! Each expansion lineage tracks the template names it is inside of. Entering
//! a template that is already on the lineage stops that branch and reports a
//! cycle.

use std::iter;

use log::{debug, trace};

use stagebook_core::error::ErrorCode;

use crate::{
    finding::Finding,
    model::{Element, ElementSlot, Stage, StageSlot, TemplateContent, TemplateRef},
    registry::TemplateRegistry,
    timeline::StageKind,
};

/// Template names currently being expanded, outermost first.
type Lineage<'m> = Vec<&'m str>;

/// Resolves template pointers and flattens stage and element lists.
pub struct Expander<'r, 'm> {
    registry: &'r TemplateRegistry<'m>,
    report_cycles: bool,
    findings: Vec<Finding>,
}

impl<'r, 'm> Expander<'r, 'm> {
    /// Create an expander over `registry`.
    ///
    /// Cycles always stop expansion; `report_cycles` controls whether they
    /// are also reported.
    pub fn new(registry: &'r TemplateRegistry<'m>, report_cycles: bool) -> Self {
        Self {
            registry,
            report_cycles,
            findings: Vec::new(),
        }
    }

    /// Drain the problems found so far.
    pub fn take_findings(&mut self) -> Vec<Finding> {
        std::mem::take(&mut self.findings)
    }

    /// Resolve one level of indirection.
    ///
    /// Returns the content of the named template, which may itself be a
    /// pointer. An unknown name is reported at the pointer's `template` key.
    pub fn expand(&mut self, pointer: &'m TemplateRef) -> Option<&'m TemplateContent> {
        match self.registry.get(pointer.name()) {
            Some(template) => {
                trace!(template = pointer.name(), index = template.index(); "Expanding template");
                Some(template.content())
            }
            None => {
                self.findings.push(
                    Finding::new(
                        ErrorCode::E400,
                        format!(r#"Template "{}" is not defined."#, pointer.name()),
                        pointer.template_path(),
                    )
                    .with_help("define it under `templates` with a matching `templateName`"),
                );
                None
            }
        }
    }

    /// Follow a chain of pointers to the first content that is not a pointer.
    pub fn resolve(&mut self, pointer: &'m TemplateRef) -> Option<&'m TemplateContent> {
        let mut lineage = Lineage::new();
        let mut content = self.enter(pointer, &mut lineage)?;
        while let TemplateContent::Pointer(next) = content {
            content = self.enter(next, &mut lineage)?;
        }
        Some(content)
    }

    /// Flatten a stage list of the given kind into concrete stages.
    pub fn flatten_stages(&mut self, slots: &'m [StageSlot], kind: StageKind) -> Vec<&'m Stage> {
        let mut stages = Vec::new();
        self.flatten_stage_slots(slots, kind, &mut stages, &mut Lineage::new());
        stages
    }

    /// Flatten an element list into concrete elements.
    pub fn flatten_elements(&mut self, slots: &'m [ElementSlot]) -> Vec<&'m Element> {
        let mut elements = Vec::new();
        self.flatten_element_slots(slots, &mut elements, &mut Lineage::new());
        elements
    }

    /// Expand `pointer` within `lineage`, pushing its name on success.
    ///
    /// The caller pops the name once it is done with the returned content.
    fn enter(
        &mut self,
        pointer: &'m TemplateRef,
        lineage: &mut Lineage<'m>,
    ) -> Option<&'m TemplateContent> {
        let name = pointer.name();

        if let Some(start) = lineage.iter().position(|entered| *entered == name) {
            let cycle = lineage[start..]
                .iter()
                .copied()
                .chain(iter::once(name))
                .collect::<Vec<_>>()
                .join(" -> ");

            if self.report_cycles {
                self.findings.push(
                    Finding::new(
                        ErrorCode::E401,
                        format!("Template cycle detected: {cycle}."),
                        pointer.template_path(),
                    )
                    .with_help("a template cannot include itself, directly or through other templates"),
                );
            } else {
                debug!(cycle = cycle.as_str(); "Template cycle ignored");
            }
            return None;
        }

        let content = self.expand(pointer)?;
        lineage.push(name);
        Some(content)
    }

    fn flatten_stage_slots(
        &mut self,
        slots: &'m [StageSlot],
        kind: StageKind,
        out: &mut Vec<&'m Stage>,
        lineage: &mut Lineage<'m>,
    ) {
        for slot in slots {
            match slot {
                StageSlot::Stage(stage) => out.push(stage),
                StageSlot::Template(pointer) => self.splice_pointer_stages(pointer, kind, out, lineage),
            }
        }
    }

    fn splice_pointer_stages(
        &mut self,
        pointer: &'m TemplateRef,
        kind: StageKind,
        out: &mut Vec<&'m Stage>,
        lineage: &mut Lineage<'m>,
    ) {
        if let Some(content) = self.enter(pointer, lineage) {
            self.splice_stages(content, kind, out, lineage);
            lineage.pop();
        }
    }

    fn splice_stages(
        &mut self,
        content: &'m TemplateContent,
        kind: StageKind,
        out: &mut Vec<&'m Stage>,
        lineage: &mut Lineage<'m>,
    ) {
        match content {
            TemplateContent::Pointer(pointer) => self.splice_pointer_stages(pointer, kind, out, lineage),
            TemplateContent::Stage(stage) => out.push(stage),
            TemplateContent::List(items) => {
                for item in items {
                    self.splice_stages(item, kind, out, lineage);
                }
            }
            TemplateContent::Treatment(body) => {
                let slots = match kind {
                    StageKind::Game => body.game_stages(),
                    StageKind::Exit => body.exit_sequence(),
                    StageKind::Intro => {
                        for sequence in body.intro_sequences().unwrap_or_default() {
                            self.flatten_stage_slots(sequence.steps(), kind, out, lineage);
                        }
                        None
                    }
                };
                if let Some(slots) = slots {
                    self.flatten_stage_slots(slots, kind, out, lineage);
                }
            }
            TemplateContent::Intro(intro) if kind == StageKind::Intro => {
                for sequence in intro.sequences() {
                    self.flatten_stage_slots(sequence.steps(), kind, out, lineage);
                }
            }
            TemplateContent::Intro(_) | TemplateContent::Element(_) => {
                trace!(kind:% = kind; "Template content has no stages of this kind");
            }
        }
    }

    fn flatten_element_slots(
        &mut self,
        slots: &'m [ElementSlot],
        out: &mut Vec<&'m Element>,
        lineage: &mut Lineage<'m>,
    ) {
        for slot in slots {
            match slot {
                ElementSlot::Element(element) => out.push(element),
                ElementSlot::Template(pointer) => self.splice_pointer_elements(pointer, out, lineage),
            }
        }
    }

    fn splice_pointer_elements(
        &mut self,
        pointer: &'m TemplateRef,
        out: &mut Vec<&'m Element>,
        lineage: &mut Lineage<'m>,
    ) {
        if let Some(content) = self.enter(pointer, lineage) {
            self.splice_elements(content, out, lineage);
            lineage.pop();
        }
    }

    fn splice_elements(
        &mut self,
        content: &'m TemplateContent,
        out: &mut Vec<&'m Element>,
        lineage: &mut Lineage<'m>,
    ) {
        match content {
            TemplateContent::Pointer(pointer) => self.splice_pointer_elements(pointer, out, lineage),
            TemplateContent::Element(element) => out.push(element),
            TemplateContent::Stage(stage) => self.flatten_element_slots(stage.elements(), out, lineage),
            TemplateContent::List(items) => {
                for item in items {
                    self.splice_elements(item, out, lineage);
                }
            }
            TemplateContent::Intro(_) | TemplateContent::Treatment(_) => {
                trace!("Template content has no elements");
            }
        }
    }
}
