//! Ordered stage timelines.
//!
//! A treatment's timeline is three segments laid end to end: the global intro
//! sequences, the intro sequences of the treatment's template, then the
//! treatment body (game stages followed by exit steps). Each collector below
//! builds one segment indexed from zero; [`offset`] shifts a segment so that
//! it follows the ones before it.

use std::fmt;

use log::{debug, trace};

use stagebook_core::path::Path;

use crate::{
    expand::Expander,
    model::{Element, IntroSequence, Model, Stage, StageSlot, TemplateContent, Treatment},
};

/// The part of the experiment a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Intro,
    Game,
    Exit,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Intro => write!(f, "intro"),
            StageKind::Game => write!(f, "game"),
            StageKind::Exit => write!(f, "exit"),
        }
    }
}

/// One stage placed on a timeline.
#[derive(Debug, Clone)]
pub struct StageDescriptor<'m> {
    stage_index: usize,
    kind: StageKind,
    stage: &'m Stage,
    elements: Vec<&'m Element>,
}

impl<'m> StageDescriptor<'m> {
    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn stage(&self) -> &'m Stage {
        self.stage
    }

    /// Path of the stage; an origin path when it came from a template.
    pub fn path(&self) -> &'m Path {
        self.stage.path()
    }

    pub fn name(&self) -> Option<&'m str> {
        self.stage.name()
    }

    /// The stage's elements with template pointers expanded.
    pub fn elements(&self) -> &[&'m Element] {
        &self.elements
    }
}

/// Stages of the global `introSequences`, indexed from 0.
pub fn collect_intro_stages<'m>(
    model: &'m Model,
    expander: &mut Expander<'_, 'm>,
) -> Vec<StageDescriptor<'m>> {
    let stages = intro_steps(model.intro_sequences(), expander);
    let descriptors = describe(stages, StageKind::Intro, 0, expander);
    debug!(stages = descriptors.len(); "Collected global intro stages");
    descriptors
}

/// Intro stages contributed by the treatment's template, indexed from 0.
///
/// Empty unless the template (after following pointer chains) carries
/// `introSequences`.
pub fn collect_template_intro_stages<'m>(
    treatment: &'m Treatment,
    expander: &mut Expander<'_, 'm>,
) -> Vec<StageDescriptor<'m>> {
    let Some(pointer) = treatment.template() else {
        return Vec::new();
    };

    let sequences = match expander.resolve(pointer) {
        Some(TemplateContent::Intro(intro)) => intro.sequences(),
        Some(TemplateContent::Treatment(body)) => body.intro_sequences().unwrap_or_default(),
        _ => &[],
    };

    let stages = intro_steps(sequences, expander);
    describe(stages, StageKind::Intro, 0, expander)
}

/// Game stages then exit steps of a treatment, indexed from 0.
///
/// The treatment's own `gameStages`/`exitSequence` are used when either is
/// present; otherwise both come from its template.
pub fn collect_body_stages<'m>(
    treatment: &'m Treatment,
    expander: &mut Expander<'_, 'm>,
) -> Vec<StageDescriptor<'m>> {
    let (game, exit): (Option<&'m [StageSlot]>, Option<&'m [StageSlot]>) =
        if treatment.has_own_body() {
            (treatment.game_stages(), treatment.exit_sequence())
        } else if let Some(pointer) = treatment.template() {
            match expander.resolve(pointer) {
                Some(TemplateContent::Treatment(body)) => (body.game_stages(), body.exit_sequence()),
                _ => {
                    debug!(
                        treatment:% = treatment.label(),
                        template = pointer.name();
                        "Template provides no treatment body"
                    );
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

    let game = expander.flatten_stages(game.unwrap_or_default(), StageKind::Game);
    let exit = expander.flatten_stages(exit.unwrap_or_default(), StageKind::Exit);

    let mut descriptors = describe(game, StageKind::Game, 0, expander);
    let exit_start = descriptors.len();
    descriptors.extend(describe(exit, StageKind::Exit, exit_start, expander));
    descriptors
}

/// Shift every stage index in `stages` by `by`.
pub fn offset(stages: &mut [StageDescriptor<'_>], by: usize) {
    for stage in stages {
        stage.stage_index += by;
    }
}

fn intro_steps<'m>(
    sequences: &'m [IntroSequence],
    expander: &mut Expander<'_, 'm>,
) -> Vec<&'m Stage> {
    sequences
        .iter()
        .flat_map(|sequence| expander.flatten_stages(sequence.steps(), StageKind::Intro))
        .collect()
}

fn describe<'m>(
    stages: Vec<&'m Stage>,
    kind: StageKind,
    first_index: usize,
    expander: &mut Expander<'_, 'm>,
) -> Vec<StageDescriptor<'m>> {
    stages
        .into_iter()
        .enumerate()
        .map(|(i, stage)| {
            let elements = expander.flatten_elements(stage.elements());
            trace!(
                stage_index = first_index + i,
                kind:% = kind,
                path:% = stage.path(),
                elements = elements.len();
                "Placed stage"
            );
            StageDescriptor {
                stage_index: first_index + i,
                kind,
                stage,
                elements,
            }
        })
        .collect()
}
