//! Lookup of templates by name.

use std::collections::HashMap;

use log::debug;

use stagebook_core::error::ErrorCode;

use crate::{
    finding::Finding,
    model::{Model, TemplateContent},
};

/// A template as seen through the registry.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredTemplate<'m> {
    index: usize,
    content: &'m TemplateContent,
}

impl<'m> RegisteredTemplate<'m> {
    /// Position of the template in the `templates` array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The template's content; its paths are under `templates[index].templateContent`.
    pub fn content(&self) -> &'m TemplateContent {
        self.content
    }
}

/// Templates of one document, indexed by `templateName`.
///
/// Templates lacking a name or content are left out. When a name is used
/// twice the first template wins and the repeat is reported.
#[derive(Debug, Default)]
pub struct TemplateRegistry<'m> {
    templates: HashMap<&'m str, RegisteredTemplate<'m>>,
    findings: Vec<Finding>,
}

impl<'m> TemplateRegistry<'m> {
    pub fn build(model: &'m Model) -> Self {
        let mut registry = Self::default();

        for template in model.templates() {
            let (Some(name), Some(content)) = (template.name(), template.content()) else {
                debug!(
                    index = template.index(),
                    has_name = template.name().is_some();
                    "Skipping template without name or content"
                );
                continue;
            };

            if registry.templates.contains_key(name) {
                registry.findings.push(
                    Finding::new(
                        ErrorCode::E402,
                        format!(r#"Template name "{name}" is defined more than once."#),
                        template.name_path(),
                    )
                    .with_help("the first template with this name is the one used"),
                );
                continue;
            }

            registry.templates.insert(
                name,
                RegisteredTemplate {
                    index: template.index(),
                    content,
                },
            );
        }

        debug!(count = registry.templates.len(); "Template registry built");
        registry
    }

    pub fn get(&self, name: &str) -> Option<RegisteredTemplate<'m>> {
        self.templates.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Problems found while building the registry.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}
