//! CLI logic for the Stagebook linter.
//!
//! [`run`] loads the configuration and the treatment file, validates it and
//! hands back a [`Report`] for the binary to render.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;
pub use config::{ConfigError, load_config};

use log::info;

use stagebook::{Diagnostic, Linter, StagebookError};

/// The outcome of linting one file.
#[derive(Debug)]
pub struct Report {
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// The text of the linted file.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `true` if nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Run the Stagebook CLI application
///
/// # Errors
///
/// Returns `StagebookError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Documents the loader rejects
pub fn run(args: &Args) -> Result<Report, StagebookError> {
    info!(input_path = args.input; "Linting treatment file");

    let app_config = config::load_config(args.config.as_ref())?;

    let linter = Linter::new(app_config);
    let (source, diagnostics) = linter.lint_file(&args.input)?;

    info!(
        input_path = args.input,
        diagnostics = diagnostics.len();
        "Treatment file checked"
    );

    Ok(Report {
        source,
        diagnostics,
    })
}
