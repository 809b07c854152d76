//! Configuration for validation passes.
//!
//! All types implement [`serde::Deserialize`] with every field defaulted, so
//! an empty configuration file yields [`AppConfig::default`].
//!
//! # Example
//!
//! ```
//! # use stagebook::config::{AppConfig, PositionFallback};
//! let config = AppConfig::default();
//! assert_eq!(config.validation().position_fallback(), PositionFallback::DocumentStart);
//! assert!(config.validation().detect_template_cycles());
//! ```

use serde::Deserialize;

use crate::references::FieldType;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Validation section.
    #[serde(default)]
    validation: ValidationConfig,
}

impl AppConfig {
    pub fn new(validation: ValidationConfig) -> Self {
        Self { validation }
    }

    /// Returns the validation configuration.
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }
}

/// What to do with a diagnostic whose path cannot be placed in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionFallback {
    /// Anchor it at the start of the document.
    #[default]
    DocumentStart,
    /// Leave it out.
    Drop,
}

/// Settings for the reference and timeline checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    position_fallback: PositionFallback,
    detect_template_cycles: bool,
    connection_info_fields: Vec<String>,
    browser_info_fields: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            position_fallback: PositionFallback::default(),
            detect_template_cycles: true,
            connection_info_fields: [
                "country",
                "timezone",
                "isKnownVpn",
                "timezoneMismatch",
                "isLikelyVpn",
            ]
            .map(String::from)
            .to_vec(),
            browser_info_fields: [
                "width",
                "height",
                "screenWidth",
                "screenHeight",
                "userAgent",
                "language",
                "timezone",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl ValidationConfig {
    pub fn with_position_fallback(mut self, fallback: PositionFallback) -> Self {
        self.position_fallback = fallback;
        self
    }

    pub fn with_detect_template_cycles(mut self, detect: bool) -> Self {
        self.detect_template_cycles = detect;
        self
    }

    pub fn position_fallback(&self) -> PositionFallback {
        self.position_fallback
    }

    /// Whether template cycles are reported. They are never followed.
    pub fn detect_template_cycles(&self) -> bool {
        self.detect_template_cycles
    }

    /// The known field names for `field_type`.
    pub fn fields(&self, field_type: FieldType) -> &[String] {
        match field_type {
            FieldType::ConnectionInfo => &self.connection_info_fields,
            FieldType::BrowserInfo => &self.browser_info_fields,
        }
    }

    /// `true` if `field` is in the vocabulary of `field_type`.
    pub fn is_known_field(&self, field_type: FieldType, field: &str) -> bool {
        self.fields(field_type).iter().any(|known| known == field)
    }
}
