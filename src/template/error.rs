// Template parse errors

use thiserror::Error;

/// Errors raised while loading a protocol template document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid template YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid template structure at {context}: {message}")]
    InvalidStructure { context: String, message: String },

    #[error("step '{step}' is missing required field '{field}'")]
    MissingField { step: String, field: &'static str },

    #[error("step label '{label}' has no parseable sequence number")]
    BadSequenceLabel { label: String },

    #[error("output placeholder '{placeholder}' has no blueprint under 'processedsamples'")]
    MissingBlueprint { placeholder: String },

    #[error("placeholder '{placeholder}' has more than one blueprint")]
    DuplicateBlueprint { placeholder: String },
}

impl ParseError {
    pub fn invalid_structure(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            context: context.into(),
            message: message.into(),
        }
    }
}
