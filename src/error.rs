//! Render Errors
//!
//! Every failure aborts the render. No partial command line is ever returned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownProperty,
    MissingRequiredValue,
    TypeMismatch,
    MalformedTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Unknown property '{name}' in rule '{rule}'")]
    UnknownProperty { rule: String, name: String },

    #[error("Property '{property}' has no enum value named '{value}'")]
    UnknownEnumValue { property: String, value: String },

    #[error("Required property '{property}' ({expected}) has no value")]
    MissingRequiredValue { property: String, expected: String },

    #[error("Property '{property}' expects {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error(
        "Switch '{switch}' of {expected} property '{property}' has a value placeholder \
         but no value to substitute"
    )]
    PlaceholderWithoutValue {
        property: String,
        expected: String,
        switch: String,
    },

    #[error("Malformed rendering template '{template}' at byte {position}: {reason}")]
    MalformedTemplate {
        template: String,
        position: usize,
        reason: String,
    },
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownProperty { .. } | Self::UnknownEnumValue { .. } => {
                ErrorKind::UnknownProperty
            }
            Self::MissingRequiredValue { .. } => ErrorKind::MissingRequiredValue,
            Self::TypeMismatch { .. } | Self::PlaceholderWithoutValue { .. } => {
                ErrorKind::TypeMismatch
            }
            Self::MalformedTemplate { .. } => ErrorKind::MalformedTemplate,
        }
    }

    /// Name of the property the failure is about, when there is one.
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::UnknownProperty { name, .. } => Some(name),
            Self::UnknownEnumValue { property, .. }
            | Self::MissingRequiredValue { property, .. }
            | Self::TypeMismatch { property, .. }
            | Self::PlaceholderWithoutValue { property, .. } => Some(property),
            Self::MalformedTemplate { .. } => None,
        }
    }
}
