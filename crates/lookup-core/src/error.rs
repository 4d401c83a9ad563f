//! Error types for the lookup plugin core.
//!
//! Value Model and registry failures are reported to their immediate caller.
//! Faults raised inside a lookup function never become a `PluginError`; they
//! are recovered by [`crate::dispatch`] and turned into a failed outcome.

use crate::function::FunctionKind;
use thiserror::Error;

/// Main error type for the lookup plugin core.
#[derive(Debug, Error)]
pub enum PluginError {
    // Decode errors
    #[error("{message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Unable to decode field {field}: unknown rich type '{tag}'")]
    UnknownRichType { field: &'static str, tag: String },

    #[error("Unable to decode {tag}: missing field {field}")]
    MissingRichValue { field: &'static str, tag: String },

    #[error("Unable to decode field {field} of {tag}: {message}")]
    InvalidRichPayload {
        field: &'static str,
        tag: String,
        message: String,
    },

    // Conversion errors
    #[error("Unable to create a value from {type_name}")]
    UnsupportedType { type_name: String },

    // Registry errors
    #[error("{kind} function '{name}' is already registered")]
    AlreadyRegistered { kind: FunctionKind, name: String },

    #[error("Invalid function name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("No lookup functions have been registered")]
    NoFunctions,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for lookup plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl PluginError {
    /// Create an unsupported type error for the given type name.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        PluginError::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Check if this error came from decoding wire JSON.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            PluginError::Json { .. }
                | PluginError::UnknownRichType { .. }
                | PluginError::MissingRichValue { .. }
                | PluginError::InvalidRichPayload { .. }
        )
    }
}
