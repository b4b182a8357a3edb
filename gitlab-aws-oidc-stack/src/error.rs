//! Error types for stack configuration and synthesis

use thiserror::Error;

/// Errors raised while loading a stack configuration or synthesizing its template.
///
/// The stack definition itself never fails; every variant besides `Config` comes
/// from the checks `GitlabOidcStack::synthesize` runs before emitting a template.
#[derive(Debug, Error)]
pub enum StackError {
    /// The configuration could not be read, parsed or serialized.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid thumbprint '{thumbprint}': {reason}")]
    InvalidThumbprint { thumbprint: String, reason: String },

    #[error("Invalid role name '{name}': {reason}")]
    InvalidRoleName { name: String, reason: String },

    #[error("Invalid stack name '{name}': {reason}")]
    InvalidStackName { name: String, reason: String },

    #[error("Failed to serialize template: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StackError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn invalid_thumbprint(thumbprint: &str, reason: impl Into<String>) -> Self {
        Self::InvalidThumbprint {
            thumbprint: thumbprint.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_role_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRoleName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_stack_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStackName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type StackResult<T> = Result<T, StackError>;
