//! Errors reported by GPU backends.

use thiserror::Error;

/// A failure reported by the GPU driver or compiler.
///
/// None of these are retried internally; they surface to the immediate caller.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// A device, queue, command buffer, encoder or library could not be
    /// created.
    #[error("Failed to create {0}")]
    ResourceCreation(String),

    /// A shader function could not be found, specialized or linked.
    #[error("Failed to compile '{function}': {message}")]
    Compilation { function: String, message: String },

    /// A submitted command buffer finished in an error state.
    #[error("Command buffer '{label}' failed: {message}")]
    Execution { label: String, message: String },
}

impl ComputeError {
    pub fn resource(what: impl Into<String>) -> Self {
        ComputeError::ResourceCreation(what.into())
    }

    pub fn compilation(function: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ComputeError::Compilation {
            function: function.into(),
            message: message.to_string(),
        }
    }

    pub fn execution(label: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ComputeError::Execution {
            label: label.into(),
            message: message.to_string(),
        }
    }
}
