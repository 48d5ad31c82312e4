//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Output could not be created or connected
    #[error("Failed to start output '{output}': {message}")]
    OutputStart { output: String, message: String },

    /// Malformed input line
    #[error("Invalid metric on input line {line}: {message}")]
    Input { line: u64, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn output_start(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutputStart {
            output: output.into(),
            message: message.into(),
        }
    }

    pub fn input(line: u64, message: impl Into<String>) -> Self {
        Self::Input {
            line,
            message: message.into(),
        }
    }
}
