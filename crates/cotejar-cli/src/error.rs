//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Project layout problem
    #[error("Project error: {message}")]
    Project {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cotejar library error
    #[error("Cotejar error: {0}")]
    Cotejar(#[from] cotejar::CotejarError),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl CliError {
    /// Create a project layout error
    #[must_use]
    pub fn project(message: impl Into<String>) -> Self {
        Self::Project {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
