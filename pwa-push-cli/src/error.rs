//! Error types for the pwa-push CLI.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be loaded
    #[error(transparent)]
    Config(#[from] pwa_push_config::ConfigError),

    /// Key, token or delivery failure
    #[error(transparent)]
    Push(#[from] pwa_push::PushError),

    /// Input file is not valid JSON of the expected shape
    #[error("Invalid input in {path}: {message}")]
    Input { path: String, message: String },

    /// File already exists
    #[error("File already exists: {0} (use --force to overwrite)")]
    FileExists(String),

    /// Nothing was delivered
    #[error("No notification was delivered ({failed} failed)")]
    NothingDelivered { failed: usize },

    /// Interrupted by Ctrl-C
    #[error("Interrupted")]
    Interrupted,
}
