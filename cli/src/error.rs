//! Error types for the native loader CLI.

use std::io;

use native_loader::LoaderError;
use thiserror::Error;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration, extraction, or loading failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// A command's result could not be written to standard output.
    #[error("failed to write output: {source}")]
    WriteFailed {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for CliError {
    fn from(source: io::Error) -> Self {
        Self::WriteFailed { source }
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
