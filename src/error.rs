//! Error types for native library resolution.
//!
//! Per-package archive failures are recovered inside the search and never
//! surface here. What remains are the failures a caller can act on: invalid
//! inputs, I/O failures while writing the winning entry, loader rejections,
//! and the single final error produced when every route to a library has
//! been exhausted.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::dynamic::DynamicLoadError;

/// Errors that can occur while resolving, extracting, or loading a library.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The library name cannot be used to build a file or entry name.
    #[error("invalid library name \"{name}\": {reason}")]
    InvalidLibraryName {
        /// The rejected name.
        name: String,
        /// Description of the violated constraint.
        reason: &'static str,
    },

    /// An architecture identifier cannot be used as an archive path segment.
    #[error("invalid architecture \"{value}\": {reason}")]
    InvalidArchitecture {
        /// The rejected identifier.
        value: String,
        /// Description of the violated constraint.
        reason: &'static str,
    },

    /// No candidate package contained the library for any architecture.
    #[error("{library} not found in any package ({probed} package/architecture pairs probed)")]
    NotFoundInArchives {
        /// Decorated file name that was searched for.
        library: String,
        /// Number of package/architecture pairs that were probed.
        probed: usize,
    },

    /// The extraction destination is an existing directory.
    #[error("extraction destination {path} is a directory")]
    DestinationIsDirectory {
        /// The offending destination.
        path: PathBuf,
    },

    /// Writing the matched entry to its destination failed.
    #[error("failed to extract {entry} to {destination}")]
    ExtractionIo {
        /// Archive entry that was being written.
        entry: String,
        /// Destination the entry was written to.
        destination: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A temporary file could not be created in the given directory.
    #[error("failed to create temporary file in {dir}")]
    TemporaryFile {
        /// Directory the file was requested in.
        dir: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The dynamic loader rejected an extracted library.
    #[error(transparent)]
    Load(#[from] DynamicLoadError),

    /// Neither the direct load nor archive extraction produced a library.
    #[error(
        "unable to load native library {library}: direct load failed ({direct}) and archive fallback failed"
    )]
    Unavailable {
        /// The library that was requested.
        library: String,
        /// Why the direct load by name failed.
        direct: DynamicLoadError,
        /// Why the archive fallback failed.
        #[source]
        cause: Box<LoaderError>,
    },

    /// Loader configuration could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias using [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
