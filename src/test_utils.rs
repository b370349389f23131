//! Shared test utilities for the loader crate.
//!
//! Available to unit tests and, through the `test-support` feature, to
//! integration tests.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::dynamic::{DynamicLoadError, DynamicLoader};
use crate::library_name::LibraryName;

/// Builds zip packages with arbitrary entries.
///
/// Entries are stored uncompressed so that tests can locate and corrupt
/// their payload bytes in the written file.
#[derive(Debug, Default)]
pub struct PackageBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl PackageBuilder {
    /// Create an empty package.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry.
    #[must_use]
    pub fn entry(mut self, name: &str, contents: &[u8]) -> Self {
        self.entries.push((name.to_owned(), Some(contents.to_vec())));
        self
    }

    /// Add a native library at `lib/<architecture>/<file_name>`.
    #[must_use]
    pub fn library(self, architecture: &str, file_name: &str, contents: &[u8]) -> Self {
        self.entry(&format!("lib/{architecture}/{file_name}"), contents)
    }

    /// Add a directory entry.
    #[must_use]
    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push((name.to_owned(), None));
        self
    }

    /// Write the package to `path` and return the path.
    ///
    /// # Errors
    ///
    /// Returns any I/O or zip encoding error.
    pub fn write_to(&self, path: &Path) -> io::Result<PathBuf> {
        let mut writer = ZipWriter::new(File::create(path)?);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in &self.entries {
            match contents {
                Some(bytes) => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(bytes)?;
                }
                None => writer.add_directory(name.as_str(), options)?,
            }
        }
        writer.finish()?;
        Ok(path.to_path_buf())
    }
}

/// Write a file that is not a zip container.
///
/// # Errors
///
/// Returns any I/O error from writing the file.
pub fn write_garbage_package(path: &Path) -> io::Result<()> {
    std::fs::write(path, b"this is not a zip archive")
}

/// Flip the first occurrence of `payload` inside the package at `path`.
///
/// With stored (uncompressed) entries this leaves the central directory
/// intact but breaks the entry's checksum, so the package opens and the
/// entry is found but reading it fails.
///
/// # Errors
///
/// Returns an error when the file cannot be read or written, or does not
/// contain `payload`.
pub fn corrupt_payload(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut contents = std::fs::read(path)?;
    let offset = contents
        .windows(payload.len())
        .position(|window| window == payload)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "payload not in package"))?;
    if let Some(byte) = contents.get_mut(offset) {
        *byte ^= 0xff;
    }
    std::fs::write(path, contents)
}

/// A single call observed by [`RecordingLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    /// `load_by_name` with the requested name.
    ByName(String),
    /// `load_by_path` with the path and the file contents at call time.
    ByPath {
        /// Path that was passed.
        path: PathBuf,
        /// File contents read during the call, if the file existed.
        contents: Option<Vec<u8>>,
    },
}

/// A [`DynamicLoader`] that records calls instead of touching the process.
///
/// Names listed as linkable succeed on the fast path; every other name
/// fails. Paths succeed while `accept_paths` is true, after the file
/// contents have been captured so tests can inspect what was extracted.
#[derive(Debug)]
pub struct RecordingLoader {
    linkable: Vec<String>,
    accept_paths: bool,
    calls: Mutex<Vec<LoaderCall>>,
}

impl RecordingLoader {
    /// Create a loader that links the given names directly.
    #[must_use]
    pub fn new(linkable: &[&str], accept_paths: bool) -> Self {
        Self {
            linkable: linkable.iter().map(|name| (*name).to_owned()).collect(),
            accept_paths,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return the calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<LoaderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: LoaderCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl DynamicLoader for RecordingLoader {
    fn load_by_name(&self, name: &LibraryName) -> Result<(), DynamicLoadError> {
        self.record(LoaderCall::ByName(name.as_str().to_owned()));
        if self.linkable.iter().any(|linkable| linkable == name.as_str()) {
            Ok(())
        } else {
            Err(DynamicLoadError {
                target: name.as_str().to_owned(),
                reason: "not found on the library search path".to_owned(),
            })
        }
    }

    fn load_by_path(&self, path: &Path) -> Result<(), DynamicLoadError> {
        self.record(LoaderCall::ByPath {
            path: path.to_path_buf(),
            contents: std::fs::read(path).ok(),
        });
        if self.accept_paths {
            Ok(())
        } else {
            Err(DynamicLoadError {
                target: path.display().to_string(),
                reason: "invalid ELF header".to_owned(),
            })
        }
    }
}
