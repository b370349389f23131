//! Dynamic loading capability.
//!
//! The OS loader registry is process-wide state that cannot be reset between
//! tests. All interaction with it goes through [`DynamicLoader`], so the
//! resolution logic can be driven by a fake.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use libloading::Library;
use log::trace;

use crate::library_name::LibraryName;

/// The OS dynamic loader rejected a library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dynamic load of {target} failed: {reason}")]
pub struct DynamicLoadError {
    /// Name or path that was passed to the loader.
    pub target: String,
    /// Loader diagnostic.
    pub reason: String,
}

/// Loads shared libraries into the running process.
#[cfg_attr(test, mockall::automock)]
pub trait DynamicLoader: Send + Sync {
    /// Load a library through the platform's standard search path.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicLoadError`] when the library cannot be found or
    /// mapped. This is the expected outcome when the library is only
    /// available inside a package.
    fn load_by_name(&self, name: &LibraryName) -> Result<(), DynamicLoadError>;

    /// Load a library from an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`DynamicLoadError`] when the loader rejects the file.
    fn load_by_path(&self, path: &Path) -> Result<(), DynamicLoadError>;
}

/// Libraries loaded by [`SystemLoader`], kept mapped for the process lifetime.
///
/// Symbols resolved from these libraries may be called at any time after
/// `load` returns, so the handles are never closed.
static RETAINED: Mutex<Vec<Library>> = Mutex::new(Vec::new());

/// [`DynamicLoader`] backed by the OS loader through `libloading`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

impl SystemLoader {
    fn retain(library: Library) {
        RETAINED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(library);
    }

    /// Number of libraries this process has loaded through `SystemLoader`.
    #[must_use]
    pub fn retained_count() -> usize {
        RETAINED.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl DynamicLoader for SystemLoader {
    fn load_by_name(&self, name: &LibraryName) -> Result<(), DynamicLoadError> {
        let file_name = libloading::library_filename(name.as_str());
        trace!("loading {} by name", file_name.to_string_lossy());
        // SAFETY: loading a library runs its initialisers. Callers of the
        // loader choose which libraries to load and accept that contract.
        let library = unsafe { Library::new(&file_name) }.map_err(|e| DynamicLoadError {
            target: name.as_str().to_owned(),
            reason: e.to_string(),
        })?;
        Self::retain(library);
        Ok(())
    }

    fn load_by_path(&self, path: &Path) -> Result<(), DynamicLoadError> {
        trace!("loading {}", path.display());
        // SAFETY: as above; the path points at a file extracted from a
        // package the caller configured.
        let library = unsafe { Library::new(path) }.map_err(|e| DynamicLoadError {
            target: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::retain(library);
        Ok(())
    }
}
