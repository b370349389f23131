//! The native library loader.
//!
//! [`Loader::load`] first asks the OS loader for the library by name. Only
//! when that fails does it search the configured packages, extract the
//! first matching entry to a private temporary file, and load that file by
//! path. The temporary file never outlives the call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error};
use tempfile::TempPath;

use crate::archive::{PackageReader, ZipPackageReader};
use crate::config::LoaderConfig;
use crate::dirs::BaseDirs;
use crate::dynamic::{DynamicLoader, SystemLoader};
use crate::error::{LoaderError, Result};
use crate::extraction::{ExtractedEntry, Extraction, Located, extract, locate};
use crate::library_name::LibraryName;
use crate::platform::Platform;

/// How [`Loader::load`] satisfied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The OS loader found the library on its standard search path.
    Linked,
    /// The library was extracted from a package and loaded by path.
    Extracted(ExtractedEntry),
}

/// Resolves native libraries by name, falling back to bundled packages.
///
/// A `Loader` is `Send + Sync`; concurrent loads of different libraries are
/// independent. Loading the same library from several threads at once is
/// not coalesced, so embedders should load each library once at startup.
pub struct Loader {
    platform: Platform,
    temp_dir: PathBuf,
    dynamic: Arc<dyn DynamicLoader>,
    reader: Arc<dyn PackageReader>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("platform", &self.platform)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Loader {
    /// Create a loader using the OS dynamic loader and zip packages.
    #[must_use]
    pub fn new(platform: Platform, temp_dir: PathBuf) -> Self {
        Self::with_capabilities(
            platform,
            temp_dir,
            Arc::new(SystemLoader),
            Arc::new(ZipPackageReader),
        )
    }

    /// Create a loader with injected dynamic-loading and package capabilities.
    #[must_use]
    pub fn with_capabilities(
        platform: Platform,
        temp_dir: PathBuf,
        dynamic: Arc<dyn DynamicLoader>,
        reader: Arc<dyn PackageReader>,
    ) -> Self {
        Self {
            platform,
            temp_dir,
            dynamic,
            reader,
        }
    }

    /// Create a system loader from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured architectures are invalid.
    pub fn from_config(config: &LoaderConfig, dirs: &dyn BaseDirs) -> Result<Self> {
        Ok(Self::new(config.platform()?, config.temp_dir(dirs)))
    }

    /// The platform inputs this loader searches.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Directory temporary library files are created in.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Load `library` into the process.
    ///
    /// The direct load by name always runs first and, when it succeeds, no
    /// package is opened and no file is created. Otherwise the library is
    /// extracted to a fresh temporary file, loaded by absolute path, and the
    /// file is deleted before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Unavailable`] naming the library, the direct
    /// load failure, and the reason the package fallback failed.
    pub fn load(&self, library: &LibraryName) -> Result<LoadOutcome> {
        let direct = match self.dynamic.load_by_name(library) {
            Ok(()) => return Ok(LoadOutcome::Linked),
            Err(e) => e,
        };
        debug!(
            "failed to load {library} normally, attempting to extract it from a package: {direct}"
        );

        match self.load_from_packages(library) {
            Ok(entry) => Ok(LoadOutcome::Extracted(entry)),
            Err(cause) => {
                error!("failed to load {library} from packages: {cause}");
                Err(LoaderError::Unavailable {
                    library: library.to_string(),
                    direct,
                    cause: Box::new(cause),
                })
            }
        }
    }

    /// Validate `name` and [`load`](Self::load) it.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidLibraryName`] for unusable names and
    /// otherwise the errors of [`load`](Self::load).
    pub fn load_name(&self, name: &str) -> Result<LoadOutcome> {
        self.load(&LibraryName::try_from(name)?)
    }

    /// Extract `library` to `destination` without loading it.
    ///
    /// # Errors
    ///
    /// See [`crate::extraction::extract`].
    pub fn extract(&self, library: &LibraryName, destination: &Path) -> Result<Extraction> {
        extract(&self.platform, self.reader.as_ref(), library, destination)
    }

    /// Find the package/architecture pair `library` would be extracted from.
    #[must_use]
    pub fn locate(&self, library: &LibraryName) -> Option<Located> {
        locate(&self.platform, self.reader.as_ref(), library)
    }

    fn load_from_packages(&self, library: &LibraryName) -> Result<ExtractedEntry> {
        let temp = self.create_temp_file()?;
        let entry = match extract(&self.platform, self.reader.as_ref(), library, &temp)? {
            Extraction::Extracted(entry) => entry,
            Extraction::NotFound { probed } => {
                return Err(LoaderError::NotFoundInArchives {
                    library: self.platform.library_file_name(library).to_string(),
                    probed,
                });
            }
        };
        self.dynamic.load_by_path(&temp)?;
        Ok(entry)
    }

    /// Create an empty, uniquely named file that is deleted on drop.
    fn create_temp_file(&self) -> Result<TempPath> {
        let dir_error = |source| LoaderError::TemporaryFile {
            dir: self.temp_dir.clone(),
            source,
        };
        let dir = std::path::absolute(&self.temp_dir).map_err(dir_error)?;
        std::fs::create_dir_all(&dir).map_err(dir_error)?;
        let file = tempfile::Builder::new()
            .prefix("lib")
            .suffix(self.platform.naming().suffix())
            .tempfile_in(&dir)
            .map_err(dir_error)?;
        Ok(file.into_temp_path())
    }
}
