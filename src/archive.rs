//! Single-entry probes against bundled packages.
//!
//! A package is a zip container. Native libraries live at the fixed path
//! `lib/<architecture>/<platformLibraryName>`, which pre-built packages rely
//! on and must be reproduced exactly. [`PackageReader`] is the seam the
//! extraction search talks to: one call per `(package, entry)` pair.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::architecture::Architecture;
use crate::library_name::PlatformLibraryName;

/// Directory inside a package that holds per-architecture native libraries.
const NATIVE_LIBRARY_DIR: &str = "lib";

/// Relative path of a native library inside a package.
///
/// Always joined with `/`, independent of the host path separator, because
/// that is how zip entry names are stored.
///
/// # Examples
///
/// ```
/// use native_loader::archive::ArchiveEntryPath;
/// use native_loader::architecture::Architecture;
/// use native_loader::library_name::{LibraryName, LibraryNaming};
///
/// let abi = Architecture::try_from("arm64-v8a").expect("valid");
/// let name = LibraryName::try_from("wg-go").expect("valid");
/// let entry = ArchiveEntryPath::new(&abi, &LibraryNaming::ELF.decorate(&name));
/// assert_eq!(entry.as_str(), "lib/arm64-v8a/libwg-go.so");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntryPath(String);

impl ArchiveEntryPath {
    /// Build the entry path for one architecture and decorated file name.
    #[must_use]
    pub fn new(architecture: &Architecture, file_name: &PlatformLibraryName) -> Self {
        Self(format!("{NATIVE_LIBRARY_DIR}/{architecture}/{file_name}"))
    }

    /// Return the entry path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveEntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of probing one package for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The package does not contain the entry.
    Missing,
    /// The entry was streamed to the sink in full.
    Copied {
        /// Number of bytes written.
        bytes: u64,
    },
}

/// Errors from probing a single package.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The package could not be opened, parsed, or its entry decoded.
    ///
    /// The search treats this as "no match in this package" and moves on.
    #[error("package {package} is unreadable: {reason}")]
    Unreadable {
        /// Path of the offending package.
        package: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Writing entry bytes to the sink failed.
    #[error("failed to write extracted bytes")]
    Sink {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn unreadable(package: &Path, reason: impl fmt::Display) -> Self {
        Self::Unreadable {
            package: package.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Capability to look up and stream single entries from packages.
pub trait PackageReader: Send + Sync {
    /// Stream `entry` from `package` into `sink` if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Unreadable`] when the package cannot be
    /// opened, parsed, or the entry data fails to decode, and
    /// [`ArchiveError::Sink`] when writing to `sink` fails. After an
    /// `Unreadable` error `sink` may hold a prefix of the entry.
    fn copy_entry(
        &self,
        package: &Path,
        entry: &ArchiveEntryPath,
        sink: &mut dyn Write,
    ) -> Result<Probe, ArchiveError>;
}

/// [`PackageReader`] for zip packages (APKs, AARs, jars, plain zips).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackageReader;

impl ZipPackageReader {
    fn open(package: &Path) -> Result<ZipArchive<File>, ArchiveError> {
        let file = File::open(package).map_err(|e| ArchiveError::unreadable(package, e))?;
        ZipArchive::new(file).map_err(|e| ArchiveError::unreadable(package, e))
    }
}

impl PackageReader for ZipPackageReader {
    fn copy_entry(
        &self,
        package: &Path,
        entry: &ArchiveEntryPath,
        sink: &mut dyn Write,
    ) -> Result<Probe, ArchiveError> {
        let mut archive = Self::open(package)?;
        let mut file = match archive.by_name(entry.as_str()) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(Probe::Missing),
            Err(e) => return Err(ArchiveError::unreadable(package, e)),
        };
        if file.is_dir() {
            return Ok(Probe::Missing);
        }
        let bytes = stream(&mut file, sink, package)?;
        Ok(Probe::Copied { bytes })
    }
}

/// Copy `reader` into `sink`, keeping read and write failures apart.
///
/// `io::copy` folds both into one error; the search needs to know whether
/// the package or the destination was at fault.
fn stream(
    reader: &mut dyn Read,
    sink: &mut dyn Write,
    package: &Path,
) -> Result<u64, ArchiveError> {
    let mut buffer = [0_u8; 8192];
    let mut total = 0_u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::unreadable(package, e)),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        sink.write_all(chunk).map_err(|source| ArchiveError::Sink { source })?;
        total += read as u64;
    }
    Ok(total)
}
