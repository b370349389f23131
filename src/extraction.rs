//! Archive-based resolution of native libraries.
//!
//! Searches the platform's packages for `lib/<architecture>/<file>` in
//! architecture-major order and writes the first match to a destination.
//! A more preferred architecture in an auxiliary package beats a less
//! preferred one in the primary package: the wrong ABI would not load at
//! all, whereas package precedence is only a tie-breaker.

use std::fs::File;
use std::io::{self, Seek};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use tempfile::NamedTempFile;

use crate::architecture::Architecture;
use crate::archive::{ArchiveEntryPath, ArchiveError, PackageReader, Probe};
use crate::error::{LoaderError, Result};
use crate::library_name::LibraryName;
use crate::platform::Platform;

/// The package/architecture pair an extraction was satisfied from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Package the entry was read from.
    pub package: PathBuf,
    /// Architecture directory the entry was found under.
    pub architecture: Architecture,
    /// Entry path inside the package.
    pub entry: ArchiveEntryPath,
    /// Number of bytes written to the destination.
    pub bytes: u64,
}

/// Outcome of [`extract`].
///
/// Not finding the library is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The entry was written to the destination.
    Extracted(ExtractedEntry),
    /// No package contained the entry for any architecture.
    NotFound {
        /// Number of package/architecture pairs probed.
        probed: usize,
    },
}

/// A package/architecture pair that contains the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Package containing the entry.
    pub package: PathBuf,
    /// Architecture directory the entry was found under.
    pub architecture: Architecture,
    /// Entry path inside the package.
    pub entry: ArchiveEntryPath,
}

/// Lazily created staging file beside the destination.
///
/// Entry bytes are streamed here and only renamed onto the destination once
/// complete, so a reader of the destination never sees a partial file.
struct Staging<'a> {
    destination: &'a Path,
    file: Option<NamedTempFile>,
}

impl<'a> Staging<'a> {
    fn new(destination: &'a Path) -> Self {
        Self {
            destination,
            file: None,
        }
    }

    fn io_error(&self, entry: &ArchiveEntryPath, source: io::Error) -> LoaderError {
        LoaderError::ExtractionIo {
            entry: entry.to_string(),
            destination: self.destination.to_path_buf(),
            source,
        }
    }

    fn sink(&mut self, entry: &ArchiveEntryPath) -> Result<&mut NamedTempFile> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let dir = match self.destination.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                tempfile::Builder::new()
                    .prefix(".native-loader-")
                    .suffix(".partial")
                    .tempfile_in(dir)
                    .map_err(|e| self.io_error(entry, e))?
            }
        };
        Ok(self.file.insert(file))
    }

    /// Discard bytes left behind by an entry that failed mid-stream.
    fn reset(&mut self, entry: &ArchiveEntryPath) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let outcome = file
            .as_file_mut()
            .set_len(0)
            .and_then(|()| file.rewind());
        outcome.map_err(|e| self.io_error(entry, e))
    }

    fn commit(mut self, entry: &ArchiveEntryPath) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        finish(file.as_file()).map_err(|e| self.io_error(entry, e))?;
        file.persist(self.destination)
            .map_err(|e| self.io_error(entry, e.error))?;
        Ok(())
    }
}

fn finish(file: &File) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    file.sync_all()
}

/// Extract `library` from the platform's packages to `destination`.
///
/// Architectures are tried in preference order; for each, packages are
/// tried in precedence order. The first package containing
/// `lib/<architecture>/<file>` is streamed to `destination`, replacing any
/// existing file atomically. Unreadable packages are logged and skipped.
///
/// # Errors
///
/// Returns [`LoaderError::DestinationIsDirectory`] if `destination` is a
/// directory and [`LoaderError::ExtractionIo`] if the matched entry cannot
/// be written. Not finding the entry is reported as
/// [`Extraction::NotFound`].
///
/// # Examples
///
/// ```no_run
/// use native_loader::archive::ZipPackageReader;
/// use native_loader::extraction::{Extraction, extract};
/// use native_loader::library_name::LibraryName;
/// use native_loader::platform::Platform;
/// use std::path::Path;
///
/// let platform = Platform::host(vec!["/data/app/base.apk".into()]);
/// let name = LibraryName::try_from("wg-go")?;
/// match extract(&platform, &ZipPackageReader, &name, Path::new("/tmp/libwg-go.so"))? {
///     Extraction::Extracted(entry) => println!("from {}", entry.package.display()),
///     Extraction::NotFound { .. } => println!("not bundled"),
/// }
/// # Ok::<(), native_loader::error::LoaderError>(())
/// ```
pub fn extract(
    platform: &Platform,
    reader: &dyn PackageReader,
    library: &LibraryName,
    destination: &Path,
) -> Result<Extraction> {
    if destination.is_dir() {
        return Err(LoaderError::DestinationIsDirectory {
            path: destination.to_path_buf(),
        });
    }

    let file_name = platform.library_file_name(library);
    let mut staging = Staging::new(destination);
    let mut probed = 0;

    for (architecture, package) in platform.search_order() {
        probed += 1;
        let entry = ArchiveEntryPath::new(architecture, &file_name);
        trace!("probing {}:/{entry}", package.display());

        match reader.copy_entry(package, &entry, staging.sink(&entry)?) {
            Ok(Probe::Missing) => {}
            Ok(Probe::Copied { bytes }) => {
                debug!(
                    "extracting {}:/{entry} to {}",
                    package.display(),
                    destination.display()
                );
                staging.commit(&entry)?;
                return Ok(Extraction::Extracted(ExtractedEntry {
                    package: package.to_path_buf(),
                    architecture: architecture.clone(),
                    entry,
                    bytes,
                }));
            }
            Err(ArchiveError::Unreadable { package, reason }) => {
                warn!(
                    "failed to extract library from package {}: {reason}",
                    package.display()
                );
                staging.reset(&entry)?;
            }
            Err(ArchiveError::Sink { source }) => return Err(staging.io_error(&entry, source)),
        }
    }

    Ok(Extraction::NotFound { probed })
}

/// Find the pair [`extract`] would use, without writing anything.
///
/// Each candidate entry is streamed and discarded, so an entry that fails
/// to decode is skipped here just as it is during extraction. Unreadable
/// packages are logged and skipped.
#[must_use]
pub fn locate(
    platform: &Platform,
    reader: &dyn PackageReader,
    library: &LibraryName,
) -> Option<Located> {
    let file_name = platform.library_file_name(library);
    platform.search_order().find_map(|(architecture, package)| {
        let entry = ArchiveEntryPath::new(architecture, &file_name);
        trace!("probing {}:/{entry}", package.display());
        match reader.copy_entry(package, &entry, &mut io::sink()) {
            Ok(Probe::Copied { .. }) => Some(Located {
                package: package.to_path_buf(),
                architecture: architecture.clone(),
                entry,
            }),
            Ok(Probe::Missing) => None,
            Err(e) => {
                warn!("skipping package while locating {library}: {e}");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipPackageReader;
    use crate::library_name::LibraryNaming;
    use crate::test_utils::{PackageBuilder, corrupt_payload, write_garbage_package};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const LIB: &str = "libwg-go.so";

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn abis(names: &[&str]) -> Vec<Architecture> {
        names
            .iter()
            .map(|name| Architecture::try_from(*name).expect("valid architecture"))
            .collect()
    }

    fn wg_go() -> LibraryName {
        LibraryName::try_from("wg-go").expect("valid name")
    }

    fn platform(packages: Vec<PathBuf>, architectures: &[&str]) -> Platform {
        Platform::new(packages, abis(architectures)).with_naming(LibraryNaming::ELF)
    }

    fn extracted(outcome: Extraction) -> ExtractedEntry {
        match outcome {
            Extraction::Extracted(entry) => entry,
            Extraction::NotFound { probed } => panic!("expected a match, probed {probed}"),
        }
    }

    #[rstest]
    fn architecture_preference_beats_package_precedence(dir: TempDir) {
        let primary = PackageBuilder::new()
            .library("armeabi-v7a", LIB, b"v7a from primary")
            .write_to(&dir.path().join("base.apk"))
            .expect("write primary");
        let split = PackageBuilder::new()
            .library("arm64-v8a", LIB, b"v8a from split")
            .write_to(&dir.path().join("split.apk"))
            .expect("write split");
        let destination = dir.path().join("out.so");

        let entry = extracted(
            extract(
                &platform(vec![primary, split.clone()], &["arm64-v8a", "armeabi-v7a"]),
                &ZipPackageReader,
                &wg_go(),
                &destination,
            )
            .expect("extract"),
        );

        assert_eq!(entry.package, split);
        assert_eq!(entry.architecture.as_str(), "arm64-v8a");
        assert_eq!(std::fs::read(&destination).expect("read"), b"v8a from split");
    }

    #[rstest]
    fn primary_package_wins_for_same_architecture(dir: TempDir) {
        let primary = PackageBuilder::new()
            .library("x86_64", LIB, b"primary")
            .write_to(&dir.path().join("base.apk"))
            .expect("write primary");
        let split = PackageBuilder::new()
            .library("x86_64", LIB, b"split")
            .write_to(&dir.path().join("split.apk"))
            .expect("write split");
        let destination = dir.path().join("out.so");

        let entry = extracted(
            extract(
                &platform(vec![primary.clone(), split], &["x86_64"]),
                &ZipPackageReader,
                &wg_go(),
                &destination,
            )
            .expect("extract"),
        );

        assert_eq!(entry.package, primary);
        assert_eq!(entry.bytes, 7);
    }

    #[rstest]
    #[case::garbage(true)]
    #[case::missing(false)]
    fn unreadable_package_is_skipped(dir: TempDir, #[case] exists: bool) {
        let broken = dir.path().join("broken.apk");
        if exists {
            write_garbage_package(&broken).expect("write garbage");
        }
        let good = PackageBuilder::new()
            .library("x86", LIB, b"good")
            .write_to(&dir.path().join("good.apk"))
            .expect("write good");
        let destination = dir.path().join("out.so");

        let entry = extracted(
            extract(
                &platform(vec![broken, good.clone()], &["x86"]),
                &ZipPackageReader,
                &wg_go(),
                &destination,
            )
            .expect("extract"),
        );

        assert_eq!(entry.package, good);
        assert_eq!(std::fs::read(&destination).expect("read"), b"good");
    }

    #[rstest]
    fn corrupt_entry_falls_through_without_residue(dir: TempDir) {
        let corrupt = PackageBuilder::new()
            .library("x86", LIB, b"CORRUPTED-PAYLOAD-THAT-IS-LONGER")
            .write_to(&dir.path().join("corrupt.apk"))
            .expect("write corrupt");
        corrupt_payload(&corrupt, b"CORRUPTED-PAYLOAD").expect("corrupt entry");
        let good = PackageBuilder::new()
            .library("x86", LIB, b"short")
            .write_to(&dir.path().join("good.apk"))
            .expect("write good");
        let destination = dir.path().join("out.so");

        let entry = extracted(
            extract(
                &platform(vec![corrupt, good.clone()], &["x86"]),
                &ZipPackageReader,
                &wg_go(),
                &destination,
            )
            .expect("extract"),
        );

        assert_eq!(entry.package, good);
        assert_eq!(std::fs::read(&destination).expect("read"), b"short");
    }

    #[rstest]
    fn not_found_leaves_no_destination(dir: TempDir) {
        let package = PackageBuilder::new()
            .library("mips", LIB, b"wrong abi")
            .entry("lib/x86/libother.so", b"wrong library")
            .write_to(&dir.path().join("base.apk"))
            .expect("write package");
        let destination = dir.path().join("out.so");

        let outcome = extract(
            &platform(vec![package], &["x86_64", "x86"]),
            &ZipPackageReader,
            &wg_go(),
            &destination,
        )
        .expect("extract");

        assert_eq!(outcome, Extraction::NotFound { probed: 2 });
        assert!(!destination.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind");
    }

    #[rstest]
    fn empty_inputs_probe_nothing(dir: TempDir) {
        let destination = dir.path().join("out.so");
        let outcome = extract(
            &platform(Vec::new(), &["x86"]),
            &ZipPackageReader,
            &wg_go(),
            &destination,
        )
        .expect("extract");
        assert_eq!(outcome, Extraction::NotFound { probed: 0 });
    }

    #[rstest]
    fn overwrite_replaces_longer_previous_file(dir: TempDir) {
        let package = PackageBuilder::new()
            .library("x86", LIB, b"new")
            .write_to(&dir.path().join("base.apk"))
            .expect("write package");
        let destination = dir.path().join("out.so");
        std::fs::write(&destination, b"a much longer previous library image").expect("seed");

        let platform = platform(vec![package], &["x86"]);
        for _ in 0..2 {
            extracted(
                extract(&platform, &ZipPackageReader, &wg_go(), &destination).expect("extract"),
            );
            assert_eq!(std::fs::read(&destination).expect("read"), b"new");
        }
    }

    #[rstest]
    fn directory_destination_is_rejected(dir: TempDir) {
        let err = extract(
            &platform(Vec::new(), &["x86"]),
            &ZipPackageReader,
            &wg_go(),
            dir.path(),
        )
        .expect_err("directory destination");
        assert!(matches!(err, LoaderError::DestinationIsDirectory { .. }));
    }

    #[rstest]
    fn unwritable_destination_directory_is_an_io_failure(dir: TempDir) {
        let package = PackageBuilder::new()
            .library("x86", LIB, b"bytes")
            .write_to(&dir.path().join("base.apk"))
            .expect("write package");
        let destination = dir.path().join("missing-dir").join("out.so");

        let err = extract(
            &platform(vec![package], &["x86"]),
            &ZipPackageReader,
            &wg_go(),
            &destination,
        )
        .expect_err("parent does not exist");
        assert!(
            matches!(
                err,
                LoaderError::ExtractionIo { ref entry, .. } if entry == "lib/x86/libwg-go.so"
            ),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn locate_follows_extraction_order(dir: TempDir) {
        let primary = PackageBuilder::new()
            .library("x86", LIB, b"x86")
            .write_to(&dir.path().join("base.apk"))
            .expect("write primary");
        let broken = dir.path().join("broken.apk");
        write_garbage_package(&broken).expect("write garbage");
        let split = PackageBuilder::new()
            .library("x86_64", LIB, b"x86_64")
            .write_to(&dir.path().join("split.apk"))
            .expect("write split");

        let located = locate(
            &platform(vec![primary, broken, split.clone()], &["x86_64", "x86"]),
            &ZipPackageReader,
            &wg_go(),
        )
        .expect("located");

        assert_eq!(located.package, split);
        assert_eq!(located.entry.as_str(), "lib/x86_64/libwg-go.so");
        assert!(!dir.path().join("out.so").exists());
    }

    #[rstest]
    fn locate_skips_corrupt_entry_like_extract(dir: TempDir) {
        let corrupt = PackageBuilder::new()
            .library("x86", LIB, b"CORRUPTED-PAYLOAD-THAT-IS-LONGER")
            .write_to(&dir.path().join("corrupt.apk"))
            .expect("write corrupt");
        corrupt_payload(&corrupt, b"CORRUPTED-PAYLOAD").expect("corrupt entry");
        let good = PackageBuilder::new()
            .library("x86", LIB, b"good")
            .write_to(&dir.path().join("good.apk"))
            .expect("write good");
        let platform = platform(vec![corrupt, good.clone()], &["x86"]);

        let located = locate(&platform, &ZipPackageReader, &wg_go()).expect("located");
        let entry = extracted(
            extract(
                &platform,
                &ZipPackageReader,
                &wg_go(),
                &dir.path().join("out.so"),
            )
            .expect("extract"),
        );

        assert_eq!(located.package, good);
        assert_eq!(located.package, entry.package);
        assert_eq!(located.architecture, entry.architecture);
    }

    #[rstest]
    fn locate_ignores_directory_entries(dir: TempDir) {
        let primary = PackageBuilder::new()
            .directory("lib/x86/libwg-go.so/")
            .write_to(&dir.path().join("base.apk"))
            .expect("write primary");
        let split = PackageBuilder::new()
            .library("x86", LIB, b"x86")
            .write_to(&dir.path().join("split.apk"))
            .expect("write split");

        let located = locate(
            &platform(vec![primary, split.clone()], &["x86"]),
            &ZipPackageReader,
            &wg_go(),
        )
        .expect("located");

        assert_eq!(located.package, split);
    }

    #[rstest]
    fn locate_reports_absence(dir: TempDir) {
        let package = PackageBuilder::new()
            .write_to(&dir.path().join("base.apk"))
            .expect("write package");
        assert!(
            locate(
                &platform(vec![package], &["x86"]),
                &ZipPackageReader,
                &wg_go()
            )
            .is_none()
        );
    }
}
