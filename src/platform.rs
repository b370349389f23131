//! Platform inputs for archive resolution.
//!
//! The package list, the architecture preference list and the file naming
//! convention are supplied by whoever embeds the loader. Nothing here reads
//! ambient global state, so the search order can be exercised with
//! synthetic inputs.

use std::path::{Path, PathBuf};

use crate::architecture::{Architecture, host_architectures};
use crate::library_name::{LibraryName, LibraryNaming, PlatformLibraryName};

/// Ordered candidate packages, ordered architectures, and naming convention.
///
/// Package order is precedence order: the primary package comes first,
/// followed by auxiliary (split) packages in the order the platform reports
/// them. Architecture order is preference order.
///
/// # Examples
///
/// ```
/// use native_loader::architecture::Architecture;
/// use native_loader::platform::Platform;
///
/// let abi = Architecture::try_from("arm64-v8a").expect("valid");
/// let platform = Platform::new(vec!["/data/app/base.apk".into()], vec![abi]);
/// assert_eq!(platform.packages().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    packages: Vec<PathBuf>,
    architectures: Vec<Architecture>,
    naming: LibraryNaming,
}

impl Platform {
    /// Create a platform description using the host naming convention.
    #[must_use]
    pub fn new(packages: Vec<PathBuf>, architectures: Vec<Architecture>) -> Self {
        Self {
            packages,
            architectures,
            naming: LibraryNaming::host(),
        }
    }

    /// Create a platform description for the host's own architectures.
    #[must_use]
    pub fn host(packages: Vec<PathBuf>) -> Self {
        Self::new(packages, host_architectures())
    }

    /// Replace the naming convention.
    #[must_use]
    pub fn with_naming(mut self, naming: LibraryNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Candidate packages in precedence order.
    #[must_use]
    pub fn packages(&self) -> &[PathBuf] {
        &self.packages
    }

    /// Architectures in preference order.
    #[must_use]
    pub fn architectures(&self) -> &[Architecture] {
        &self.architectures
    }

    /// The file naming convention.
    #[must_use]
    pub fn naming(&self) -> LibraryNaming {
        self.naming
    }

    /// Decorate a library name with this platform's convention.
    #[must_use]
    pub fn library_file_name(&self, name: &LibraryName) -> PlatformLibraryName {
        self.naming.decorate(name)
    }

    /// Iterate `(architecture, package)` pairs in search order.
    ///
    /// Architectures form the outer loop: a preferred architecture found in
    /// an auxiliary package wins over a less preferred one in the primary
    /// package.
    pub fn search_order(&self) -> impl Iterator<Item = (&Architecture, &Path)> + '_ {
        self.architectures.iter().flat_map(move |architecture| {
            self.packages
                .iter()
                .map(move |package| (architecture, package.as_path()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi(name: &str) -> Architecture {
        Architecture::try_from(name).expect("valid architecture")
    }

    #[test]
    fn search_order_is_architecture_major() {
        let platform = Platform::new(
            vec![PathBuf::from("base.apk"), PathBuf::from("split.apk")],
            vec![abi("arm64-v8a"), abi("armeabi-v7a")],
        );

        let order: Vec<_> = platform
            .search_order()
            .map(|(architecture, package)| {
                format!("{architecture}:{}", package.display())
            })
            .collect();

        assert_eq!(
            order,
            [
                "arm64-v8a:base.apk",
                "arm64-v8a:split.apk",
                "armeabi-v7a:base.apk",
                "armeabi-v7a:split.apk",
            ]
        );
    }

    #[test]
    fn empty_inputs_yield_no_pairs() {
        let platform = Platform::new(Vec::new(), vec![abi("x86")]);
        assert_eq!(platform.search_order().count(), 0);

        let platform = Platform::new(vec![PathBuf::from("base.apk")], Vec::new());
        assert_eq!(platform.search_order().count(), 0);
    }

    #[test]
    fn with_naming_changes_file_name() {
        let name = LibraryName::try_from("wg-go").expect("valid");
        let platform = Platform::new(Vec::new(), Vec::new()).with_naming(LibraryNaming::WINDOWS);
        assert_eq!(platform.library_file_name(&name).as_str(), "wg-go.dll");
    }
}
