//! Directory resolution for temporary library files.
//!
//! Libraries extracted by [`crate::loader::Loader::load`] live only for the
//! duration of the call, but they still need a directory the process can
//! write to and map executable code from. This module abstracts the lookup
//! so it can be mocked.

use std::path::PathBuf;

use directories_next::ProjectDirs;

/// Source of platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Per-user cache directory for this crate, if the platform has one.
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        ProjectDirs::from("", "", "native-loader").map(|dirs| dirs.cache_dir().to_path_buf())
    }
}

/// Return the directory temporary library files are created in.
///
/// This is `<cache_dir>/code_cache` when the platform reports a cache
/// directory, and the system temporary directory otherwise. The directory
/// is not created here.
#[must_use]
pub fn code_cache_dir(dirs: &dyn BaseDirs) -> PathBuf {
    dirs.cache_dir()
        .map_or_else(std::env::temp_dir, |cache| cache.join("code_cache"))
}
