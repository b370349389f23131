//! Shared helpers for loader integration tests.

use std::path::{Path, PathBuf};

/// Distinct payload for a library built for `abi`.
pub fn build_of(abi: &str) -> Vec<u8> {
    format!("ELF image built for {abi}").into_bytes()
}

/// Files directly inside `dir`; empty when the directory does not exist.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .collect()
        })
        .unwrap_or_default()
}
