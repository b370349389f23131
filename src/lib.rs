//! Native library loader with package extraction fallback.
//!
//! This crate makes a shared library available to the running process even
//! when the platform's standard search path does not contain it. The
//! library is first loaded by name; if that fails, it is located inside one
//! of the application's bundled zip packages under
//! `lib/<architecture>/<file>`, extracted to a private temporary file, and
//! loaded from there.
//!
//! ```no_run
//! use native_loader::loader::Loader;
//! use native_loader::platform::Platform;
//!
//! let platform = Platform::host(vec![
//!     "/data/app/base.apk".into(),
//!     "/data/app/split_config.arm64_v8a.apk".into(),
//! ]);
//! let loader = Loader::new(platform, "/data/data/com.example/code_cache".into());
//! loader.load_name("wg-go")?;
//! # Ok::<(), native_loader::error::LoaderError>(())
//! ```
//!
//! # Modules
//!
//! - [`architecture`] - Architecture identifiers and host preference order
//! - [`archive`] - Single-entry probes against zip packages
//! - [`config`] - TOML configuration for embedders and the CLI
//! - [`dirs`] - Default directory for temporary library files
//! - [`dynamic`] - Dynamic loading capability and the OS implementation
//! - [`error`] - Error taxonomy
//! - [`extraction`] - Architecture-major search and atomic extraction
//! - [`library_name`] - Library names and platform file name decoration
//! - [`loader`] - Fast path, fallback, and temporary file lifecycle
//! - [`platform`] - Injected package and architecture ordering

pub mod architecture;
pub mod archive;
pub mod config;
pub mod dirs;
pub mod dynamic;
pub mod error;
pub mod extraction;
pub mod library_name;
pub mod loader;
pub mod platform;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{LoaderError, Result};
pub use library_name::LibraryName;
pub use loader::{LoadOutcome, Loader};
