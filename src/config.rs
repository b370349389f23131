//! Loader configuration backed by TOML.
//!
//! Embedders that cannot query package locations at runtime describe them
//! in a small TOML file instead:
//!
//! ```toml
//! packages = ["/data/app/base.apk", "/data/app/split_config.arm64_v8a.apk"]
//! architectures = ["arm64-v8a", "armeabi-v7a"]
//! temp_dir = "/data/data/com.example/code_cache"
//! target = "aarch64-linux-android"
//! ```
//!
//! Every key is optional. Omitted architectures fall back to the host
//! preference list, an omitted target to the host naming convention, and
//! an omitted temporary directory to [`crate::dirs::code_cache_dir`].

use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::architecture::{Architecture, host_architectures};
use crate::dirs::{BaseDirs, code_cache_dir};
use crate::error::Result;
use crate::library_name::LibraryNaming;
use crate::platform::Platform;

/// Errors from reading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unknown keys.
    #[error("invalid configuration {origin}: {reason}")]
    Parse {
        /// Where the configuration came from.
        origin: String,
        /// Description of the parse error.
        reason: String,
    },
}

/// Package, architecture, and directory settings for a [`crate::loader::Loader`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Candidate packages, primary first.
    pub packages: Vec<Utf8PathBuf>,
    /// Architecture preference list. `None` uses the host list.
    pub architectures: Option<Vec<String>>,
    /// Directory for temporary library files.
    pub temp_dir: Option<Utf8PathBuf>,
    /// Target triple or OS name selecting the file naming convention.
    pub target: Option<String>,
}

impl LoaderConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, wrongly typed
    /// values, or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use native_loader::config::LoaderConfig;
    ///
    /// let config = LoaderConfig::from_toml_str(r#"packages = ["base.apk"]"#)?;
    /// assert_eq!(config.packages.len(), 1);
    /// assert!(config.architectures.is_none());
    /// # Ok::<(), native_loader::config::ConfigError>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        Self::parse(contents, "<inline>")
    }

    /// Read and parse configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are invalid.
    pub fn load_from_path(path: &Utf8Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents, path.as_str())
    }

    fn parse(contents: &str, origin: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            origin: origin.to_owned(),
            reason: e.to_string(),
        })
    }

    /// The naming convention selected by `target`, or the host convention.
    #[must_use]
    pub fn naming(&self) -> LibraryNaming {
        self.target
            .as_deref()
            .map_or_else(LibraryNaming::host, LibraryNaming::for_target)
    }

    /// Build the [`Platform`] described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LoaderError::InvalidArchitecture`] if a
    /// configured architecture cannot be used as a path segment.
    pub fn platform(&self) -> Result<Platform> {
        let architectures = match &self.architectures {
            Some(names) => names
                .iter()
                .map(|name| Architecture::try_from(name.as_str()))
                .collect::<Result<Vec<_>>>()?,
            None => host_architectures(),
        };
        let packages = self
            .packages
            .iter()
            .map(|package| package.clone().into_std_path_buf())
            .collect();
        Ok(Platform::new(packages, architectures).with_naming(self.naming()))
    }

    /// The configured temporary directory, or the default code cache.
    #[must_use]
    pub fn temp_dir(&self, dirs: &dyn BaseDirs) -> PathBuf {
        self.temp_dir.as_ref().map_or_else(
            || code_cache_dir(dirs),
            |dir| dir.clone().into_std_path_buf(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use crate::error::LoaderError;
    use rstest::rstest;

    #[test]
    fn empty_config_uses_host_defaults() {
        let config = LoaderConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, LoaderConfig::default());

        let platform = config.platform().expect("platform");
        assert!(platform.packages().is_empty());
        assert_eq!(platform.architectures(), host_architectures().as_slice());
        assert_eq!(platform.naming(), LibraryNaming::host());
    }

    #[test]
    fn full_config_round_trips_into_platform() {
        let config = LoaderConfig::from_toml_str(
            r#"
            packages = ["/data/app/base.apk", "/data/app/split.apk"]
            architectures = ["arm64-v8a", "armeabi-v7a"]
            temp_dir = "/data/data/app/code_cache"
            target = "x86_64-pc-windows-msvc"
            "#,
        )
        .expect("config parses");

        let platform = config.platform().expect("platform");
        assert_eq!(
            platform.packages(),
            [
                PathBuf::from("/data/app/base.apk"),
                PathBuf::from("/data/app/split.apk")
            ]
        );
        let abis: Vec<_> = platform.architectures().iter().map(Architecture::as_str).collect();
        assert_eq!(abis, ["arm64-v8a", "armeabi-v7a"]);
        assert_eq!(platform.naming(), LibraryNaming::WINDOWS);

        let dirs = MockBaseDirs::new();
        assert_eq!(config.temp_dir(&dirs), PathBuf::from("/data/data/app/code_cache"));
    }

    #[rstest]
    #[case::unknown_key("package = [\"base.apk\"]")]
    #[case::wrong_type("packages = \"base.apk\"")]
    #[case::malformed("packages = [")]
    fn rejects_invalid_config(#[case] contents: &str) {
        let err = LoaderConfig::from_toml_str(contents).expect_err("invalid config");
        assert!(matches!(err, ConfigError::Parse { ref origin, .. } if origin == "<inline>"));
    }

    #[test]
    fn invalid_architecture_is_reported() {
        let config = LoaderConfig {
            architectures: Some(vec!["../x86".to_owned()]),
            ..LoaderConfig::default()
        };
        let err = config.platform().expect_err("invalid architecture");
        assert!(matches!(err, LoaderError::InvalidArchitecture { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("absent.toml")).expect("UTF-8 path");
        let err = LoaderConfig::load_from_path(&path).expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_path_reports_file_in_parse_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("loader.toml")).expect("UTF-8 path");
        std::fs::write(&path, "bogus = true").expect("write config");

        let err = LoaderConfig::load_from_path(&path).expect_err("unknown key");
        assert!(err.to_string().contains("loader.toml"));
    }

    #[test]
    fn temp_dir_defaults_to_code_cache() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_cache_dir()
            .returning(|| Some(PathBuf::from("/cache/native-loader")));
        assert_eq!(
            LoaderConfig::default().temp_dir(&dirs),
            PathBuf::from("/cache/native-loader/code_cache")
        );
    }
}
