//! Processor architecture identifiers used to select a binary variant.
//!
//! Packages lay native libraries out under `lib/<architecture>/`, using the
//! Android ABI names (`arm64-v8a`, `armeabi-v7a`, `x86_64`, `x86`).

use std::fmt;

use crate::error::{LoaderError, Result};

/// A validated architecture identifier, safe to use as an archive path segment.
///
/// # Examples
///
/// ```
/// use native_loader::architecture::Architecture;
///
/// let abi = Architecture::try_from("arm64-v8a").expect("valid architecture");
/// assert_eq!(abi.as_str(), "arm64-v8a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Architecture(String);

impl Architecture {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Err("architecture must not be empty");
    }
    if value.contains(['/', '\\']) {
        return Err("architecture must not contain path separators");
    }
    if value.contains("..") {
        return Err("architecture must not contain '..'");
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("architecture must not contain whitespace or control characters");
    }
    Ok(())
}

impl TryFrom<&str> for Architecture {
    type Error = LoaderError;

    fn try_from(value: &str) -> Result<Self> {
        validate(value).map_err(|reason| LoaderError::InvalidArchitecture {
            value: value.to_owned(),
            reason,
        })?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Architecture {
    type Error = LoaderError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Architecture {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ABI names the compiling target can execute, most preferred first.
const fn host_abi_names() -> &'static [&'static str] {
    #[cfg(target_arch = "aarch64")]
    {
        &["arm64-v8a", "armeabi-v7a", "armeabi"]
    }
    #[cfg(target_arch = "arm")]
    {
        &["armeabi-v7a", "armeabi"]
    }
    #[cfg(target_arch = "x86_64")]
    {
        &["x86_64", "x86"]
    }
    #[cfg(target_arch = "x86")]
    {
        &["x86"]
    }
    #[cfg(target_arch = "riscv64")]
    {
        &["riscv64"]
    }
    #[cfg(not(any(
        target_arch = "aarch64",
        target_arch = "arm",
        target_arch = "x86_64",
        target_arch = "x86",
        target_arch = "riscv64"
    )))]
    {
        &[]
    }
}

/// Return the architectures the host can run, in preference order.
///
/// Used when no explicit architecture list is configured. The list mirrors
/// the order a device reports for its supported ABIs: 64-bit variants before
/// the 32-bit ones they can also execute.
#[must_use]
pub fn host_architectures() -> Vec<Architecture> {
    host_abi_names()
        .iter()
        .map(|name| Architecture((*name).to_owned()))
        .collect()
}
