//! Library names and their platform-specific file name decoration.
//!
//! A [`LibraryName`] is the platform-neutral identifier callers ask for
//! (`wg-go`). The file that actually sits on disk or inside a package is
//! the decorated [`PlatformLibraryName`] (`libwg-go.so`), produced by a
//! [`LibraryNaming`] convention.

use std::fmt;

use crate::error::{LoaderError, Result};

/// A validated, platform-neutral library identifier.
///
/// # Examples
///
/// ```
/// use native_loader::library_name::LibraryName;
///
/// let name = LibraryName::try_from("wg-go").expect("valid library name");
/// assert_eq!(name.as_str(), "wg-go");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryName(String);

impl LibraryName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Err("name must not be empty");
    }
    if value == "." || value == ".." {
        return Err("name must not be a relative directory reference");
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')))
    {
        return Err(if bad == '/' || bad == '\\' {
            "name must not contain path separators"
        } else {
            "name may only contain ASCII letters, digits, '_', '-', '.' and '+'"
        });
    }
    Ok(())
}

impl TryFrom<&str> for LibraryName {
    type Error = LoaderError;

    fn try_from(value: &str) -> Result<Self> {
        validate(value).map_err(|reason| LoaderError::InvalidLibraryName {
            name: value.to_owned(),
            reason,
        })?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for LibraryName {
    type Error = LoaderError;

    fn try_from(value: String) -> Result<Self> {
        match validate(&value) {
            Ok(()) => Ok(Self(value)),
            Err(reason) => Err(LoaderError::InvalidLibraryName {
                name: value,
                reason,
            }),
        }
    }
}

impl AsRef<str> for LibraryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A library name decorated with a platform's prefix and suffix.
///
/// Only produced by [`LibraryNaming::decorate`], so it always reflects the
/// convention that was in effect when it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformLibraryName(String);

impl PlatformLibraryName {
    /// Return the file name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PlatformLibraryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformLibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared library file naming convention for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryNaming {
    prefix: &'static str,
    suffix: &'static str,
}

impl LibraryNaming {
    /// ELF platforms: `lib<name>.so`.
    pub const ELF: Self = Self {
        prefix: "lib",
        suffix: ".so",
    };

    /// Apple platforms: `lib<name>.dylib`.
    pub const DARWIN: Self = Self {
        prefix: "lib",
        suffix: ".dylib",
    };

    /// Windows: `<name>.dll`.
    pub const WINDOWS: Self = Self {
        prefix: "",
        suffix: ".dll",
    };

    /// Return the convention of the platform this crate was compiled for.
    #[must_use]
    pub const fn host() -> Self {
        #[cfg(target_os = "windows")]
        {
            Self::WINDOWS
        }
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        {
            Self::DARWIN
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "ios")))]
        {
            Self::ELF
        }
    }

    /// Return the convention for a target triple or OS name at runtime.
    ///
    /// Unlike [`LibraryNaming::host`], this inspects the string, so packages
    /// built for another platform can be searched.
    ///
    /// # Examples
    ///
    /// ```
    /// use native_loader::library_name::LibraryNaming;
    ///
    /// assert_eq!(LibraryNaming::for_target("aarch64-linux-android"), LibraryNaming::ELF);
    /// assert_eq!(LibraryNaming::for_target("x86_64-pc-windows-msvc"), LibraryNaming::WINDOWS);
    /// ```
    #[must_use]
    pub fn for_target(target: &str) -> Self {
        if target.contains("windows") {
            Self::WINDOWS
        } else if ["darwin", "macos", "ios"].iter().any(|os| target.contains(os)) {
            Self::DARWIN
        } else {
            Self::ELF
        }
    }

    /// File name prefix (`lib` or empty).
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// File name suffix including the leading dot.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Decorate a library name with this convention.
    ///
    /// # Examples
    ///
    /// ```
    /// use native_loader::library_name::{LibraryName, LibraryNaming};
    ///
    /// let name = LibraryName::try_from("wg-go").expect("valid");
    /// assert_eq!(LibraryNaming::ELF.decorate(&name).as_str(), "libwg-go.so");
    /// ```
    #[must_use]
    pub fn decorate(&self, name: &LibraryName) -> PlatformLibraryName {
        PlatformLibraryName(format!("{}{}{}", self.prefix, name.as_str(), self.suffix))
    }
}

impl Default for LibraryNaming {
    fn default() -> Self {
        Self::host()
    }
}
