//! CLI argument definitions for the native loader.
//!
//! This module defines the command-line interface using clap. It is kept
//! separate from the entrypoint so that parsing and configuration overlay
//! can be tested without running a command.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use native_loader::config::LoaderConfig;
use native_loader::error::Result;

/// Load native libraries, falling back to bundled packages.
#[derive(Parser, Debug)]
#[command(name = "native-loader")]
#[command(version, about)]
#[command(long_about = concat!(
    "Load native libraries, falling back to bundled packages.\n\n",
    "A library is first loaded by name through the platform's standard search ",
    "path. When that fails, the configured packages are searched for ",
    "lib/<architecture>/<file>, preferring architectures in the order given, ",
    "and the first match is extracted to a temporary file and loaded from there.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Load a library, searching two packages:\n",
    "    $ native-loader -p base.apk -p split_config.arm64_v8a.apk load wg-go\n\n",
    "  Extract a library for a specific architecture:\n",
    "    $ native-loader -p base.apk -a arm64-v8a extract wg-go ./libwg-go.so\n\n",
    "  Show which package would be used:\n",
    "    $ native-loader -c loader.toml locate wg-go\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all subcommands.
    #[command(flatten)]
    pub options: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a library into this process (direct load, then package fallback).
    Load(LoadArgs),

    /// Extract a library from the packages without loading it.
    Extract(ExtractArgs),

    /// Show the package and architecture a library would be extracted from.
    Locate(LocateArgs),
}

/// Arguments for the load command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LoadArgs {
    /// Library name without platform prefix or suffix (e.g. `wg-go`).
    pub name: String,
}

/// Arguments for the extract command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ExtractArgs {
    /// Library name without platform prefix or suffix.
    pub name: String,

    /// File to write the library to; replaced if it exists.
    pub destination: Utf8PathBuf,
}

/// Arguments for the locate command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LocateArgs {
    /// Library name without platform prefix or suffix.
    pub name: String,
}

/// Options shared by all subcommands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Candidate package, appended after configured packages (repeatable).
    #[arg(short, long = "package", value_name = "PATH", global = true)]
    pub packages: Vec<Utf8PathBuf>,

    /// Architecture in preference order, replacing the configured list (repeatable).
    #[arg(short, long = "arch", value_name = "ABI", global = true)]
    pub architectures: Vec<String>,

    /// Directory for temporary library files.
    #[arg(long, value_name = "DIR", global = true)]
    pub temp_dir: Option<Utf8PathBuf>,

    /// Target triple selecting the library file naming convention.
    #[arg(long, value_name = "TRIPLE", global = true)]
    pub target: Option<String>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Read the configuration file, if any, and overlay command-line flags.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be read or parsed.
    pub fn resolve_config(&self) -> Result<LoaderConfig> {
        let base = match &self.config {
            Some(path) => LoaderConfig::load_from_path(path)?,
            None => LoaderConfig::default(),
        };
        Ok(self.overlay(base))
    }

    /// Apply command-line flags on top of `config`.
    #[must_use]
    pub fn overlay(&self, mut config: LoaderConfig) -> LoaderConfig {
        config.packages.extend(self.packages.iter().cloned());
        if !self.architectures.is_empty() {
            config.architectures = Some(self.architectures.clone());
        }
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if let Some(target) = &self.target {
            config.target = Some(target.clone());
        }
        config
    }

    /// Log level implied by `-q` and `-v` flags.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
