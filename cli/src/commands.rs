//! Subcommand execution.
//!
//! Commands report their result on `stdout`; diagnostics go through the
//! `log` facade so `-v`/`-q` and `RUST_LOG` control them independently.

use std::io::Write;

use native_loader::dirs::SystemBaseDirs;
use native_loader::extraction::Extraction;
use native_loader::{LibraryName, LoadOutcome, Loader, LoaderError};

use crate::cli::{Cli, Command, ExtractArgs};
use crate::error::Result;

/// Resolve configuration for `cli` and run its subcommand.
///
/// # Errors
///
/// Returns an error when configuration is invalid, the command fails, or
/// its result cannot be written.
pub fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let config = cli.options.resolve_config()?;
    let loader = Loader::from_config(&config, &SystemBaseDirs)?;
    execute(&cli.command, &loader, stdout)
}

/// Run `command` against an already configured loader.
///
/// # Errors
///
/// Returns an error when the command fails or its result cannot be written.
pub fn execute(command: &Command, loader: &Loader, stdout: &mut dyn Write) -> Result<()> {
    match command {
        Command::Load(args) => load(loader, &args.name, stdout),
        Command::Extract(args) => extract(loader, args, stdout),
        Command::Locate(args) => locate(loader, &args.name, stdout),
    }
}

fn load(loader: &Loader, name: &str, stdout: &mut dyn Write) -> Result<()> {
    match loader.load_name(name)? {
        LoadOutcome::Linked => writeln!(stdout, "linked {name}")?,
        LoadOutcome::Extracted(entry) => writeln!(
            stdout,
            "extracted {name} from {} ({})",
            entry.package.display(),
            entry.architecture
        )?,
    }
    Ok(())
}

fn extract(loader: &Loader, args: &ExtractArgs, stdout: &mut dyn Write) -> Result<()> {
    let library = LibraryName::try_from(args.name.as_str())?;
    match loader.extract(&library, args.destination.as_std_path())? {
        Extraction::Extracted(entry) => writeln!(
            stdout,
            "extracted {}:/{} to {} ({} bytes)",
            entry.package.display(),
            entry.entry,
            args.destination,
            entry.bytes
        )?,
        Extraction::NotFound { probed } => {
            return Err(not_found(loader, &library, probed).into());
        }
    }
    Ok(())
}

fn locate(loader: &Loader, name: &str, stdout: &mut dyn Write) -> Result<()> {
    let library = LibraryName::try_from(name)?;
    let Some(located) = loader.locate(&library) else {
        let probed = loader.platform().search_order().count();
        return Err(not_found(loader, &library, probed).into());
    };
    writeln!(
        stdout,
        "{}:/{} ({})",
        located.package.display(),
        located.entry,
        located.architecture
    )?;
    Ok(())
}

fn not_found(loader: &Loader, library: &LibraryName, probed: usize) -> LoaderError {
    LoaderError::NotFoundInArchives {
        library: loader.platform().library_file_name(library).to_string(),
        probed,
    }
}
