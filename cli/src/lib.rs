//! Command-line front end for the native loader.
//!
//! The `native-loader` binary exercises the library against real packages:
//! loading a library into its own process, extracting it to a chosen file,
//! or reporting which package and architecture it would come from.
//!
//! # Modules
//!
//! - [`cli`] - Argument parsing and configuration overlay
//! - [`commands`] - Subcommand execution
//! - [`error`] - CLI error type

pub mod cli;
pub mod commands;
pub mod error;
