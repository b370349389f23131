//! Native loader CLI entrypoint.
//!
//! Loads, extracts, or locates a native library using packages and
//! architectures from a configuration file and command-line flags. Logging
//! defaults to warnings; `-v`, `-q`, and `RUST_LOG` adjust it.

use clap::Parser;
use std::io::Write;

use native_loader_cli::cli::Cli;
use native_loader_cli::commands::run;
use native_loader_cli::error::Result;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.options.log_level())
        .parse_default_env()
        .init();

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                write_stderr_line(stderr, format_args!("  caused by: {cause}"));
                source = cause.source();
            }
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}
