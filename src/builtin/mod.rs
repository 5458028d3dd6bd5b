//! Commands the shell answers itself.
//!
//! Each collaborator command parses its arguments with [`argh`] (`FromArgs`)
//! and runs in-process against a caller-supplied output stream, so the whole
//! set stays unit-testable. A malformed invocation prints argh's usage text
//! and counts as handled; the REPL continues either way.

mod hdiff;
mod psvis;
mod regression;
mod textify;

use crate::command::ExitCode;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;

/// Collaborator commands known to the shell at compile time.
pub(crate) trait Collaborator: Sized + FromArgs {
    /// Canonical name of the command, e.g. "hdiff".
    fn name() -> &'static str;

    /// Executes the command.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode>;
}

fn try_run<T: Collaborator>(
    name: &str,
    args: &[&str],
    stdout: &mut dyn Write,
) -> Option<Result<ExitCode>> {
    if name != T::name() {
        return None;
    }
    Some(match T::from_args(&[name], args) {
        Ok(cmd) => cmd.execute(stdout),
        Err(EarlyExit { output, status }) => match writeln!(stdout, "{}", output.trim_end()) {
            Ok(()) => Ok(if status.is_err() { 1 } else { 0 }),
            Err(e) => Err(e.into()),
        },
    })
}

/// Dispatch `name` to the collaborator claiming it, if any.
pub fn dispatch(name: &str, args: &[String], stdout: &mut dyn Write) -> Option<Result<ExitCode>> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    try_run::<hdiff::Hdiff>(name, &args, stdout)
        .or_else(|| try_run::<textify::Textify>(name, &args, stdout))
        .or_else(|| try_run::<regression::Regression>(name, &args, stdout))
        .or_else(|| try_run::<psvis::Psvis>(name, &args, stdout))
}
