//! An interactive shell: raw-mode line editing, pipeline parsing, search-path
//! resolution and process execution, plus the bundled analysis commands.
//!
//! The crate is organized the way the REPL flows: [`editor`] reads a line,
//! [`parser`] turns it into a [`command::Command`] chain, and
//! [`executor::Executor`] expands that chain into child processes, with
//! [`complete`] and [`registry`] backing tab completion. The private modules
//! host the commands the shell answers itself and the process-tree renderer
//! behind the `psvis` builtin.

mod builtin;
pub mod command;
pub mod complete;
pub mod editor;
pub mod executor;
pub mod parser;
pub mod registry;
mod tree;

/// Name the shell reports itself as in prompts and error messages.
pub const SYSNAME: &str = "hshell";

/// Just a convenient re-export of the command runner.
///
/// See [`executor::Executor`] for the high-level API.
pub use executor::Executor;
