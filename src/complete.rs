//! Tab completion: classify what the trailing token refers to and list the
//! candidates for it.
//!
//! A single word still being typed completes as a command against the
//! registry. Once the line has an argument position (a trailing separator or
//! multiple tokens) the trailing token completes as a file or directory name
//! in the current working directory, unless it directly follows a `|`, which
//! starts a new pipeline stage and completes as a command again.

use crate::registry::CommandRegistry;
use std::fs;
use std::path::Path;

/// What the trailing token of the line should complete to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Command,
    Filename,
}

/// Candidates produced by one tab press, dropped right after being applied.
///
/// `matches` is sorted; the candidate count is its length. `partial` is the
/// token the candidates extend, so an editor can splice in the missing
/// suffix.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompletionResult {
    pub partial: String,
    pub matches: Vec<String>,
}

impl CompletionResult {
    /// The non-overlapping suffix to append when exactly one match exists.
    pub fn sole_suffix(&self) -> Option<&str> {
        match self.matches.as_slice() {
            [only] => only.strip_prefix(self.partial.as_str()),
            _ => None,
        }
    }
}

/// Decide the completion target for the line and extract the partial token.
pub fn classify(line: &str) -> (Target, String) {
    let ends_in_separator = line.chars().next_back().is_some_and(char::is_whitespace);
    let tokens: Vec<&str> = line.split_whitespace().collect();

    if ends_in_separator || tokens.is_empty() {
        return (Target::Filename, String::new());
    }
    if tokens.len() == 1 {
        return (Target::Command, tokens[0].to_string());
    }

    let last = tokens[tokens.len() - 1];
    let before = tokens[tokens.len() - 2];
    if before.ends_with('|') {
        // First word of a new pipeline stage.
        return (Target::Command, last.to_string());
    }
    (Target::Filename, last.to_string())
}

/// Produce the candidates for the current line buffer.
pub fn complete(line: &str, registry: &CommandRegistry) -> CompletionResult {
    let (target, partial) = classify(line);
    let matches = match target {
        Target::Command => registry.matching(&partial),
        Target::Filename => filename_matches(Path::new("."), &partial),
    };
    CompletionResult { partial, matches }
}

/// Directory entries of `dir` whose name starts with `partial`; directories
/// carry a trailing `/` so they read differently from plain files.
fn filename_matches(dir: &Path, partial: &str) -> Vec<String> {
    let mut matches = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(partial) {
                continue;
            }
            if entry.path().is_dir() {
                matches.push(format!("{name}/"));
            } else {
                matches.push(name);
            }
        }
    }
    matches.sort();
    matches
}
