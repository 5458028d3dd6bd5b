//! Command dispatch: builtins, external programs, pipelines, background jobs.
//!
//! Every external command (and every pipeline stage) runs in its own child
//! process. The executor itself only blocks while waiting for a foreground
//! child; background children are recorded and reaped without blocking at the
//! start of each REPL iteration. All failures are reported here, at the point
//! of occurrence, and never outlive the current iteration.

use crate::builtin;
use crate::command::{Command, Outcome};
use crate::registry::is_executable;
use crate::SYSNAME;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Stdio};

/// Runs parsed commands and keeps track of unfinished background children.
#[derive(Debug, Default)]
pub struct Executor {
    jobs: Vec<Child>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one parsed line.
    pub fn execute(&mut self, cmd: Command) -> Outcome {
        if cmd.name.is_empty() {
            return Outcome::Success;
        }
        if cmd.name == "exit" {
            return Outcome::Exit;
        }
        if cmd.name == "cd" {
            change_dir(&cmd);
            return Outcome::Success;
        }

        let mut stdout = std::io::stdout();
        if let Some(result) = builtin::dispatch(&cmd.name, cmd.tail(), &mut stdout) {
            if let Err(e) = result {
                eprintln!("-{SYSNAME}: {}: {e:#}", cmd.name);
            }
            return Outcome::Success;
        }

        if cmd.next.is_some() {
            if let Err(e) = self.run_pipeline(cmd) {
                eprintln!("-{SYSNAME}: {e:#}");
            }
            return Outcome::Success;
        }

        let Some(path) = resolve(&search_path(), &cmd.name) else {
            eprintln!("-{SYSNAME}: {}: command not found", cmd.name);
            return Outcome::NotFound;
        };
        self.run_external(&cmd, &path)
    }

    fn run_external(&mut self, cmd: &Command, path: &Path) -> Outcome {
        let spawned = std::process::Command::new(path).args(cmd.tail()).spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                eprintln!("-{SYSNAME}: {}: {e}", cmd.name);
                return Outcome::Success;
            }
        };

        if cmd.background {
            self.jobs.push(child);
            return Outcome::Success;
        }
        if let Err(e) = child.wait() {
            eprintln!("-{SYSNAME}: {}: {e}", cmd.name);
        }
        Outcome::Success
    }

    /// Spawn every stage of the pipeline and wait for all of them.
    fn run_pipeline(&mut self, cmd: Command) -> Result<()> {
        let stages = resolve_stages(cmd)?;
        let mut children = spawn_stages(stages, Stdio::inherit())?;
        wait_all(&mut children)
    }

    /// Drop finished background children without blocking. Called once per
    /// REPL iteration and once at shutdown; whatever is still running is
    /// abandoned rather than killed.
    pub fn reap_background(&mut self) {
        self.jobs.retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    /// Number of background children not yet reaped.
    pub fn background_jobs(&self) -> usize {
        self.jobs.len()
    }
}

fn change_dir(cmd: &Command) {
    let Some(target) = cmd.args.get(1) else {
        eprintln!("-{SYSNAME}: cd: missing operand");
        return;
    };
    // A failed cd is reported but never fatal to the shell.
    if let Err(e) = env::set_current_dir(target) {
        eprintln!("-{SYSNAME}: cd: {e}");
    }
}

fn search_path() -> OsString {
    env::var_os("PATH").unwrap_or_default()
}

/// Resolve a command name the way the shell runs it: a name with a path
/// separator is taken as-is, anything else is searched for in each directory
/// of `search_paths`, first executable hit wins.
pub fn resolve(search_paths: &std::ffi::OsStr, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let path = Path::new(name);
    if path.components().count() > 1 {
        return is_executable(path).then(|| path.to_path_buf());
    }
    for dir in env::split_paths(search_paths) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// A pipeline stage ready to spawn.
struct Stage {
    path: PathBuf,
    args: Vec<String>,
}

/// Walk the chain and resolve every stage up front; a stage that cannot be
/// resolved fails the whole pipeline before anything is spawned.
fn resolve_stages(cmd: Command) -> Result<Vec<Stage>> {
    let search = search_path();
    let mut stages = Vec::new();
    let mut next = Some(Box::new(cmd));
    while let Some(stage) = next {
        let Command { name, args, next: tail, .. } = *stage;
        next = tail;
        // A blank stage (e.g. a trailing pipe) degrades to a no-op.
        if name.is_empty() {
            continue;
        }
        let path =
            resolve(&search, &name).ok_or_else(|| anyhow!("{name}: command not found"))?;
        stages.push(Stage { path, args });
    }
    Ok(stages)
}

/// Spawn the stages left to right, moving each child's stdout handle into the
/// next child's stdin so the parent retains no pipe ends. The last stage
/// writes to `last_stdout`.
fn spawn_stages(stages: Vec<Stage>, last_stdout: Stdio) -> Result<Vec<Child>> {
    let mut children: Vec<Child> = Vec::new();
    if stages.is_empty() {
        return Ok(children);
    }
    let mut upstream: Option<ChildStdout> = None;
    let last = stages.len() - 1;

    let mut last_stdout = Some(last_stdout);
    for (i, stage) in stages.into_iter().enumerate() {
        let mut pc = std::process::Command::new(&stage.path);
        pc.args(&stage.args[1..]);
        if let Some(out) = upstream.take() {
            pc.stdin(Stdio::from(out));
        }
        if i < last {
            pc.stdout(Stdio::piped());
        } else if let Some(stdout) = last_stdout.take() {
            pc.stdout(stdout);
        }

        match pc.spawn() {
            Ok(mut child) => {
                if i < last {
                    upstream = child.stdout.take();
                }
                children.push(child);
            }
            Err(e) => {
                // Nothing downstream was created; reap what already started.
                for mut child in children {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                return Err(e).with_context(|| {
                    format!("failed to spawn {}", stage.path.display())
                });
            }
        }
    }

    Ok(children)
}

/// Wait for every stage; the pipeline only returns once all of them exited.
fn wait_all(children: &mut [Child]) -> Result<()> {
    let mut first_err = None;
    for child in children.iter_mut() {
        if let Err(e) = child.wait() {
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        None => Ok(()),
        Some(e) => Err(e).context("waiting for pipeline stage"),
    }
}
