use super::Collaborator;
use crate::command::ExitCode;
use crate::tree;
use anyhow::{anyhow, bail, Result};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Where the privileged kernel helper is expected to live.
const MODULE_PATH: &str = "module/psvis.ko";

#[derive(FromArgs)]
/// Visualize the child process tree of a root process using the psvis kernel
/// helper; writes <output>.txt (captured log) and <output>.png (the tree).
pub struct Psvis {
    #[argh(positional)]
    /// PID of the root process
    pub pid: i32,

    #[argh(positional)]
    /// output name, without extension
    pub output: String,
}

impl Collaborator for Psvis {
    fn name() -> &'static str {
        "psvis"
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode> {
        let pid_arg = format!("PID={}", self.pid);
        run_and_wait("sudo", &["insmod", MODULE_PATH, &pid_arg])?;
        run_and_wait("sudo", &["rmmod", "psvis"])?;

        // Drain the diagnostic log the helper printed while loaded.
        let log = capture("sudo", &["dmesg", "-c", "-H"])?;
        let stem = self.output.trim();
        let text_path = format!("{stem}.txt");
        fs::write(&text_path, &log).map_err(|e| anyhow!("{text_path}: {e}"))?;
        stdout.write_all(&log)?;

        let image_path = format!("{stem}.png");
        tree::render(Path::new(&text_path), Path::new(&image_path))?;
        Ok(0)
    }
}

/// Run a helper step with inherited stdio and fail on a non-zero exit.
fn run_and_wait(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| anyhow!("{program} {}: {e}", args.join(" ")))?;
    if !status.success() {
        bail!("{program} {} exited with {status}", args.join(" "));
    }
    Ok(())
}

/// Run a helper step and collect its standard output.
fn capture(program: &str, args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| anyhow!("{program} {}: {e}", args.join(" ")))?;
    if !output.status.success() {
        bail!("{program} {} exited with {}", args.join(" "), output.status);
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_failure_is_reported_with_the_step_name() {
        let err = run_and_wait("/definitely/not/a/binary", &["arg"])
            .err()
            .expect("missing binary must fail");
        assert!(err.to_string().contains("arg"));
    }

    #[test]
    fn capture_collects_standard_output() {
        let out = capture("echo", &["captured"]).expect("echo runs");
        assert_eq!(String::from_utf8_lossy(&out), "captured\n");
    }
}
