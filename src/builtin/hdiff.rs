use super::Collaborator;
use crate::command::ExitCode;
use anyhow::{anyhow, bail, Result};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(FromArgs)]
/// Compare two text files line by line, or any two files byte by byte.
pub struct Hdiff {
    #[argh(switch, short = 'b')]
    /// compare raw bytes instead of text lines
    pub bytes: bool,

    #[argh(positional)]
    /// first file to compare
    pub left: String,

    #[argh(positional)]
    /// second file to compare
    pub right: String,
}

impl Collaborator for Hdiff {
    fn name() -> &'static str {
        "hdiff"
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode> {
        if self.bytes {
            self.diff_bytes(stdout)
        } else {
            self.diff_lines(stdout)
        }
    }
}

impl Hdiff {
    fn diff_lines(&self, stdout: &mut dyn Write) -> Result<ExitCode> {
        for name in [&self.left, &self.right] {
            if Path::new(name).extension().and_then(|e| e.to_str()) != Some("txt") {
                bail!("{name}: text mode compares .txt files only");
            }
        }

        let left = read(&self.left)?;
        let right = read(&self.right)?;

        let mut differing = 0usize;
        let mut left_lines = left.lines();
        let mut right_lines = right.lines();
        let mut line_num = 1usize;
        loop {
            let (a, b) = (left_lines.next(), right_lines.next());
            if a.is_none() && b.is_none() {
                break;
            }
            let (a, b) = (a.unwrap_or(""), b.unwrap_or(""));
            if a != b {
                differing += 1;
                writeln!(stdout, "{}: Line {}: {}", self.left, line_num, a)?;
                writeln!(stdout, "{}: Line {}: {}", self.right, line_num, b)?;
            }
            line_num += 1;
        }

        if differing == 0 {
            writeln!(stdout, "The two text files are identical")?;
            Ok(0)
        } else {
            writeln!(stdout, "{differing} different lines found")?;
            Ok(1)
        }
    }

    fn diff_bytes(&self, stdout: &mut dyn Write) -> Result<ExitCode> {
        let left = read_bytes(&self.left)?;
        let right = read_bytes(&self.right)?;

        let mismatched = left
            .iter()
            .zip(right.iter())
            .filter(|(a, b)| a != b)
            .count();
        // Length difference counts as differing bytes too.
        let differing = mismatched + left.len().abs_diff(right.len());

        if differing == 0 {
            writeln!(stdout, "The two files are identical")?;
            Ok(0)
        } else {
            writeln!(stdout, "The two files are different in {differing} bytes")?;
            Ok(1)
        }
    }
}

fn read(name: &str) -> Result<String> {
    fs::read_to_string(name).map_err(|e| anyhow!("{name}: {e}"))
}

fn read_bytes(name: &str) -> Result<Vec<u8>> {
    fs::read(name).map_err(|e| anyhow!("{name}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write file");
        path.display().to_string()
    }

    fn run(hdiff: Hdiff) -> (Result<ExitCode>, String) {
        let mut out = Vec::new();
        let result = hdiff.execute(&mut out);
        (result, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn identical_text_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = write_file(dir.path(), "a.txt", "one\ntwo\n");
        let right = write_file(dir.path(), "b.txt", "one\ntwo\n");

        let (result, out) = run(Hdiff { bytes: false, left, right });
        assert_eq!(result.expect("ok"), 0);
        assert!(out.contains("identical"));
    }

    #[test]
    fn differing_lines_are_printed_and_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = write_file(dir.path(), "a.txt", "one\ntwo\nthree\n");
        let right = write_file(dir.path(), "b.txt", "one\n2\nthree\nfour\n");

        let (result, out) = run(Hdiff { bytes: false, left: left.clone(), right });
        assert_eq!(result.expect("ok"), 1);
        assert!(out.contains(&format!("{left}: Line 2: two")));
        assert!(out.contains("2 different lines found"));
    }

    #[test]
    fn text_mode_rejects_non_txt_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = write_file(dir.path(), "a.bin", "data");
        let right = write_file(dir.path(), "b.txt", "data");

        let (result, _) = run(Hdiff { bytes: false, left, right });
        let err = result.err().expect("non-.txt input must be rejected");
        assert!(err.to_string().contains(".txt"));
    }

    #[test]
    fn byte_mode_counts_mismatches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = write_file(dir.path(), "a.bin", "abc");
        let right = write_file(dir.path(), "b.bin", "abd");

        let (result, out) = run(Hdiff { bytes: true, left, right });
        assert_eq!(result.expect("ok"), 1);
        assert!(out.contains("different in 1 bytes"));
    }

    #[test]
    fn byte_mode_adds_the_length_difference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = write_file(dir.path(), "a.bin", "abc");
        let right = write_file(dir.path(), "b.bin", "abcde");

        let (result, out) = run(Hdiff { bytes: true, left, right });
        assert_eq!(result.expect("ok"), 1);
        assert!(out.contains("different in 2 bytes"));
    }

    #[test]
    fn missing_file_is_a_reported_error() {
        let (result, _) = run(Hdiff {
            bytes: true,
            left: "/definitely/not/here".to_string(),
            right: "/also/not/here".to_string(),
        });
        assert!(result.is_err());
    }
}
