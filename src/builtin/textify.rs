use super::Collaborator;
use crate::command::ExitCode;
use anyhow::{anyhow, bail, Result};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(FromArgs)]
/// Text statistics and word replacement over a file.
pub struct Textify {
    #[argh(positional)]
    /// file to analyze
    pub file: String,

    #[argh(switch)]
    /// count the alphanumeric characters in the file
    pub letters: bool,

    #[argh(switch)]
    /// count the whitespace-separated words in the file
    pub words: bool,

    #[argh(option)]
    /// count the occurrences of this exact word
    pub occurrences: Option<String>,

    #[argh(option)]
    /// word to replace; the result goes to <stem>-updated.txt
    pub replace: Option<String>,

    #[argh(option)]
    /// replacement for the word given with --replace
    pub into: Option<String>,
}

impl Collaborator for Textify {
    fn name() -> &'static str {
        "textify"
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode> {
        let contents =
            fs::read_to_string(&self.file).map_err(|e| anyhow!("{}: {e}", self.file))?;

        if self.letters {
            let count = contents.chars().filter(char::is_ascii_alphanumeric).count();
            writeln!(stdout, "Number of letters in {}: {count}", self.file)?;
        } else if self.words {
            let count = contents.split_whitespace().count();
            writeln!(stdout, "Number of words in {}: {count}", self.file)?;
        } else if let Some(word) = &self.occurrences {
            let count = contents.split_whitespace().filter(|w| w == word).count();
            writeln!(
                stdout,
                "Number of occurrences of '{word}' in {}: {count}",
                self.file
            )?;
        } else if let Some(old) = &self.replace {
            let Some(new) = &self.into else {
                bail!("--replace needs --into <word>");
            };
            let updated = self.replace_words(&contents, old, new)?;
            writeln!(
                stdout,
                "Occurrences of '{old}' in {} changed to '{new}' in {updated}",
                self.file
            )?;
        } else {
            bail!("no mode given (--letters, --words, --occurrences, --replace)");
        }

        Ok(0)
    }
}

impl Textify {
    /// Rewrite the file word by word into `<stem>-updated.txt`, preserving the
    /// line structure, and return the new file's path.
    fn replace_words(&self, contents: &str, old: &str, new: &str) -> Result<String> {
        let path = Path::new(&self.file);
        if path.extension().is_none() {
            bail!("{}: file name has no extension", self.file);
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("{}: invalid file name", self.file))?;
        let updated = path.with_file_name(format!("{stem}-updated.txt"));

        let mut out = String::new();
        for line in contents.lines() {
            let replaced: Vec<&str> = line
                .split_whitespace()
                .map(|w| if w == old { new } else { w })
                .collect();
            out.push_str(&replaced.join(" "));
            out.push('\n');
        }
        fs::write(&updated, out).map_err(|e| anyhow!("{}: {e}", updated.display()))?;

        Ok(updated.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textify(file: String) -> Textify {
        Textify {
            file,
            letters: false,
            words: false,
            occurrences: None,
            replace: None,
            into: None,
        }
    }

    fn run(cmd: Textify) -> (Result<ExitCode>, String) {
        let mut out = Vec::new();
        let result = cmd.execute(&mut out);
        (result, String::from_utf8(out).expect("utf8"))
    }

    fn sample_file(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.txt");
        fs::write(&path, contents).expect("write");
        let name = path.display().to_string();
        (dir, name)
    }

    #[test]
    fn counts_alphanumeric_characters() {
        let (_dir, file) = sample_file("ab c1!\nx?\n");
        let mut cmd = textify(file);
        cmd.letters = true;

        let (result, out) = run(cmd);
        assert_eq!(result.expect("ok"), 0);
        assert!(out.contains(": 5"), "unexpected output: {out}");
    }

    #[test]
    fn counts_words() {
        let (_dir, file) = sample_file("one two\nthree\n");
        let mut cmd = textify(file);
        cmd.words = true;

        let (result, out) = run(cmd);
        assert_eq!(result.expect("ok"), 0);
        assert!(out.contains(": 3"));
    }

    #[test]
    fn counts_occurrences_of_an_exact_word() {
        let (_dir, file) = sample_file("ha ha haha\nha\n");
        let mut cmd = textify(file);
        cmd.occurrences = Some("ha".to_string());

        let (result, out) = run(cmd);
        assert_eq!(result.expect("ok"), 0);
        assert!(out.contains("'ha'"));
        assert!(out.contains(": 3"));
    }

    #[test]
    fn replaces_words_into_an_updated_file() {
        let (dir, file) = sample_file("old word\nold again\n");
        let mut cmd = textify(file);
        cmd.replace = Some("old".to_string());
        cmd.into = Some("new".to_string());

        let (result, out) = run(cmd);
        assert_eq!(result.expect("ok"), 0);
        assert!(out.contains("sample-updated.txt"));

        let updated = dir.path().join("sample-updated.txt");
        let rewritten = fs::read_to_string(updated).expect("updated file");
        assert_eq!(rewritten, "new word\nnew again\n");
    }

    #[test]
    fn replace_without_target_word_fails() {
        let (_dir, file) = sample_file("text\n");
        let mut cmd = textify(file);
        cmd.replace = Some("text".to_string());

        let (result, _) = run(cmd);
        assert!(result.is_err());
    }

    #[test]
    fn missing_mode_is_an_error() {
        let (_dir, file) = sample_file("text\n");
        let (result, _) = run(textify(file));
        assert!(result.is_err());
    }
}
