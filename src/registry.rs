//! The available-commands registry backing tab completion.
//!
//! Built once at startup by walking every directory on the search path and
//! collecting the names of executable entries, deduplicated across
//! directories and unioned with the shell's own builtin names. Read-only for
//! the rest of the session.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Names the shell answers itself; completed like any other command.
pub const BUILTINS: &[&str] = &["cd", "exit", "hdiff", "psvis", "regression", "textify"];

/// Sorted, deduplicated set of every command name available this session.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    names: BTreeSet<String>,
}

impl CommandRegistry {
    /// Build the registry from the `PATH` of the current process.
    pub fn new() -> Self {
        Self::from_search_path(std::env::var_os("PATH").unwrap_or_default().as_os_str())
    }

    /// Build the registry from an explicit search path string.
    pub fn from_search_path(search_paths: &OsStr) -> Self {
        let mut names: BTreeSet<String> =
            BUILTINS.iter().map(|name| name.to_string()).collect();

        for dir in std::env::split_paths(search_paths) {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                if is_executable(&entry.path()) {
                    names.insert(name.to_string());
                }
            }
        }

        Self { names }
    }

    /// All registered names starting with `prefix`, in sorted order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A regular file with any execute bit set.
pub(crate) fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::unix::fs::PermissionsExt;

    fn touch_with_mode(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    #[test]
    fn collects_executables_and_skips_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch_with_mode(dir.path(), "runnable", 0o755);
        touch_with_mode(dir.path(), "plain", 0o644);
        touch_with_mode(dir.path(), ".hidden", 0o755);

        let registry = CommandRegistry::from_search_path(dir.path().as_os_str());

        assert!(registry.contains("runnable"));
        assert!(!registry.contains("plain"));
        assert!(!registry.contains(".hidden"));
    }

    #[test]
    fn deduplicates_across_directories() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        touch_with_mode(first.path(), "twice", 0o755);
        touch_with_mode(second.path(), "twice", 0o755);

        let joined =
            std::env::join_paths([first.path(), second.path()]).expect("join paths");
        let registry = CommandRegistry::from_search_path(&joined);

        let matches = registry.matching("twice");
        assert_eq!(matches, vec!["twice".to_string()]);
    }

    #[test]
    fn builtins_are_always_present() {
        let registry = CommandRegistry::from_search_path(OsStr::new(""));
        for builtin in BUILTINS {
            assert!(registry.contains(builtin), "missing builtin {builtin}");
        }
    }

    #[test]
    fn matching_is_sorted_by_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch_with_mode(dir.path(), "zeta", 0o755);
        touch_with_mode(dir.path(), "zebra", 0o755);

        let registry = CommandRegistry::from_search_path(dir.path().as_os_str());
        assert_eq!(
            registry.matching("ze"),
            vec!["zebra".to_string(), "zeta".to_string()]
        );
    }

    #[test]
    fn missing_directories_are_ignored() {
        let registry =
            CommandRegistry::from_search_path(OsStr::new("/definitely/not/a/real/dir"));
        assert_eq!(registry.len(), BUILTINS.len());
    }
}
