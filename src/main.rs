use hshell::command::Outcome;
use hshell::editor::{LineEditor, Prompt};
use hshell::registry::CommandRegistry;
use hshell::{complete, parser, Executor, SYSNAME};
use std::env;

fn main() -> std::io::Result<()> {
    let registry = CommandRegistry::new();
    let mut editor = LineEditor::new();
    let mut executor = Executor::new();

    loop {
        executor.reap_background();

        let prompt = prompt_string();
        let line = match editor.read_line(&prompt, |buf| complete::complete(buf, &registry))? {
            Prompt::Eof => break,
            Prompt::Line(line) => line,
        };

        match executor.execute(parser::parse(&line)) {
            Outcome::Exit => break,
            Outcome::Success | Outcome::NotFound => {}
        }
    }

    // Last chance to collect finished jobs; whatever still runs is abandoned.
    executor.reap_background();
    println!();
    Ok(())
}

/// `user@host:cwd hshell$ `; user and host come from the environment and are
/// display-only.
fn prompt_string() -> String {
    let user = env::var("USER").unwrap_or_else(|_| "user".to_string());
    let host = env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    let cwd = env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());
    format!("{user}@{host}:{cwd} {SYSNAME}$ ")
}
