//! Turning a raw input line into a linked [`Command`] pipeline.
//!
//! Parsing never fails: a blank or unparsable line yields a [`Command`] with
//! an empty name, which the executor treats as a no-op. Quoting is honored
//! while splitting, a trailing `&`/`?` marks the whole line, and a top-level
//! `|` hands the remainder of the line to a recursive parse that owns it.

use crate::command::Command;

/// Parse one submitted line into a command chain.
pub fn parse(line: &str) -> Command {
    let mut cmd = Command::default();
    let mut line = line.trim();

    // Trailing markers are recorded on this node and stripped before
    // tokenization ever sees them.
    if let Some(rest) = line.strip_suffix('?') {
        cmd.auto_complete = true;
        line = rest.trim_end();
    }
    if let Some(rest) = line.strip_suffix('&') {
        cmd.background = true;
        line = rest.trim_end();
    }

    let (head, rest) = split_pipe(line);

    let mut tokens = tokenize(head);
    if !tokens.is_empty() {
        cmd.name = tokens.remove(0);
    }
    for token in tokens {
        // Standalone markers were already handled above.
        if token == "&" || token == "?" {
            continue;
        }
        cmd.args.push(strip_quote_pair(token));
    }
    cmd.args.insert(0, cmd.name.clone());

    if let Some(rest) = rest {
        cmd.next = Some(Box::new(parse(rest)));
    }

    cmd
}

/// Split at the first whitespace-delimited, unquoted `|`, returning the head
/// and the raw remainder just after the pipe. A `|` glued to other text is an
/// ordinary argument character.
fn split_pipe(line: &str) -> (&str, Option<&str>) {
    let mut in_single = false;
    let mut in_double = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '|' if !in_single && !in_double => {
                let standalone = line[..i].chars().next_back().is_none_or(char::is_whitespace)
                    && line[i + 1..].chars().next().is_none_or(char::is_whitespace);
                if standalone {
                    return (&line[..i], Some(&line[i + 1..]));
                }
            }
            _ => {}
        }
    }
    (line, None)
}

/// Split on whitespace outside quotes. Quote characters stay in the token so
/// that an exactly wrapped pair can be stripped afterwards and an unbalanced
/// quote passes through literally.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in input.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Strip a wrapping quote pair from a token, but only an exact `len > 2`
/// match of the same quote character on both ends.
fn strip_quote_pair(token: String) -> String {
    let bytes = token.as_bytes();
    if bytes.len() > 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return token[1..token.len() - 1].to_string();
        }
    }
    token
}
