//! Raw-mode line editing for the prompt.
//!
//! The terminal is switched to non-canonical, non-echoing mode for the
//! duration of one [`LineEditor::read_line`] call and restored on every exit
//! path by a scoped guard. Keystrokes are decoded into a small event set and
//! handled one at a time: manual echo, destructive backspace, tab completion
//! through a caller-supplied callback, and a single-slot history recall with
//! swap semantics (what was being typed becomes the new "previous" line).

use crate::complete::CompletionResult;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::io::{self, Read, Write};

/// The line buffer is bounded; reaching the bound submits the line.
const LINE_CAPACITY: usize = 4096;

/// Result of one prompt round.
#[derive(Debug, PartialEq, Eq)]
pub enum Prompt {
    /// A finished line, trailing newline already stripped.
    Line(String),
    /// Ctrl-D or end of input; the partial line is discarded.
    Eof,
}

/// One decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputEvent {
    Printable(u8),
    Backspace,
    Tab,
    Eof,
    Up,
    OtherEscape,
    Newline,
}

/// Puts stdin into non-canonical, non-echoing mode; dropping the guard
/// restores the saved attributes.
struct RawMode {
    saved: Termios,
}

impl RawMode {
    fn enable() -> io::Result<Self> {
        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin).map_err(io::Error::from)?;
        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(io::Error::from)?;
        Ok(Self { saved })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, &self.saved);
    }
}

/// Interactive reader with a single-slot history.
#[derive(Debug, Default)]
pub struct LineEditor {
    previous: Vec<u8>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one line with raw-mode editing. `complete` is invoked on tab with
    /// the current buffer contents.
    pub fn read_line<C>(&mut self, prompt: &str, complete: C) -> io::Result<Prompt>
    where
        C: Fn(&str) -> CompletionResult,
    {
        let _raw = RawMode::enable()?;
        let mut input = io::stdin().lock();
        let mut output = io::stdout().lock();
        edit_loop(&mut input, &mut output, &mut self.previous, prompt, complete)
    }
}

/// The editing state machine, separated from the terminal so it can be driven
/// by any byte stream.
fn edit_loop<R, W, C>(
    input: &mut R,
    output: &mut W,
    previous: &mut Vec<u8>,
    prompt: &str,
    complete: C,
) -> io::Result<Prompt>
where
    R: Read,
    W: Write,
    C: Fn(&str) -> CompletionResult,
{
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut buf: Vec<u8> = Vec::new();
    loop {
        match next_event(input)? {
            InputEvent::Eof => return Ok(Prompt::Eof),
            InputEvent::Newline => {
                output.write_all(b"\n")?;
                output.flush()?;
                break;
            }
            InputEvent::Printable(byte) => {
                buf.push(byte);
                output.write_all(&[byte])?;
                output.flush()?;
                if buf.len() >= LINE_CAPACITY {
                    break;
                }
            }
            InputEvent::Backspace => {
                if buf.pop().is_some() {
                    output.write_all(b"\x08 \x08")?;
                    output.flush()?;
                }
            }
            InputEvent::Up => {
                // Swap semantics: the interrupted line becomes the new "previous".
                erase(output, buf.len())?;
                std::mem::swap(&mut buf, previous);
                output.write_all(&buf)?;
                output.flush()?;
            }
            InputEvent::OtherEscape => {}
            InputEvent::Tab => {
                if buf.is_empty() {
                    continue;
                }
                let result = complete(&String::from_utf8_lossy(&buf));
                if let Some(suffix) = result.sole_suffix() {
                    for &byte in suffix.as_bytes() {
                        if buf.len() >= LINE_CAPACITY {
                            break;
                        }
                        buf.push(byte);
                        output.write_all(&[byte])?;
                    }
                    // The separator the user would have typed next.
                    if buf.len() < LINE_CAPACITY {
                        buf.push(b' ');
                        output.write_all(b" ")?;
                    }
                    output.flush()?;
                } else if !result.matches.is_empty() {
                    output.write_all(b"\n")?;
                    output.write_all(result.matches.join(" ").as_bytes())?;
                    output.write_all(b"\n")?;
                    output.write_all(prompt.as_bytes())?;
                    output.write_all(&buf)?;
                    output.flush()?;
                }
            }
        }
    }

    *previous = buf.clone();
    Ok(Prompt::Line(String::from_utf8_lossy(&buf).into_owned()))
}

fn erase(output: &mut impl Write, count: usize) -> io::Result<()> {
    for _ in 0..count {
        output.write_all(b"\x08 \x08")?;
    }
    output.flush()
}

fn next_event(input: &mut impl Read) -> io::Result<InputEvent> {
    let Some(byte) = read_byte(input)? else {
        return Ok(InputEvent::Eof);
    };
    let event = match byte {
        4 => InputEvent::Eof,
        9 => InputEvent::Tab,
        b'\n' => InputEvent::Newline,
        127 => InputEvent::Backspace,
        27 => match read_byte(input)? {
            Some(b'[') => match read_byte(input)? {
                Some(b'A') => InputEvent::Up,
                _ => InputEvent::OtherEscape,
            },
            _ => InputEvent::OtherEscape,
        },
        // Stray control bytes are swallowed like unknown escapes.
        byte if byte < 32 => InputEvent::OtherEscape,
        byte => InputEvent::Printable(byte),
    };
    Ok(event)
}

/// One byte from the stream, retrying when a signal interrupts the read.
fn read_byte(input: &mut impl Read) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
