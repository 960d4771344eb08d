use std::io::{self, Write};

use crate::{ConfigError, Error, RunError, ValidationError};

/// Bytes of source shown on each side of an error position.
const WINDOW_BYTES: usize = 32;

/// Print a structured error to stderr, with caret positioning where the
/// error has a source position.
/// If `program` is `Some("bf")`, messages are prefixed with "bf: ...".
pub fn print_error(program: Option<&str>, code: &[u8], err: &Error) {
    eprint!("{}", render_error(program, code, err));
    let _ = io::stderr().flush();
}

/// The text [`print_error`] writes.
pub fn render_error(program: Option<&str>, code: &[u8], err: &Error) -> String {
    let prefix_program = |msg: &str| match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    };

    match err {
        Error::Validation(v) => {
            let msg = match v {
                ValidationError::UnmatchedOpenBracket { .. } => "Parse error: unmatched bracket '['".to_string(),
                ValidationError::UnmatchedCloseBracket { .. } => "Parse error: unmatched bracket ']'".to_string(),
                other => format!("Parse error: {other}"),
            };
            match v.position() {
                Some(pos) => with_context(&prefix_program(&msg), code, pos),
                None => format!("{}\n", prefix_program(&msg)),
            }
        }
        Error::Run(RunError::Io { ip, source }) => {
            with_context(&prefix_program(&format!("I/O error: {source}")), code, *ip)
        }
        // Abort messages stand alone, without the program prefix.
        Error::Run(other) => format!("{other}\n"),
        Error::Config(c) => format!("{}\n", prefix_program(&config_message(c))),
    }
}

fn config_message(err: &ConfigError) -> String {
    format!("configuration error: {err}")
}

/// A message line, a window of the source, and a caret under `pos`.
fn with_context(prefix: &str, code: &[u8], pos: usize) -> String {
    let start = pos.saturating_sub(WINDOW_BYTES);
    let end = (pos + WINDOW_BYTES + 1).min(code.len());
    let slice: String = code
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect();

    let caret = format!("{}^", " ".repeat(pos.saturating_sub(start)));
    format!("{prefix} at byte {pos}\n  {slice}\n  {caret}\n")
}
