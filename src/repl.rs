use std::env;
use std::io::{self, IsTerminal, Read, Write};

use nu_ansi_term::{Color, Style};
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Signal, StyledText};
use tracing::debug;

use crate::cli_util::print_error;
use crate::{bf_only, run_supervised, EngineConfig, Error, Interpreter, Supervision, Tape};

/// Cells shown by `:tape`.
const TAPE_WINDOW: usize = 16;

pub const META_HELP: &str = r#"Meta commands (line starts with ":")
  :exit            Exit immediately (code 0)
  :help            Show this help
  :tape            Show the pointer and nearby cells from the last run
With a timeout configured, `,` sees EOF instead of reading the terminal.
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meta {
    Exit,
    Help,
    Tape,
    Unknown(String),
}

/// Parse a `:command` line. Returns `None` for anything that is not a meta
/// command.
pub fn parse_meta(line: &str) -> Option<Meta> {
    let cmd = line.trim().strip_prefix(':')?;
    Some(match cmd.trim() {
        "exit" | "quit" => Meta::Exit,
        "help" => Meta::Help,
        "tape" => Meta::Tape,
        other => Meta::Unknown(other.to_string()),
    })
}

/// A piece of bare-mode input: a run of code lines, or one meta command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Code(String),
    Meta(Meta),
}

/// Split a bare-mode submission into code runs and meta commands, in order.
pub fn segments(input: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut code = String::new();
    for line in input.split_inclusive('\n') {
        match parse_meta(line) {
            Some(meta) => {
                if !code.is_empty() {
                    out.push(Segment::Code(std::mem::take(&mut code)));
                }
                out.push(Segment::Meta(meta));
            }
            None => code.push_str(line),
        }
    }
    if !code.is_empty() {
        out.push(Segment::Code(code));
    }
    out
}

/// Render the pointer and a window of cells around it.
pub fn format_tape(tape: &Tape) -> String {
    let (base, cells) = tape.window(TAPE_WINDOW);
    let mut row = String::new();
    for (offset, cell) in cells.iter().enumerate() {
        if !row.is_empty() {
            row.push(' ');
        }
        if base + offset == tape.pointer() {
            row.push_str(&format!("[{cell}]"));
        } else {
            row.push_str(&cell.to_string());
        }
    }
    format!(
        "ptr={} cells {}..{}\n  {}\n",
        tape.pointer(),
        base,
        base + cells.len(),
        row
    )
}

/// One REPL session: engine settings plus the tape left by the last run.
pub struct Session {
    config: EngineConfig,
    last_tape: Option<Tape>,
}

/// Whether the loop should keep going after handling a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, last_tape: None }
    }

    pub fn last_tape(&self) -> Option<&Tape> {
        self.last_tape.as_ref()
    }

    /// Input for `,` in editor mode.
    ///
    /// A worker abandoned by the watchdog would keep reading the terminal
    /// and swallow keystrokes meant for the editor, so timed runs get EOF.
    pub fn program_input(&self) -> Box<dyn Read + Send> {
        if self.config.timeout_ms.is_some() {
            Box::new(io::empty())
        } else {
            Box::new(io::stdin())
        }
    }

    pub fn handle_meta(&self, meta: &Meta) -> Flow {
        match meta {
            Meta::Exit => return Flow::Exit,
            Meta::Help => eprint!("{META_HELP}"),
            Meta::Tape => match &self.last_tape {
                Some(tape) => eprint!("{}", format_tape(tape)),
                None => eprintln!("no program has run yet"),
            },
            Meta::Unknown(cmd) => eprintln!("unknown meta command ':{cmd}' (try :help)"),
        }
        let _ = io::stderr().flush();
        Flow::Continue
    }

    /// Executes a single Brainfuck program contained in `buffer`.
    /// - Program output goes to stdout.
    /// - Errors are printed concisely to stderr.
    /// - A newline is always written to stdout after execution (success or error)
    ///   so that the prompt begins at column 0 on the next iteration.
    ///
    /// Returns false when the buffer held no instructions and nothing ran.
    pub fn execute_buffer(&mut self, buffer: &str, input: Box<dyn Read + Send>) -> bool {
        if bf_only(buffer).is_empty() {
            return false;
        }

        match Interpreter::new(buffer, &self.config) {
            Ok(interp) => {
                let supervision = Supervision::from(&self.config);
                let (result, interp) = run_supervised(interp, input, io::stdout(), supervision);
                self.last_tape = interp.map(Interpreter::into_tape);
                if let Err(err) = result {
                    print_error(None, buffer.as_bytes(), &Error::Run(err));
                }
            }
            Err(err) => {
                print_error(None, buffer.as_bytes(), &Error::Validation(err));
            }
        }
        println!();
        let _ = io::stdout().flush();
        true
    }
}

fn repl_once() -> bool {
    env::var("BF_REPL_ONCE").ok().as_deref() == Some("1")
}

pub fn repl_loop(config: EngineConfig) -> io::Result<()> {
    let mut editor = init_line_editor()?;
    let mut session = Session::new(config);

    loop {
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed. End the session cleanly to avoid hanging when stdin is closed
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        if let Some(meta) = parse_meta(&submission) {
            if session.handle_meta(&meta) == Flow::Exit {
                return Ok(());
            }
            continue;
        }

        let input = session.program_input();
        let ran = session.execute_buffer(&submission, input);

        // Test hook: if BF_REPL_ONCE=1, exit after one execution
        if ran && repl_once() {
            return Ok(());
        }
    }
}

fn init_line_editor() -> io::Result<reedline::Reedline> {
    use reedline::{
        default_emacs_keybindings, EditCommand, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent,
    };

    // Enter inserts a newline; Ctrl+D (Ctrl+Z on Windows) submits the buffer.
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Edit(vec![EditCommand::InsertNewline]));
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);

    // Up/down move within the current multiline buffer; Alt/Ctrl+Up/Down browse history.
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(1_000)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(SymbolHighlighter::catppuccin_mocha()))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

/// Collect all lines until EOF. `None` when nothing was read.
pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(e) => {
                debug!("stdin read failed: {e}");
                return None;
            }
        }
    }

    if buffer.is_empty() { None } else { Some(buffer) }
}

fn read_submission_interactive(editor: &mut reedline::Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("bf".to_string()), DefaultPromptSegment::Empty);

    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            // One history item per submitted buffer
            if !buffer.trim().is_empty() {
                let _ = editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => Ok(None),
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

/// Pick the REPL mode: flags, then `BF_REPL_MODE`, then TTY detection.
pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    let stdin_tty = io::stdin().is_terminal();
    select_mode_with(flag, env::var("BF_REPL_MODE").ok().as_deref(), stdin_tty)
}

fn select_mode_with(flag: ModeFlagOverride, env_mode: Option<&str>, stdin_tty: bool) -> Result<ReplMode, String> {
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor if !stdin_tty => {
            return Err("cannot start editor: stdin is not a TTY (use --bare or BF_REPL_MODE=bare)".to_string());
        }
        ModeFlagOverride::Editor => return Ok(ReplMode::Editor),
        ModeFlagOverride::None => {}
    }

    if let Some(val) = env_mode {
        return match val.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" if !stdin_tty => {
                Err("cannot start editor: stdin is not a TTY (use BF_REPL_MODE=bare)".to_string())
            }
            "editor" => Ok(ReplMode::Editor),
            _ => Err(format!("invalid BF_REPL_MODE value: {val}, must be 'bare' or 'editor'")),
        };
    }

    Ok(if stdin_tty { ReplMode::Editor } else { ReplMode::Bare })
}

/// Bare mode: read stdin until EOF, then run its code and meta commands in
/// order. Program input (`,`) sees EOF since stdin is already consumed.
pub fn execute_bare_once(config: EngineConfig) -> io::Result<()> {
    let mut locked = io::BufReader::new(io::stdin().lock());
    let Some(submission) = read_submission(&mut locked) else {
        return Ok(());
    };

    let mut session = Session::new(config);
    for segment in segments(&submission) {
        match segment {
            Segment::Meta(meta) => {
                if session.handle_meta(&meta) == Flow::Exit {
                    break;
                }
            }
            Segment::Code(code) => {
                let ran = session.execute_buffer(&code, Box::new(io::empty()));
                if ran && repl_once() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Per-symbol styles for the line editor.
#[derive(Default)]
struct SymbolHighlighter {
    map_plus: Style,
    map_minus: Style,
    map_lt: Style,
    map_gt: Style,
    map_dot: Style,
    map_comma: Style,
    map_bracket: Style,
    map_other: Style,
}

impl SymbolHighlighter {
    fn catppuccin_mocha() -> Self {
        // movement: sky/teal, data: green/red, I/O: yellow/peach, flow: mauve
        Self {
            map_gt: Style::new().fg(Color::Rgb(137, 220, 235)).bold(),
            map_lt: Style::new().fg(Color::Rgb(148, 226, 213)).bold(),
            map_plus: Style::new().fg(Color::Rgb(166, 227, 161)).bold(),
            map_minus: Style::new().fg(Color::Rgb(243, 139, 168)).bold(),
            map_dot: Style::new().fg(Color::Rgb(249, 226, 175)).bold(),
            map_comma: Style::new().fg(Color::Rgb(250, 179, 135)).bold(),
            map_bracket: Style::new().fg(Color::Rgb(203, 166, 247)).bold(),
            map_other: Style::new().fg(Color::Rgb(108, 112, 134)),
        }
    }

    #[inline]
    fn style_for(&self, ch: char) -> Style {
        match ch {
            '>' => self.map_gt,
            '<' => self.map_lt,
            '+' => self.map_plus,
            '-' => self.map_minus,
            '.' => self.map_dot,
            ',' => self.map_comma,
            '[' | ']' => self.map_bracket,
            _ => self.map_other,
        }
    }
}

impl Highlighter for SymbolHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();
        let mut run: Option<(Style, String)> = None;

        for ch in line.chars() {
            let style = self.style_for(ch);
            match run.as_mut() {
                Some((s, text)) if *s == style => text.push(ch),
                _ => {
                    if let Some(done) = run.take() {
                        out.push(done);
                    }
                    run = Some((style, ch.to_string()));
                }
            }
        }

        if let Some(done) = run {
            out.push(done);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn timed_sessions_read_eof_instead_of_the_terminal() {
        let config = EngineConfig { timeout_ms: Some(50), ..EngineConfig::default() };
        let session = Session::new(config);
        let mut buf = [0u8; 1];
        assert_eq!(session.program_input().read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_submission_reads_until_eof_multiple_lines() {
        let input = b"+++\n>+.\n";
        let mut cursor = Cursor::new(&input[..]);
        let got = read_submission(&mut cursor);
        assert_eq!(got.as_deref(), Some("+++\n>+.\n"));
    }

    #[test]
    fn read_submission_empty_returns_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_submission(&mut cursor).is_none());
    }

    #[test]
    fn meta_lines_are_recognized() {
        assert_eq!(parse_meta("  :exit\n"), Some(Meta::Exit));
        assert_eq!(parse_meta(":help"), Some(Meta::Help));
        assert_eq!(parse_meta(":tape"), Some(Meta::Tape));
        assert_eq!(parse_meta(":dance"), Some(Meta::Unknown("dance".to_string())));
        assert_eq!(parse_meta("+++ :exit"), None);
    }

    #[test]
    fn segments_keep_order_of_code_and_meta() {
        let got = segments("+++\n>.\n:tape\n-\n:exit\n+");
        assert_eq!(
            got,
            vec![
                Segment::Code("+++\n>.\n".to_string()),
                Segment::Meta(Meta::Tape),
                Segment::Code("-\n".to_string()),
                Segment::Meta(Meta::Exit),
                Segment::Code("+".to_string()),
            ]
        );
    }

    #[test]
    fn tape_rendering_marks_the_pointer() {
        let mut tape = Tape::new(4, crate::PointerPolicy::Clamp);
        tape.increment();
        tape.move_right();
        tape.increment();
        tape.increment();
        assert_eq!(format_tape(&tape), "ptr=1 cells 0..4\n  1 [2] 0 0\n");
    }

    #[test]
    fn flag_overrides_env_and_tty_detection() {
        assert_eq!(select_mode_with(ModeFlagOverride::Bare, Some("editor"), true), Ok(ReplMode::Bare));
        assert!(select_mode_with(ModeFlagOverride::Editor, None, false).is_err());
    }

    #[test]
    fn env_mode_is_validated() {
        assert_eq!(select_mode_with(ModeFlagOverride::None, Some("BARE"), true), Ok(ReplMode::Bare));
        assert!(select_mode_with(ModeFlagOverride::None, Some("fancy"), true).is_err());
        assert!(select_mode_with(ModeFlagOverride::None, Some("editor"), false).is_err());
    }

    #[test]
    fn auto_detect_follows_stdin_tty() {
        assert_eq!(select_mode_with(ModeFlagOverride::None, None, true), Ok(ReplMode::Editor));
        assert_eq!(select_mode_with(ModeFlagOverride::None, None, false), Ok(ReplMode::Bare));
    }

    #[test]
    fn highlighter_groups_runs_of_same_style() {
        let h = SymbolHighlighter::catppuccin_mocha();
        let styled = h.highlight("++[-]", 0);
        let texts: Vec<&str> = styled.buffer.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["++", "[", "-", "]"]);
    }
}
