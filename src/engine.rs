//! The execution loop.
//!
//! [`execute`] walks a validated [`Program`] one byte at a time against a
//! [`Tape`], reading from any `Read` and writing to any `Write`. Captured
//! input (`&[u8]`, `Cursor`) and live stdin go through the same path.
//!
//! I/O conventions:
//! - `,` stores the next input byte; a line feed is stored as 10. On EOF the
//!   current cell is left unchanged.
//! - `.` writes the current cell as one byte (10 is a newline) and flushes.

use std::io::{self, Read, Write};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, trace};

use crate::program::Program;
use crate::tape::Tape;

/// Failures that can stop a running program.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The input or output collaborator failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: io::Error,
    },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: u64 },

    /// Execution aborted by a wall-clock watchdog.
    #[error("Execution aborted: wall-clock timeout exceeded ({millis} ms)")]
    Timeout { millis: u64 },

    /// Execution aborted due to cooperative cancellation.
    #[error("Execution aborted: cancelled")]
    Canceled,
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<u64>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<u64>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    fn check(&self, step: u64) -> Result<(), RunError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(RunError::Canceled);
        }
        if let Some(max) = self.max_steps {
            if step >= max {
                return Err(RunError::StepLimitExceeded { limit: max });
            }
        }
        Ok(())
    }
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    /// Bytes of source visited, comments included.
    ///
    /// A `]` that loops back lands on the first byte of the body, so the
    /// matching `[` is counted once on entry and not again per iteration.
    pub steps: u64,
    /// Bytes written with `.`.
    pub bytes_written: u64,
}

/// Run `program` to completion against `tape`.
///
/// The tape is used as-is; callers wanting a fresh run reset it first.
pub fn execute<R: Read, W: Write>(
    program: &Program,
    tape: &mut Tape,
    input: R,
    output: W,
    control: Option<&StepControl>,
) -> Result<ExecStats, RunError> {
    execute_traced(program, tape, input, output, control, None)
}

/// Header printed before the first row of a debug trace.
pub(crate) const TRACE_HEADER: &str = "STEP | IP  | PTR | CELL | INSTR | ACTION\n\
-----+-----+-----+------+-------+------------------------------------------------\n";

/// Shared loop behind [`execute`] and debug runs. When `trace` is set, one
/// table row is written per step.
pub(crate) fn execute_traced<R: Read, W: Write>(
    program: &Program,
    tape: &mut Tape,
    mut input: R,
    mut output: W,
    control: Option<&StepControl>,
    mut trace: Option<&mut dyn Write>,
) -> Result<ExecStats, RunError> {
    let code = program.source();
    let jumps = program.jumps();
    let mut stats = ExecStats::default();
    let mut ip = 0usize;

    if let Some(t) = trace.as_mut() {
        t.write_all(TRACE_HEADER.as_bytes())
            .map_err(|source| RunError::Io { ip, source })?;
    }

    while ip < code.len() {
        if let Some(ctrl) = control {
            if let Err(err) = ctrl.check(stats.steps) {
                debug!(ip, steps = stats.steps, "run aborted: {err}");
                return Err(err);
            }
        }

        let at = ip;
        let instr = code[ip];
        let (ptr_before, cell_before) = (tape.pointer(), tape.current());
        let mut action: Option<String> = trace.as_ref().map(|_| String::new());

        match instr {
            b'>' => {
                tape.move_right();
                if let Some(a) = action.as_mut() { *a = format!("Moved pointer head to index {}", tape.pointer()); }
            }
            b'<' => {
                tape.move_left();
                if let Some(a) = action.as_mut() { *a = format!("Moved pointer head to index {}", tape.pointer()); }
            }
            b'+' => {
                tape.increment();
                if let Some(a) = action.as_mut() { *a = format!("Increment cell[{}] from {} to {}", ptr_before, cell_before, tape.current()); }
            }
            b'-' => {
                tape.decrement();
                if let Some(a) = action.as_mut() { *a = format!("Decrement cell[{}] from {} to {}", ptr_before, cell_before, tape.current()); }
            }
            b'.' => {
                let byte = tape.current();
                output
                    .write_all(&[byte])
                    .and_then(|_| output.flush())
                    .map_err(|source| RunError::Io { ip, source })?;
                stats.bytes_written += 1;
                if let Some(a) = action.as_mut() { *a = format!("Output byte {:?}", byte as char); }
            }
            b',' => {
                let read = read_byte(&mut input).map_err(|source| RunError::Io { ip, source })?;
                if let Some(byte) = read {
                    tape.set_current(byte);
                }
                if let Some(a) = action.as_mut() {
                    *a = match read {
                        Some(byte) => format!("Read byte -> {byte}"),
                        None => "Read byte -> EOF (cell unchanged)".to_string(),
                    };
                }
            }
            b'[' => {
                if tape.current() == 0 {
                    let j = jumps.target(ip);
                    trace!(from = ip, to = j, "skip loop");
                    if let Some(a) = action.as_mut() { *a = format!("Cell is 0; jump forward to matching ']' at IP {j}"); }
                    ip = j;
                } else if let Some(a) = action.as_mut() {
                    *a = "Enter loop (cell != 0)".to_string();
                }
            }
            b']' => {
                if tape.current() != 0 {
                    let j = jumps.target(ip);
                    trace!(from = ip, to = j, "repeat loop");
                    if let Some(a) = action.as_mut() { *a = format!("Cell != 0; jump back to matching '[' at IP {j}"); }
                    ip = j;
                } else if let Some(a) = action.as_mut() {
                    *a = "Exit loop (cell is 0)".to_string();
                }
            }
            _ => {
                if let Some(a) = action.as_mut() { *a = "Comment (no-op)".to_string(); }
            }
        }

        if let (Some(t), Some(a)) = (trace.as_mut(), action) {
            writeln!(
                t,
                "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                stats.steps,
                at,
                ptr_before,
                cell_before,
                instr.escape_ascii(),
                a
            )
            .map_err(|source| RunError::Io { ip, source })?;
        }

        stats.steps += 1;
        ip += 1;
    }

    debug!(steps = stats.steps, bytes_written = stats.bytes_written, "run completed");
    Ok(stats)
}

/// Read exactly one byte, retrying on `Interrupted`. `Ok(None)` is EOF.
fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
