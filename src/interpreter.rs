//! The state object tying a validated program to the tape it runs on.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::config::EngineConfig;
use crate::engine::{self, ExecStats, RunError, StepControl};
use crate::linker::ValidationError;
use crate::program::Program;
use crate::supervisor::{run_supervised, Supervision};
use crate::tape::Tape;

/// A Brainfuck interpreter.
///
/// Holds one validated [`Program`] and the [`Tape`] it executes against. The
/// tape is only allocated once validation has succeeded, and it persists
/// between runs until [`Interpreter::reset`] is called, so callers can inspect
/// the final state after a run.
///
/// ```
/// use bf_engine::{EngineConfig, Interpreter};
///
/// let mut bf = Interpreter::new("+++>++<[>+<-]", &EngineConfig::default()).unwrap();
/// bf.run(std::io::empty(), std::io::sink()).unwrap();
/// assert_eq!(bf.tape().cells()[..2], [0, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: Program,
    tape: Tape,
}

impl Interpreter {
    /// Validate `source` and allocate a zeroed tape for it.
    pub fn new(source: impl Into<Vec<u8>>, config: &EngineConfig) -> Result<Self, ValidationError> {
        let program = Program::new(source, &config.limits)?;
        Ok(Self::with_program(program, config))
    }

    /// Allocate a tape for an already validated program.
    pub fn with_program(program: Program, config: &EngineConfig) -> Self {
        Self {
            program,
            tape: Tape::new(config.tape_capacity, config.pointer_policy),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn into_tape(self) -> Tape {
        self.tape
    }

    /// Zero the tape and pointer so the next run starts from scratch.
    pub fn reset(&mut self) {
        self.tape.reset();
    }

    /// Execute the program until completion.
    pub fn run<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<ExecStats, RunError> {
        engine::execute(&self.program, &mut self.tape, input, output, None)
    }

    /// Execute with cooperative cancellation and optional step limit.
    pub fn run_with_control<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
        step_control: &StepControl,
    ) -> Result<ExecStats, RunError> {
        engine::execute(&self.program, &mut self.tape, input, output, Some(step_control))
    }

    /// Debug-run the program, writing a step-by-step table to `table`
    /// instead of performing program I/O. The tape advances exactly as in a
    /// real run, but:
    /// - '.' is logged, not emitted
    /// - ',' sees EOF and leaves the cell unchanged
    pub fn run_debug<T: Write>(&mut self, mut table: T, step_control: Option<&StepControl>) -> Result<ExecStats, RunError> {
        engine::execute_traced(
            &self.program,
            &mut self.tape,
            io::empty(),
            io::sink(),
            step_control,
            Some(&mut table as &mut dyn Write),
        )
    }
}

/// How a run through [`run_captured`] ended.
#[derive(Debug)]
pub enum RunStatus {
    Success,
    Invalid(ValidationError),
    Failed(RunError),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }

    /// Process exit status: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Everything a caller gets back from [`run_captured`].
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    /// Bytes written by `.`, in program order.
    pub output: Vec<u8>,
    /// Final tape, or `None` when validation failed or the run timed out.
    pub tape: Option<Tape>,
}

/// Validate and run `source` in one call, capturing its output.
///
/// With `Some(input)` the bytes are consumed in order and EOF follows; with
/// `None` the program reads the live standard input. Step and wall-clock
/// limits come from `config`.
pub fn run_captured(source: &[u8], input: Option<&[u8]>, config: &EngineConfig) -> RunReport {
    let interp = match Interpreter::new(source, config) {
        Ok(i) => i,
        Err(err) => {
            warn!("validation failed: {err}");
            return RunReport { status: RunStatus::Invalid(err), output: Vec::new(), tape: None };
        }
    };

    let sink = CaptureSink::default();
    let input: Box<dyn Read + Send> = match input {
        Some(bytes) => Box::new(Cursor::new(bytes.to_vec())),
        None => Box::new(io::stdin()),
    };
    let (result, interp) = run_supervised(interp, input, sink.clone(), Supervision::from(config));
    let output = sink.take();

    let status = match result {
        Ok(_) => RunStatus::Success,
        Err(err) => {
            warn!("run failed: {err}");
            RunStatus::Failed(err)
        }
    };
    RunReport { status, output, tape: interp.map(Interpreter::into_tape) }
}

/// Output buffer shared with a supervised worker thread.
#[derive(Debug, Clone, Default)]
struct CaptureSink(Arc<Mutex<Vec<u8>>>);

impl CaptureSink {
    fn take(&self) -> Vec<u8> {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buf)
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
