//! A validate-then-run Brainfuck interpreter engine.
//!
//! Every run has two phases. The [`linker`] scans the source once, checks
//! bracket balance and builds a jump table; only a program that passes is
//! handed to the [`engine`], which walks it against a [`Tape`].
//!
//! Behaviors:
//! - Cells are `u8` and wrap modulo 256 on `+` and `-`.
//! - The tape has a fixed capacity (30,000 cells by default). At the edges the
//!   pointer clamps, or wraps with [`PointerPolicy::Wrap`].
//! - `,` reads one byte; on EOF the current cell is left unchanged.
//! - `.` writes the current cell as one byte and flushes the sink.
//! - Bytes outside `><+-.,[]` are comments.
//! - Unbalanced brackets and oversized programs are rejected before any cell
//!   changes or any I/O happens.
//!
//! Quick start:
//!
//! ```
//! use bf_engine::{run_captured, EngineConfig};
//!
//! let report = run_captured(b",[.[-],]", Some(b"echo".as_slice()), &EngineConfig::default());
//! assert!(report.status.is_success());
//! assert_eq!(report.output, b"echo");
//! ```

pub mod cli_util;
pub mod config;
pub mod engine;
pub mod interpreter;
pub mod linker;
pub mod logging;
pub mod program;
pub mod repl;
pub mod supervisor;
pub mod tape;

pub use config::{ConfigError, EngineConfig, Overrides};
pub use engine::{execute, ExecStats, RunError, StepControl};
pub use interpreter::{run_captured, Interpreter, RunReport, RunStatus};
pub use linker::{validate_and_link, JumpTable, Limits, ValidationError};
pub use program::Program;
pub use supervisor::{run_supervised, supervise, Supervision};
pub use tape::{PointerPolicy, Tape};

/// Any failure the crate can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Keep only Brainfuck instruction characters.
pub fn bf_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii() && program::is_symbol(*c as u8))
        .collect()
}
