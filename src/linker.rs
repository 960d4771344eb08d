//! Bracket validation and jump-table construction.
//!
//! A program is scanned exactly once, left to right. Every `[` is pushed on a
//! position stack and every `]` pops its partner, recording both directions in
//! the [`JumpTable`]. The first problem found wins; nothing after it is
//! reported.

use tracing::debug;

/// Default maximum program length in bytes.
pub const DEFAULT_MAX_PROGRAM_LEN: usize = 65_536;

/// Default maximum loop-nesting depth.
pub const DEFAULT_MAX_NESTING: usize = 65_536;

/// Errors detected while validating a program, before anything executes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A `[` was never closed. `ip` is the innermost unclosed bracket.
    #[error("unmatched '[' at byte {ip}")]
    UnmatchedOpenBracket { ip: usize },

    /// A `]` appeared with no open loop to close.
    #[error("unmatched ']' at byte {ip}")]
    UnmatchedCloseBracket { ip: usize },

    /// Loops were nested deeper than the configured limit.
    #[error("too many nested loops (max {limit})")]
    TooManyNestedLoops { limit: usize },

    /// The program is longer than the configured limit.
    #[error("program too large ({len} bytes, max {limit})")]
    ProgramTooLarge { len: usize, limit: usize },
}

impl ValidationError {
    /// Byte offset of the offending symbol, when the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ValidationError::UnmatchedOpenBracket { ip }
            | ValidationError::UnmatchedCloseBracket { ip } => Some(*ip),
            ValidationError::TooManyNestedLoops { .. }
            | ValidationError::ProgramTooLarge { .. } => None,
        }
    }
}

/// Resource limits applied during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_program_len: usize,
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_program_len: DEFAULT_MAX_PROGRAM_LEN,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl Limits {
    /// Limits that never reject a program.
    pub fn unbounded() -> Self {
        Self {
            max_program_len: usize::MAX,
            max_nesting: usize::MAX,
        }
    }
}

/// Matching bracket positions for a validated program.
///
/// `targets[i]` holds the partner of the bracket at `i`. Entries for
/// non-bracket positions are zero and never consulted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JumpTable {
    targets: Vec<usize>,
}

impl JumpTable {
    /// Partner position of the bracket at `ip`.
    #[inline]
    pub fn target(&self, ip: usize) -> usize {
        self.targets[ip]
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Validate bracket structure and build the jump table in a single pass.
pub fn validate_and_link(source: &[u8], limits: &Limits) -> Result<JumpTable, ValidationError> {
    if source.len() > limits.max_program_len {
        return Err(ValidationError::ProgramTooLarge {
            len: source.len(),
            limit: limits.max_program_len,
        });
    }

    let mut targets = vec![0usize; source.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs = 0usize;

    for (i, &b) in source.iter().enumerate() {
        match b {
            b'[' => {
                if stack.len() >= limits.max_nesting {
                    return Err(ValidationError::TooManyNestedLoops {
                        limit: limits.max_nesting,
                    });
                }
                stack.push(i);
            }
            b']' => {
                let Some(open) = stack.pop() else {
                    return Err(ValidationError::UnmatchedCloseBracket { ip: i });
                };
                targets[open] = i;
                targets[i] = open;
                pairs += 1;
            }
            _ => {}
        }
    }

    if let Some(unclosed) = stack.last().copied() {
        return Err(ValidationError::UnmatchedOpenBracket { ip: unclosed });
    }

    debug!(len = source.len(), pairs, "program linked");
    Ok(JumpTable { targets })
}
