use crate::linker::{validate_and_link, JumpTable, Limits, ValidationError};

/// The eight meaningful symbols, in the order `><+-.,[]`.
pub const SYMBOLS: [u8; 8] = [b'>', b'<', b'+', b'-', b'.', b',', b'[', b']'];

/// True when `b` is one of the eight instruction symbols.
#[inline]
pub fn is_symbol(b: u8) -> bool {
    SYMBOLS.contains(&b)
}

/// A validated program: immutable source bytes plus their jump table.
///
/// A `Program` can only be obtained through [`Program::new`], so holding one
/// proves the brackets are balanced and within limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    source: Vec<u8>,
    jumps: JumpTable,
}

impl Program {
    pub fn new(source: impl Into<Vec<u8>>, limits: &Limits) -> Result<Self, ValidationError> {
        let source = source.into();
        let jumps = validate_and_link(&source, limits)?;
        Ok(Self { source, jumps })
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn jumps(&self) -> &JumpTable {
        &self.jumps
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Number of bytes that are actual instructions rather than comments.
    pub fn instruction_count(&self) -> usize {
        self.source.iter().filter(|&&b| is_symbol(b)).count()
    }
}
