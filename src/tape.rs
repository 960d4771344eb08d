//! The memory tape: a fixed-capacity row of `u8` cells and one pointer.
//!
//! Cells wrap modulo 256. What happens at the tape edges depends on the
//! [`PointerPolicy`].

use std::fmt;
use std::str::FromStr;

/// Default number of cells on a tape.
pub const DEFAULT_TAPE_CAPACITY: usize = 30_000;

/// Behavior of `<` at cell 0 and `>` at the last cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPolicy {
    /// Stay on the edge cell.
    #[default]
    Clamp,
    /// Continue from the opposite edge.
    Wrap,
}

impl fmt::Display for PointerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerPolicy::Clamp => write!(f, "clamp"),
            PointerPolicy::Wrap => write!(f, "wrap"),
        }
    }
}

impl FromStr for PointerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(PointerPolicy::Clamp),
            "wrap" => Ok(PointerPolicy::Wrap),
            other => Err(format!("invalid pointer policy '{other}', must be 'clamp' or 'wrap'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
    policy: PointerPolicy,
}

impl Tape {
    /// Allocate a zeroed tape. A capacity of zero is bumped to one cell so the
    /// pointer always addresses something.
    pub fn new(capacity: usize, policy: PointerPolicy) -> Self {
        Self {
            cells: vec![0; capacity.max(1)],
            pointer: 0,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn policy(&self) -> PointerPolicy {
        self.policy
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Value at `index`, or `None` past the end of the tape.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied()
    }

    #[inline]
    pub fn current(&self) -> u8 {
        self.cells[self.pointer]
    }

    #[inline]
    pub fn set_current(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    #[inline]
    pub fn increment(&mut self) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_add(1);
    }

    #[inline]
    pub fn decrement(&mut self) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_sub(1);
    }

    pub fn move_right(&mut self) {
        let last = self.cells.len() - 1;
        if self.pointer < last {
            self.pointer += 1;
        } else if self.policy == PointerPolicy::Wrap {
            self.pointer = 0;
        }
    }

    pub fn move_left(&mut self) {
        if self.pointer > 0 {
            self.pointer -= 1;
        } else if self.policy == PointerPolicy::Wrap {
            self.pointer = self.cells.len() - 1;
        }
    }

    /// Zero every cell and return the pointer to 0, keeping the allocation.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.pointer = 0;
    }

    /// A page-aligned slice of `size` cells containing the pointer, plus the
    /// index of its first cell.
    pub fn window(&self, size: usize) -> (usize, &[u8]) {
        let size = size.max(1);
        let base = self.pointer - self.pointer % size;
        let end = (base + size).min(self.cells.len());
        (base, &self.cells[base..end])
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new(DEFAULT_TAPE_CAPACITY, PointerPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_subtraction() {
        let mut tape = Tape::new(1, PointerPolicy::Clamp);
        tape.decrement();
        assert_eq!(tape.current(), 255);
    }

    #[test]
    fn wrapping_addition() {
        let mut tape = Tape::new(1, PointerPolicy::Clamp);
        for _ in 0..256 {
            tape.increment();
        }
        assert_eq!(tape.current(), 0);
    }

    #[test]
    fn clamp_holds_both_edges() {
        let mut tape = Tape::new(3, PointerPolicy::Clamp);
        tape.move_left();
        assert_eq!(tape.pointer(), 0);
        for _ in 0..5 {
            tape.move_right();
        }
        assert_eq!(tape.pointer(), 2);
    }

    #[test]
    fn wrap_crosses_both_edges() {
        let mut tape = Tape::new(3, PointerPolicy::Wrap);
        tape.move_left();
        assert_eq!(tape.pointer(), 2);
        tape.move_right();
        assert_eq!(tape.pointer(), 0);
    }

    #[test]
    fn zero_capacity_still_has_one_cell() {
        let mut tape = Tape::new(0, PointerPolicy::Wrap);
        tape.move_right();
        tape.increment();
        assert_eq!(tape.capacity(), 1);
        assert_eq!(tape.pointer(), 0);
        assert_eq!(tape.current(), 1);
    }

    #[test]
    fn reset_zeroes_cells_and_pointer() {
        let mut tape = Tape::new(4, PointerPolicy::Clamp);
        tape.increment();
        tape.move_right();
        tape.increment();
        tape.reset();
        assert_eq!(tape.pointer(), 0);
        assert!(tape.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn window_is_page_aligned_and_truncated_at_the_end() {
        let mut tape = Tape::new(10, PointerPolicy::Clamp);
        for _ in 0..9 {
            tape.move_right();
        }
        let (base, cells) = tape.window(4);
        assert_eq!(base, 8);
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("WRAP".parse::<PointerPolicy>(), Ok(PointerPolicy::Wrap));
        assert!("sideways".parse::<PointerPolicy>().is_err());
    }
}
