//! Fixed register bank of the target machine.
//!
//! Cells below [`FIRST_VARIABLE`] are never handed out to program variables.

/// The accumulator, `p0`.
pub const ACC: u64 = 0;
/// Holds `+1` for the whole run, the left-shift amount.
pub const ONE: u64 = 1;
/// Target address of an indirect store.
pub const ADDR: u64 = 2;
/// Left operand of a pending binary operation.
pub const LHS: u64 = 3;
/// Right operand of a pending binary operation.
pub const RHS: u64 = 4;
/// Scratch cell for negation and swaps.
pub const TMP: u64 = 5;
pub const T1: u64 = 6;
pub const T2: u64 = 7;
pub const T3: u64 = 8;
/// Holds `-1` for the whole run, the right-shift amount.
pub const NEG_ONE: u64 = 11;

pub const FIRST_VARIABLE: u64 = 16;
