//! # calcvm core
//!
//! Data model and arithmetic core of the calcvm register machine:
//!
//! - [`alu`] — bit-accurate 32-bit arithmetic with Z/N/C/V flag derivation
//! - [`instruction`] — the opcode set and the flat instruction record
//! - [`program`] — the append-only instruction buffer
//!
//! The word size is 32 bits everywhere. Signedness is never a property of
//! the arithmetic itself; it is a reading of the bit pattern exposed
//! through the N and V flags.

pub mod alu;
pub mod instruction;
pub mod program;

pub use alu::Flags;
pub use instruction::{Instr, Opcode};
pub use program::Program;

/// Machine word (32-bit, unsigned).
pub type Word = u32;

/// Number of general-purpose registers (R0-R31).
pub const NUM_REGS: usize = 32;
