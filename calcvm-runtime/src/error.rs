//! Runtime error types for calcvm.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("empty program")]
    EmptyProgram,

    #[error("register R{index} out of range (max R31) at pc={pc}")]
    RegisterOutOfRange { index: u32, pc: usize },

    #[error("jump target {target} out of bounds (program has {len} instructions) at pc={pc}")]
    BranchOutOfRange {
        target: usize,
        len: usize,
        pc: usize,
    },

    #[error("division by zero (R{src} = 0) at pc={pc}")]
    DivisionByZero { src: u32, pc: usize },

    #[error("execution limit ({limit} steps) exceeded, possible infinite loop at pc={pc}")]
    StepLimitExceeded { limit: u64, pc: usize },

    #[error("load/store at pc={pc} but no memory is attached")]
    MemoryNotAttached { pc: usize },

    #[error("unaligned word access at address {addr:#06x} (must be 4-byte aligned)")]
    MisalignedAccess { addr: u32 },

    #[error("word access out of bounds at address {addr:#06x} (memory size = {size:#x})", size = crate::memory::MEM_SIZE)]
    OutOfBounds { addr: u32 },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
