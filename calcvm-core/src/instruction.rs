//! calcvm IR instruction set.
//!
//! Every instruction is one flat [`Instr`] record; which fields an opcode
//! reads is fixed per opcode, and the fields it does not read are zero by
//! construction. Arithmetic is two-address: the destination register is
//! also the left operand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// R[dst] = imm (mod 2^32); flags untouched
    LoadConst,
    /// R[dst] = R[dst] + R[src]
    Add,
    /// R[dst] = R[dst] - R[src]
    Sub,
    /// R[dst] = R[dst] * R[src] (lower 32 bits)
    Mul,
    /// R[dst] = R[dst] / R[src] (unsigned; R[src] must be non-zero)
    Div,
    /// Flags from R[dst] - R[src]; result discarded
    Cmp,
    /// pc = target
    Jmp,
    /// pc = target if Z
    Jz,
    /// pc = target if !Z
    Jnz,
    /// R[dst] = MEM[R[addr]]; flags untouched
    Load,
    /// MEM[R[addr]] = R[src]; flags untouched
    Store,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Cmp => "CMP",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Jnz => "JNZ",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
        }
    }

    /// Jump opcodes: the `target` field is meaningful.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jz | Opcode::Jnz)
    }

    /// Opcodes that update Z/N/C/V. Everything else preserves them.
    pub fn writes_flags(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Cmp
        )
    }

    /// Opcodes that write a destination register. Cmp and Store do not.
    pub fn writes_dst(self) -> bool {
        matches!(
            self,
            Opcode::LoadConst
                | Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Load
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single IR instruction.
///
/// Register fields hold raw indices; the CPU validates them against the
/// register file at execution time, so a malformed producer is caught
/// rather than silently wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Opcode,
    /// Destination register index.
    pub dst: u32,
    /// Source register index.
    pub src: u32,
    /// Immediate; truncated to a 32-bit pattern at execution, silently.
    pub imm: i64,
    /// Absolute instruction index for branches.
    pub target: usize,
    /// Register index holding a byte address for Load/Store.
    pub addr: u32,
}

impl Instr {
    fn binary(op: Opcode, dst: u32, src: u32) -> Self {
        Instr {
            op,
            dst,
            src,
            imm: 0,
            target: 0,
            addr: 0,
        }
    }

    fn branch(op: Opcode, target: usize) -> Self {
        Instr {
            op,
            dst: 0,
            src: 0,
            imm: 0,
            target,
            addr: 0,
        }
    }

    pub fn load_const(dst: u32, imm: i64) -> Self {
        Instr {
            op: Opcode::LoadConst,
            dst,
            src: 0,
            imm,
            target: 0,
            addr: 0,
        }
    }

    pub fn add(dst: u32, src: u32) -> Self {
        Self::binary(Opcode::Add, dst, src)
    }

    pub fn sub(dst: u32, src: u32) -> Self {
        Self::binary(Opcode::Sub, dst, src)
    }

    pub fn mul(dst: u32, src: u32) -> Self {
        Self::binary(Opcode::Mul, dst, src)
    }

    pub fn div(dst: u32, src: u32) -> Self {
        Self::binary(Opcode::Div, dst, src)
    }

    pub fn cmp(dst: u32, src: u32) -> Self {
        Self::binary(Opcode::Cmp, dst, src)
    }

    pub fn jmp(target: usize) -> Self {
        Self::branch(Opcode::Jmp, target)
    }

    pub fn jz(target: usize) -> Self {
        Self::branch(Opcode::Jz, target)
    }

    pub fn jnz(target: usize) -> Self {
        Self::branch(Opcode::Jnz, target)
    }

    pub fn load(dst: u32, addr: u32) -> Self {
        Instr {
            op: Opcode::Load,
            dst,
            src: 0,
            imm: 0,
            target: 0,
            addr,
        }
    }

    pub fn store(src: u32, addr: u32) -> Self {
        Instr {
            op: Opcode::Store,
            dst: 0,
            src,
            imm: 0,
            target: 0,
            addr,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Opcode::LoadConst => write!(f, "{:<10} R{}, {}", self.op.name(), self.dst, self.imm),
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz => {
                write!(f, "{:<10} {}", self.op.name(), self.target)
            }
            Opcode::Load => write!(f, "{:<10} R{}, [R{}]", self.op.name(), self.dst, self.addr),
            Opcode::Store => write!(f, "{:<10} R{}, [R{}]", self.op.name(), self.src, self.addr),
            _ => write!(f, "{:<10} R{}, R{}", self.op.name(), self.dst, self.src),
        }
    }
}
