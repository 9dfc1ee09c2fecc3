//! The virtual CPU: a PC-driven fetch-decode-execute loop over an IR
//! program.
//!
//! Every arithmetic and comparison instruction goes through the ALU and
//! updates the flags; constant loads, jumps and memory ops preserve them.
//! Memory is borrowed for the duration of a single [`Cpu::execute`] call
//! and may be absent for arithmetic-only programs.

use calcvm_core::{alu, Flags, Opcode, Program, Word, NUM_REGS};

use crate::error::{Result, RuntimeError};
use crate::memory::Memory;

/// Watchdog against program-supplied infinite loops.
pub const MAX_STEPS: u64 = 1_000_000;

/// Execution configuration.
#[derive(Debug, Clone)]
pub struct CpuConfig {
    /// Maximum instructions dispatched before execution fails.
    pub max_steps: u64,

    /// Emit one diagnostic line per executed instruction. The format is
    /// not part of the contract.
    pub trace: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        CpuConfig {
            max_steps: MAX_STEPS,
            trace: false,
        }
    }
}

/// Final machine state returned by a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Value of the last register written.
    pub value: Word,

    /// Register file at termination.
    pub regs: [Word; NUM_REGS],

    /// Flags at termination.
    pub flags: Flags,

    /// Instructions dispatched.
    pub steps: u64,

    /// Index of the last register written.
    pub last_dst: usize,
}

impl ExecutionResult {
    /// The result word read as a signed value, sign-extended to i64.
    pub fn value_signed(&self) -> i64 {
        self.value as i32 as i64
    }
}

/// The virtual CPU.
///
/// A `Cpu` is built fresh per execution: 32 zeroed registers, pc 0, clear
/// flags. [`Cpu::execute`] consumes it, so no machine state survives a
/// call.
pub struct Cpu<'m> {
    regs: [Word; NUM_REGS],
    pc: usize,
    flags: Flags,
    last_dst: usize,
    mem: Option<&'m mut Memory>,
    config: CpuConfig,
}

impl<'m> Cpu<'m> {
    /// A CPU with no memory attached. Load/Store will fail.
    pub fn new() -> Self {
        Cpu {
            regs: [0; NUM_REGS],
            pc: 0,
            flags: Flags::default(),
            last_dst: 0,
            mem: None,
            config: CpuConfig::default(),
        }
    }

    /// A CPU borrowing `mem` for the coming execution.
    pub fn with_memory(mem: &'m mut Memory) -> Self {
        Cpu {
            mem: Some(mem),
            ..Cpu::new()
        }
    }

    /// Replace the default configuration.
    pub fn configured(mut self, config: CpuConfig) -> Self {
        self.config = config;
        self
    }

    fn check_reg(&self, index: u32) -> Result<usize> {
        if (index as usize) < NUM_REGS {
            Ok(index as usize)
        } else {
            Err(RuntimeError::RegisterOutOfRange {
                index,
                pc: self.pc,
            })
        }
    }

    /// Targets in [0, len] are valid; `len` jumps past the last
    /// instruction and halts the loop.
    fn check_target(&self, target: usize, len: usize) -> Result<()> {
        if target > len {
            return Err(RuntimeError::BranchOutOfRange {
                target,
                len,
                pc: self.pc,
            });
        }
        Ok(())
    }

    /// Run `prog` to completion and return the final machine state.
    ///
    /// Terminates normally when pc reaches the program length, including
    /// by a jump whose target equals it. Any error unwinds immediately;
    /// there is no partial-failure recovery.
    pub fn execute(mut self, prog: &Program) -> Result<ExecutionResult> {
        if prog.is_empty() {
            return Err(RuntimeError::EmptyProgram);
        }

        let len = prog.len();
        let mut steps: u64 = 0;

        while self.pc < len {
            steps += 1;
            if steps > self.config.max_steps {
                return Err(RuntimeError::StepLimitExceeded {
                    limit: self.config.max_steps,
                    pc: self.pc,
                });
            }

            let instr = prog[self.pc];
            // Set when the instruction wrote pc itself; skips the
            // post-dispatch increment.
            let mut jumped = false;

            match instr.op {
                Opcode::LoadConst => {
                    let dst = self.check_reg(instr.dst)?;
                    // Truncate the immediate to its low 32 bits, silently.
                    self.regs[dst] = instr.imm as Word;
                    self.last_dst = dst;
                    if self.config.trace {
                        eprintln!("[cpu pc={}] R{} = {}", self.pc, dst, self.regs[dst]);
                    }
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    let dst = self.check_reg(instr.dst)?;
                    let src = self.check_reg(instr.src)?;

                    if instr.op == Opcode::Div && self.regs[src] == 0 {
                        return Err(RuntimeError::DivisionByZero {
                            src: instr.src,
                            pc: self.pc,
                        });
                    }

                    let (a, b) = (self.regs[dst], self.regs[src]);
                    let (result, sym) = match instr.op {
                        Opcode::Add => (alu::add(a, b, &mut self.flags), '+'),
                        Opcode::Sub => (alu::sub(a, b, &mut self.flags), '-'),
                        Opcode::Mul => (alu::mul(a, b, &mut self.flags), '*'),
                        Opcode::Div => (alu::div(a, b, &mut self.flags), '/'),
                        _ => unreachable!(),
                    };

                    self.regs[dst] = result;
                    self.last_dst = dst;
                    if self.config.trace {
                        eprintln!(
                            "[cpu pc={}] R{} = R{} {} R{} -> {}  ({})",
                            self.pc, dst, dst, sym, src, result, self.flags
                        );
                    }
                }

                Opcode::Cmp => {
                    // SUB through the ALU with the result discarded; the
                    // destination register is not written and last_dst is
                    // left alone.
                    let dst = self.check_reg(instr.dst)?;
                    let src = self.check_reg(instr.src)?;
                    alu::sub(self.regs[dst], self.regs[src], &mut self.flags);
                    if self.config.trace {
                        eprintln!(
                            "[cpu pc={}] CMP R{}, R{}  ({})",
                            self.pc, dst, src, self.flags
                        );
                    }
                }

                Opcode::Jmp => {
                    self.check_target(instr.target, len)?;
                    if self.config.trace {
                        eprintln!("[cpu pc={}] JMP -> {}", self.pc, instr.target);
                    }
                    self.pc = instr.target;
                    jumped = true;
                }

                Opcode::Jz => {
                    if self.flags.z {
                        self.check_target(instr.target, len)?;
                        if self.config.trace {
                            eprintln!("[cpu pc={}] JZ -> taken ({})", self.pc, instr.target);
                        }
                        self.pc = instr.target;
                        jumped = true;
                    } else if self.config.trace {
                        eprintln!("[cpu pc={}] JZ -> not taken", self.pc);
                    }
                }

                Opcode::Jnz => {
                    if !self.flags.z {
                        self.check_target(instr.target, len)?;
                        if self.config.trace {
                            eprintln!("[cpu pc={}] JNZ -> taken ({})", self.pc, instr.target);
                        }
                        self.pc = instr.target;
                        jumped = true;
                    } else if self.config.trace {
                        eprintln!("[cpu pc={}] JNZ -> not taken", self.pc);
                    }
                }

                Opcode::Load => {
                    let dst = self.check_reg(instr.dst)?;
                    let addr = self.regs[self.check_reg(instr.addr)?];
                    let mem = self
                        .mem
                        .as_deref()
                        .ok_or(RuntimeError::MemoryNotAttached { pc: self.pc })?;
                    let value = mem.read_word(addr)?;
                    self.regs[dst] = value;
                    self.last_dst = dst;
                    if self.config.trace {
                        eprintln!(
                            "[cpu pc={}] LOAD R{} <- MEM[{:#06x}] -> {}",
                            self.pc, dst, addr, value
                        );
                    }
                }

                Opcode::Store => {
                    let src = self.check_reg(instr.src)?;
                    let addr = self.regs[self.check_reg(instr.addr)?];
                    let value = self.regs[src];
                    let mem = self
                        .mem
                        .as_deref_mut()
                        .ok_or(RuntimeError::MemoryNotAttached { pc: self.pc })?;
                    mem.write_word(addr, value)?;
                    if self.config.trace {
                        eprintln!(
                            "[cpu pc={}] STORE MEM[{:#06x}] <- R{} ({})",
                            self.pc, addr, src, value
                        );
                    }
                }
            }

            if !jumped {
                self.pc += 1;
            }
        }

        tracing::debug!(steps, last_dst = self.last_dst, "execution complete");

        Ok(ExecutionResult {
            value: self.regs[self.last_dst],
            regs: self.regs,
            flags: self.flags,
            steps,
            last_dst: self.last_dst,
        })
    }
}

impl Default for Cpu<'_> {
    fn default() -> Self {
        Self::new()
    }
}
