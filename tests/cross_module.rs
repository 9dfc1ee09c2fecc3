//! Cross-module tests: compiled IR mixed with hand-written instructions,
//! serialized programs re-executed, and the diagnostic listing.

use calcvm_compiler::{compile, parse};
use calcvm_core::{Instr, Opcode, Program};
use calcvm_runtime::{Cpu, Memory};

#[test]
fn compiled_program_extended_with_store_and_load() {
    // Compile `6*7`, then append hand-written IR that spills the result
    // to RAM and reloads it into a fresh register.
    let tree = parse("6*7").unwrap();
    let (mut prog, result_reg) = compile(&tree);

    // Two leaves occupy r0 and r1; r2 and r3 are free.
    prog.push(Instr::load_const(2, 0x100));
    prog.push(Instr::store(result_reg, 2));
    prog.push(Instr::load(3, 2));

    let mut mem = Memory::new();
    let result = Cpu::with_memory(&mut mem).execute(&prog).unwrap();

    assert_eq!(result.value, 42);
    assert_eq!(mem.read_word(0x100).unwrap(), 42);
}

#[test]
fn serialized_program_executes_identically() {
    let tree = parse("(8-3)*2").unwrap();
    let (prog, _) = compile(&tree);

    let json = serde_json::to_string(&prog).unwrap();
    let restored: Program = serde_json::from_str(&json).unwrap();

    let original = Cpu::new().execute(&prog).unwrap();
    let replayed = Cpu::new().execute(&restored).unwrap();
    assert_eq!(original.value, replayed.value);
    assert_eq!(original.steps, replayed.steps);
}

#[test]
fn listing_covers_every_compiled_instruction() {
    let tree = parse("1+2*3").unwrap();
    let (prog, _) = compile(&tree);

    let listing = prog.to_string();
    assert_eq!(listing.lines().count(), prog.len());
    assert_eq!(
        listing.lines().filter(|l| l.contains("LOAD_CONST")).count(),
        3
    );
    assert!(listing.contains("MUL"));
    assert!(listing.contains("ADD"));
}

#[test]
fn compiler_output_uses_only_arithmetic_opcodes() {
    // The expression frontend never emits branches or memory ops; the
    // runtime features are reachable only from hand-written IR.
    let tree = parse("((1+2)*(3+4))/(2+5)").unwrap();
    let (prog, _) = compile(&tree);

    for instr in &prog {
        assert!(
            matches!(
                instr.op,
                Opcode::LoadConst | Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div
            ),
            "unexpected opcode {:?}",
            instr.op
        );
    }
}
