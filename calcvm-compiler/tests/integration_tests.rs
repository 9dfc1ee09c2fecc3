//! Integration tests for the frontend: source text through parsing,
//! evaluation and lowering, via the public API only.

use calcvm_compiler::{compile, eval, parse};
use calcvm_core::{Instr, Opcode};

#[test]
fn parse_eval_agrees_with_hand_computation() {
    let cases = [
        ("1", 1),
        ("2+3*4", 14),
        ("(2+3)*4", 20),
        ("100/10/5", 2),
        ("10-2-3", 5),
        ("((((7))))", 7),
        ("1+2*3-4/2", 5),
    ];
    for (src, expected) in cases {
        let tree = parse(src).unwrap();
        assert_eq!(eval(&tree).unwrap(), expected, "{src}");
    }
}

#[test]
fn lowering_emits_one_load_per_leaf_and_one_op_per_node() {
    let tree = parse("1+2*3-4/2").unwrap();
    let (prog, _) = compile(&tree);

    let loads = prog
        .iter()
        .filter(|i| i.op == Opcode::LoadConst)
        .count();
    let ops = prog.len() - loads;
    assert_eq!(loads, 5);
    assert_eq!(ops, 4);
}

#[test]
fn lowered_program_is_post_order() {
    // Every arithmetic instruction must only use registers already
    // defined by an earlier instruction.
    let tree = parse("(1+2)*(3-(4/5))").unwrap();
    let (prog, _) = compile(&tree);

    let mut defined = vec![false; 32];
    for instr in &prog {
        match instr.op {
            Opcode::LoadConst => defined[instr.dst as usize] = true,
            _ => {
                assert!(defined[instr.dst as usize], "dst R{} undefined", instr.dst);
                assert!(defined[instr.src as usize], "src R{} undefined", instr.src);
            }
        }
    }
}

#[test]
fn compile_is_deterministic_across_parses() {
    let a = compile(&parse(" (8 - 3) * 2 ").unwrap());
    let b = compile(&parse("(8-3)*2").unwrap());
    assert_eq!(a.0, b.0);
    assert_eq!(a.1, b.1);
}

#[test]
fn result_register_holds_the_root() {
    let (prog, reg) = compile(&parse("5*6").unwrap());
    assert_eq!(prog[prog.len() - 1], Instr::mul(reg, reg + 1));
}
