//! calcvm driver.
//!
//! Pipeline: one line of input → lexer → parser → expression tree →
//! (reference evaluator) → codegen → IR → virtual CPU. The evaluator and
//! the CPU must agree modulo 2^32; a mismatch is a lowering bug.
//!
//! `--demos` additionally runs the hand-written IR programs that
//! exercise compare/branch, looping and load/store.

use std::io::{self, BufRead};
use std::process::ExitCode;

use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use calcvm_compiler::{compile, eval, parse};
use calcvm_core::{Instr, Program};
use calcvm_runtime::{Cpu, CpuConfig, Memory};

/// Compile an infix arithmetic expression to register-machine IR and
/// execute it on the simulated CPU.
#[derive(FromArgs)]
struct Args {
    /// expression to evaluate; reads one line from stdin when omitted
    #[argh(positional)]
    expr: Option<String>,

    /// print the generated IR listing to stderr
    #[argh(switch)]
    dump_ir: bool,

    /// trace every executed instruction
    #[argh(switch)]
    trace: bool,

    /// run the demonstration programs after the expression
    #[argh(switch)]
    demos: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Args = argh::from_env();

    let source = match args.expr {
        Some(expr) => expr,
        None => {
            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line).is_err() {
                eprintln!("error: failed to read input");
                return ExitCode::FAILURE;
            }
            line.trim().to_string()
        }
    };

    if source.is_empty() {
        eprintln!("error: empty input");
        return ExitCode::FAILURE;
    }

    if run_expression(&source, args.dump_ir, args.trace).is_err() {
        return ExitCode::FAILURE;
    }

    if args.demos {
        run_branch_demo(args.trace);
        run_loop_demo(args.trace);
        run_memory_demo(args.trace);
    }

    ExitCode::SUCCESS
}

fn cpu_config(trace: bool) -> CpuConfig {
    CpuConfig {
        trace,
        ..CpuConfig::default()
    }
}

fn run_expression(source: &str, dump_ir: bool, trace: bool) -> Result<(), ()> {
    let tree = parse(source).map_err(|e| eprintln!("error: {e}"))?;
    let reference = eval(&tree).map_err(|e| eprintln!("error: {e}"))?;

    let (prog, _) = compile(&tree);
    if dump_ir {
        eprint!("{prog}");
    }

    let result = Cpu::new()
        .configured(cpu_config(trace))
        .execute(&prog)
        .map_err(|e| eprintln!("error: {e}"))?;

    // The evaluator works at i64 width, the CPU on 32-bit words; they
    // must agree modulo 2^32.
    if result.value != reference as u32 {
        eprintln!(
            "error: evaluator ({:#010x}) and CPU ({:#010x}) disagree at the 32-bit level",
            reference as u32, result.value
        );
        return Err(());
    }

    println!("{}", result.value_signed());
    Ok(())
}

/// Compare-and-branch demo.
///
/// ```text
///  0  LOAD_CONST R1, a
///  1  LOAD_CONST R2, b
///  2  CMP        R1, R2
///  3  JZ         6          equal → skip the "not equal" arm
///  4  LOAD_CONST R3, 99
///  5  JMP        7
///  6  LOAD_CONST R3, 42
/// ```
///
/// R3 ends as 42 on the equal path, 99 otherwise.
fn run_branch_demo(trace: bool) {
    for (a, b, expected) in [(3, 3, 42), (3, 5, 99)] {
        let prog: Program = [
            Instr::load_const(1, a),
            Instr::load_const(2, b),
            Instr::cmp(1, 2),
            Instr::jz(6),
            Instr::load_const(3, 99),
            Instr::jmp(7),
            Instr::load_const(3, 42),
        ]
        .into_iter()
        .collect();

        match Cpu::new().configured(cpu_config(trace)).execute(&prog) {
            Ok(result) => println!(
                "branch demo (R1={a}, R2={b}): R3 = {}  (expected {expected})",
                result.regs[3]
            ),
            Err(e) => eprintln!("branch demo failed: {e}"),
        }
    }
}

/// Countdown demo: SUB sets Z when R0 reaches zero, so JNZ can loop on
/// SUB's own flags without a separate CMP.
fn run_loop_demo(trace: bool) {
    let prog: Program = [
        Instr::load_const(0, 5),
        Instr::load_const(1, 1),
        Instr::sub(0, 1),
        Instr::jnz(2),
    ]
    .into_iter()
    .collect();

    match Cpu::new().configured(cpu_config(trace)).execute(&prog) {
        Ok(result) => println!("loop demo: R0 = {}  (expected 0)", result.regs[0]),
        Err(e) => eprintln!("loop demo failed: {e}"),
    }
}

/// Load/store demos: a round-trip through RAM, then the two error paths
/// (unaligned and out-of-bounds addresses).
fn run_memory_demo(trace: bool) {
    let prog: Program = [
        Instr::load_const(0, 0x200),
        Instr::load_const(1, 0xDEADBEEF),
        Instr::store(1, 0),
        Instr::load(2, 0),
    ]
    .into_iter()
    .collect();

    let mut mem = Memory::new();
    match Cpu::with_memory(&mut mem)
        .configured(cpu_config(trace))
        .execute(&prog)
    {
        Ok(result) => println!(
            "memory demo: R2 = {:#010x}  (expected 0xdeadbeef)",
            result.regs[2]
        ),
        Err(e) => eprintln!("memory demo failed: {e}"),
    }

    let unaligned: Program = [
        Instr::load_const(0, 0x102),
        Instr::load_const(1, 7),
        Instr::store(1, 0),
    ]
    .into_iter()
    .collect();

    let mut mem = Memory::new();
    match Cpu::with_memory(&mut mem)
        .configured(cpu_config(trace))
        .execute(&unaligned)
    {
        Ok(_) => eprintln!("unaligned store demo: unexpectedly succeeded"),
        Err(e) => println!("unaligned store demo: rejected as expected ({e})"),
    }

    let out_of_bounds: Program = [Instr::load_const(0, 0x10000), Instr::load(1, 0)]
        .into_iter()
        .collect();

    let mut mem = Memory::new();
    match Cpu::with_memory(&mut mem)
        .configured(cpu_config(trace))
        .execute(&out_of_bounds)
    {
        Ok(_) => eprintln!("out-of-bounds load demo: unexpectedly succeeded"),
        Err(e) => println!("out-of-bounds load demo: rejected as expected ({e})"),
    }
}
