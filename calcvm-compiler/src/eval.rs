//! Tree-walking reference evaluator.
//!
//! Evaluates the expression tree directly on host integers. The driver
//! uses it only to cross-check the CPU's result; the two are compared
//! modulo 2^32, since the evaluator works at i64 width while the machine
//! works on 32-bit words.

use crate::ast::{BinOp, Expr};
use crate::error::{CompileError, Result};

/// Evaluate `expr`, post-order.
///
/// Emits one debug trace line per binary node resolved, in evaluation
/// order — the same order codegen emits the corresponding instructions.
pub fn eval(expr: &Expr) -> Result<i64> {
    match expr {
        Expr::Number(value) => Ok(*value),

        Expr::Binary { op, left, right } => {
            let lhs = eval(left)?;
            let rhs = eval(right)?;

            let result = match op {
                BinOp::Add => lhs.wrapping_add(rhs),
                BinOp::Sub => lhs.wrapping_sub(rhs),
                BinOp::Mul => lhs.wrapping_mul(rhs),
                BinOp::Div => {
                    if rhs == 0 {
                        return Err(CompileError::DivisionByZero);
                    }
                    lhs.wrapping_div(rhs)
                }
            };

            tracing::debug!("{} {} {} -> {}", op.name(), lhs, rhs, result);
            Ok(result)
        }
    }
}
