use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AluError {
    #[error("division by zero")]
    DivisionByZero,
}

pub type Result<T> = std::result::Result<T, AluError>;

/// The arithmetic operations with a register destination. Compare is
/// separate: it produces flags, not a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Condition flags. Set only by compare; only `equal` is consumed, by the
/// two conditional jumps. `less` and `greater` are computed for
/// completeness and read by nothing in the current instruction set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub equal: bool,
    pub less: bool,
    pub greater: bool,
}

/// 8-bit arithmetic: ADD, SUB and MUL wrap modulo 256, DIV is integer
/// division and fails on a zero divisor.
pub fn arithmetic(op: AluOp, a: u8, b: u8) -> Result<u8> {
    let result = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Div => a.checked_div(b).ok_or(AluError::DivisionByZero)?,
    };
    Ok(result)
}

/// Compares two register values; exactly one flag is set for any pair.
pub fn compare(a: u8, b: u8) -> Flags {
    match a.cmp(&b) {
        Ordering::Equal => Flags {
            equal: true,
            less: false,
            greater: false,
        },
        Ordering::Less => Flags {
            equal: false,
            less: true,
            greater: false,
        },
        Ordering::Greater => Flags {
            equal: false,
            less: false,
            greater: true,
        },
    }
}
