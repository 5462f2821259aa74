//! Source operators, their target mnemonics, and compile-time evaluation.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::fmt::{Display, Formatter};

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnaryOperator {
    /// Logical not (`!`).
    Not,
    /// Arithmetic negation (`-`).
    Negate,
    /// Bitwise complement (`~`).
    BitNot,
}

impl UnaryOperator {
    pub const ALL: [Self; 3] = [Self::Not, Self::Negate, Self::BitNot];

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(Self::Not),
            "-" => Some(Self::Negate),
            "~" => Some(Self::BitNot),
            _ => None,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
            Self::BitNot => "~",
        }
    }

    /// Mnemonic of the target instruction. Underscored names are pseudo
    /// instructions that code generation expands.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Not => "_not",
            Self::Negate => "_neg",
            Self::BitNot => "not",
        }
    }

    #[must_use]
    pub fn evaluate(self, value: Decimal) -> Option<Decimal> {
        match self {
            Self::Not => Some(truth(value.is_zero())),
            Self::Negate => Some(-value),
            Self::BitNot => integral(value).map(|v| Decimal::from(!v)),
        }
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// `<<` and `<<l`.
    ShiftLeftLogical,
    /// `>>` and `>>l`.
    ShiftRightLogical,
    /// `<<a`.
    ShiftLeftArithmetic,
    /// `>>a`.
    ShiftRightArithmetic,
}

impl BinaryOperator {
    pub const ALL: [Self; 18] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::ShiftLeftLogical,
        Self::ShiftRightLogical,
        Self::ShiftLeftArithmetic,
        Self::ShiftRightArithmetic,
    ];

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let operator = match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "&" => Self::BitAnd,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            "<<" | "<<l" => Self::ShiftLeftLogical,
            ">>" | ">>l" => Self::ShiftRightLogical,
            "<<a" => Self::ShiftLeftArithmetic,
            ">>a" => Self::ShiftRightArithmetic,
            _ => return None,
        };
        Some(operator)
    }

    /// Canonical source spelling.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::ShiftLeftLogical => "<<",
            Self::ShiftRightLogical => ">>",
            Self::ShiftLeftArithmetic => "<<a",
            Self::ShiftRightArithmetic => ">>a",
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::BitAnd => "and",
            Self::BitOr => "or",
            Self::BitXor => "xor",
            Self::Equal => "seq",
            Self::NotEqual => "sne",
            Self::Greater => "sgt",
            Self::GreaterOrEqual => "sge",
            Self::Less => "slt",
            Self::LessOrEqual => "sle",
            Self::ShiftLeftLogical => "sll",
            Self::ShiftRightLogical => "srl",
            Self::ShiftLeftArithmetic => "sla",
            Self::ShiftRightArithmetic => "sra",
        }
    }

    /// Folds `left <op> right`. Returns `None` when the result is left to run time
    /// (division by zero, overflow, bit operations on fractional values).
    #[must_use]
    pub fn evaluate(self, left: Decimal, right: Decimal) -> Option<Decimal> {
        match self {
            Self::Add => left.checked_add(right),
            Self::Sub => left.checked_sub(right),
            Self::Mul => left.checked_mul(right),
            Self::Div => left.checked_div(right),
            Self::Mod => left.checked_rem(right),
            Self::BitAnd => bitwise(left, right, |a, b| a & b),
            Self::BitOr => bitwise(left, right, |a, b| a | b),
            Self::BitXor => bitwise(left, right, |a, b| a ^ b),
            Self::Equal => Some(truth(left == right)),
            Self::NotEqual => Some(truth(left != right)),
            Self::Greater => Some(truth(left > right)),
            Self::GreaterOrEqual => Some(truth(left >= right)),
            Self::Less => Some(truth(left < right)),
            Self::LessOrEqual => Some(truth(left <= right)),
            Self::ShiftLeftLogical | Self::ShiftLeftArithmetic => {
                shift(left, right, |v, n| v.checked_shl(n))
            }
            Self::ShiftRightLogical => {
                shift(left, right, |v, n| (v as u64).checked_shr(n).map(|r| r as i64))
            }
            Self::ShiftRightArithmetic => shift(left, right, i64::checked_shr),
        }
    }
}

/// Three-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TernaryOperator {
    /// `cond ? a : b`.
    Select,
    /// `~=` / `~==`: approximately equal within a relative tolerance.
    ApproxEqual,
    /// `~!=`.
    ApproxNotEqual,
}

impl TernaryOperator {
    pub const ALL: [Self; 3] = [Self::Select, Self::ApproxEqual, Self::ApproxNotEqual];

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "?" => Some(Self::Select),
            "~=" | "~==" => Some(Self::ApproxEqual),
            "~!=" => Some(Self::ApproxNotEqual),
            _ => None,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Select => "?",
            Self::ApproxEqual => "~=",
            Self::ApproxNotEqual => "~!=",
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::ApproxEqual => "sap",
            Self::ApproxNotEqual => "sna",
        }
    }

    /// Only selection folds; approximate comparisons depend on the machine's float epsilon.
    #[must_use]
    pub fn evaluate(self, first: Decimal, second: Decimal, third: Decimal) -> Option<Decimal> {
        match self {
            Self::Select => Some(if first.is_zero() { third } else { second }),
            Self::ApproxEqual | Self::ApproxNotEqual => None,
        }
    }
}

/// Mnemonic for a unary operator symbol.
#[must_use]
pub fn unary_mnemonic(symbol: &str) -> Option<&'static str> {
    UnaryOperator::from_symbol(symbol).map(UnaryOperator::mnemonic)
}

/// Mnemonic for a binary operator symbol.
#[must_use]
pub fn binary_mnemonic(symbol: &str) -> Option<&'static str> {
    BinaryOperator::from_symbol(symbol).map(BinaryOperator::mnemonic)
}

/// Mnemonic for a ternary operator symbol.
#[must_use]
pub fn ternary_mnemonic(symbol: &str) -> Option<&'static str> {
    TernaryOperator::from_symbol(symbol).map(TernaryOperator::mnemonic)
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Display for TernaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

const fn truth(value: bool) -> Decimal {
    if value { Decimal::ONE } else { Decimal::ZERO }
}

fn integral(value: Decimal) -> Option<i64> {
    if value.fract().is_zero() {
        value.to_i64()
    } else {
        None
    }
}

fn bitwise(left: Decimal, right: Decimal, op: impl Fn(i64, i64) -> i64) -> Option<Decimal> {
    Some(Decimal::from(op(integral(left)?, integral(right)?)))
}

fn shift(
    value: Decimal,
    amount: Decimal,
    op: impl Fn(i64, u32) -> Option<i64>,
) -> Option<Decimal> {
    let amount = u32::try_from(integral(amount)?).ok()?;
    op(integral(value)?, amount).map(Decimal::from)
}
