use std::cmp::Ordering;

use crate::value::Value;

/// Comparison operators, evaluated against the total [`Value`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,
}

impl CompareOp {
    pub fn apply(self, left: &Value, right: &Value) -> bool {
        let ord = left.cmp(right);
        match self {
            CompareOp::Equal => ord == Ordering::Equal,
            CompareOp::NotEqual => ord != Ordering::Equal,
            CompareOp::LessThan => ord == Ordering::Less,
            CompareOp::GreaterThan => ord == Ordering::Greater,
            CompareOp::LessEqual => ord != Ordering::Greater,
            CompareOp::GreaterEqual => ord != Ordering::Less,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::GreaterThan => ">",
            CompareOp::LessEqual => "<=",
            CompareOp::GreaterEqual => ">=",
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// Addition, concatenation or object merge (`+`)
    Add,
    /// Subtraction, or array difference (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Subtract => "-",
            ArithOp::Multiply => "*",
            ArithOp::Divide => "/",
            ArithOp::Modulo => "%",
        }
    }
}
