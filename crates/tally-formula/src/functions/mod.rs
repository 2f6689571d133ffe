//! Built-in formula functions
//!
//! Every function takes already-evaluated arguments. The evaluator checks
//! arity with [`arity`] before dispatching here, so implementations index
//! their arguments directly.

pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::OperatorKind;
use std::fmt;

/// Number of children an operation node must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Inclusive bounds
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// Child count each operator requires
///
/// AND, OR and the aggregates normally hold one LIST child but also accept
/// their arguments directly, which is how hand-built trees use them.
pub fn arity(op: OperatorKind) -> Arity {
    use OperatorKind::*;
    match op {
        Pi => Arity::Exactly(0),
        Not | Len | Cell => Arity::Exactly(1),
        op if op.is_unary_math() => Arity::Exactly(1),
        If => Arity::Range(2, 3),
        Left | Right | Concat | CellRange => Arity::Exactly(2),
        op if op.is_comparison() || op.is_arithmetic() => Arity::Exactly(2),
        Mid => Arity::Exactly(3),
        And | Or | List => Arity::AtLeast(1),
        op if op.is_aggregate() => Arity::AtLeast(1),
        _ => Arity::AtLeast(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_table() {
        assert_eq!(arity(OperatorKind::Pi), Arity::Exactly(0));
        assert_eq!(arity(OperatorKind::Sqrt), Arity::Exactly(1));
        assert_eq!(arity(OperatorKind::If), Arity::Range(2, 3));
        assert_eq!(arity(OperatorKind::Ge), Arity::Exactly(2));
        assert_eq!(arity(OperatorKind::Modulus), Arity::Exactly(2));
        assert_eq!(arity(OperatorKind::Mid), Arity::Exactly(3));
        assert_eq!(arity(OperatorKind::CountA), Arity::AtLeast(1));
    }

    #[test]
    fn test_accepts() {
        assert!(Arity::Range(2, 3).accepts(3));
        assert!(!Arity::Range(2, 3).accepts(1));
        assert!(Arity::AtLeast(1).accepts(40));
        assert!(!Arity::Exactly(0).accepts(1));
        assert_eq!(Arity::Range(2, 3).to_string(), "2 to 3");
    }
}
