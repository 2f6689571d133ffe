//! Formula error types

use crate::ast::OperatorKind;
use crate::value::ValueKind;
use tally_core::CellAddress;
use thiserror::Error;

/// Result type for compiling a formula
pub type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Result type for evaluating a compiled formula
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Result type for cell resolution
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Result type for one-shot compile-and-evaluate calls
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// The single failure produced by [`compile`](crate::compile)
///
/// Lexical and grammar errors are not distinguished; no partial tree is
/// ever returned alongside one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error near {token}: {message}")]
pub struct SyntaxError {
    /// What went wrong
    pub message: String,
    /// Human-readable description of the offending token
    pub token: String,
}

impl SyntaxError {
    pub(crate) fn new(message: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            token: token.into(),
        }
    }
}

/// Reasons an evaluation fails
///
/// Any child failure aborts the enclosing operation and is returned to the
/// caller unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Right operand of DIVIDE or MODULUS was zero
    #[error("Division by zero")]
    DivisionByZero,

    /// The cell resolver could not supply a value
    #[error("Cell resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// A cell range appeared outside an aggregate argument list
    #[error("Cell range is only valid as an aggregate function argument")]
    RangeOutsideAggregate,

    /// An argument list node appeared outside a function
    #[error("Argument list is only valid as a function argument")]
    ListOutsideFunction,

    /// The resolver answered with the wrong number of values
    #[error("Resolver returned {actual} values for a reference of {expected} cells")]
    ShapeMismatch { expected: u64, actual: usize },

    /// An operand could not be coerced to the type the operator needs
    #[error("{op} cannot use a {found} operand")]
    TypeMismatch { op: OperatorKind, found: ValueKind },

    /// The operation would produce NaN or an infinity
    #[error("{0} produced a non-finite result")]
    NotFinite(OperatorKind),

    /// A node carries the wrong number of children for its operator
    #[error("Wrong number of arguments for {op}: expected {expected}, got {actual}")]
    Arity {
        op: OperatorKind,
        expected: String,
        actual: usize,
    },

    /// Evaluation nested deeper than the configured limit
    #[error("Evaluation depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

/// Errors reported by a [`CellResolver`](crate::CellResolver)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// The reference text is not a valid cell address
    #[error(transparent)]
    Address(#[from] tally_core::Error),

    /// The address lies outside the data the resolver holds
    #[error("Invalid cell {0}")]
    OutOfBounds(CellAddress),

    /// The cell's formula refers back to a cell being evaluated
    #[error("Circular dependency with {0}")]
    Circular(CellAddress),

    /// The cell's own formula failed to compile or evaluate
    #[error("Formula in {cell} failed: {reason}")]
    Formula { cell: CellAddress, reason: String },

    /// Formula cells nested deeper than the resolver allows
    #[error("Formula cells nested more than {0} levels deep")]
    TooDeep(usize),

    /// The resolver has no cell data at all
    #[error("No cell data available: {0}")]
    Unavailable(String),
}

/// Either failure class, for callers that compile and evaluate in one step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The formula did not compile
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The compiled formula failed to evaluate
    #[error(transparent)]
    Eval(#[from] EvalError),
}
