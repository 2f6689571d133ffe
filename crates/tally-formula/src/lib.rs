//! # tally-formula
//!
//! Spreadsheet formula engine for tally.
//!
//! This crate provides:
//! - Tokenizing and parsing formula text into an [`AstNode`] tree
//! - Evaluating a tree to a typed [`Value`]
//! - The [`CellResolver`] boundary for `[A1]` and `[A1:B2]` references
//! - An in-memory [`Sheet`] whose formula cells can refer to each other
//!
//! ## Example
//!
//! ```rust
//! use tally_formula::{compile, evaluate, Sheet, Value};
//!
//! let mut sheet = Sheet::new();
//! for (cell, input) in [("A1", "1"), ("A2", "2"), ("A3", "=[A1]+[A2]")] {
//!     sheet.set_input(cell, input).unwrap();
//! }
//!
//! let ast = compile("IF(SUM([A1:A3])>0,\"pos\",\"neg\")").unwrap();
//! let result = evaluate(&ast, &mut sheet.resolver()).unwrap();
//! assert_eq!(result, Value::from("pos"));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod sheet;
pub mod value;

pub use ast::{AstNode, OperatorKind};
pub use error::{
    EvalError, EvalResult, FormulaError, FormulaResult, ParseResult, ResolveError, ResolveResult,
    SyntaxError,
};
pub use evaluator::{
    calculate, compare_values, evaluate, evaluate_with_options, EvaluationOptions,
};
pub use parser::compile;
pub use resolver::{CellResolver, NoCells};
pub use sheet::{formula_body, CellContent, ResolveStats, Sheet, SheetResolver};
pub use tally_core::{CellAddress, CellRange};
pub use value::{Number, Value, ValueKind};
