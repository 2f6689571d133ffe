//! Formula evaluator
//!
//! Walks a compiled [`AstNode`] depth-first, left to right, and produces a
//! [`Value`]. Cell references are answered by a caller-supplied
//! [`CellResolver`]. Any failure below an operation aborts that operation
//! and travels up to the caller unchanged.

use crate::ast::{AstNode, OperatorKind};
use crate::error::{EvalError, EvalResult, FormulaResult};
use crate::functions::{self, logical, math, statistical, text};
use crate::parser::compile;
use crate::resolver::CellResolver;
use crate::value::{Number, Value};
use std::cmp::Ordering;
use tally_core::{CellAddress, CellRange};

/// Default for [`EvaluationOptions::max_depth`], the tree depth [`compile`]
/// accepts
pub const DEFAULT_MAX_DEPTH: usize = crate::parser::MAX_NESTING;

/// Limits applied while evaluating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Deepest operation nesting allowed, counting the depth of any
    /// evaluation the resolver is nested in as reported by
    /// [`CellResolver::nesting_depth`]
    pub max_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Evaluate a compiled formula
///
/// # Example
/// ```rust
/// use tally_formula::{compile, evaluate, NoCells, Value};
///
/// let ast = compile("LEFT(\"hello\",3)").unwrap();
/// assert_eq!(evaluate(&ast, &mut NoCells).unwrap(), Value::from("hel"));
/// ```
pub fn evaluate(node: &AstNode, resolver: &mut dyn CellResolver) -> EvalResult<Value> {
    evaluate_with_options(node, resolver, EvaluationOptions::default())
}

/// Evaluate a compiled formula with explicit limits
pub fn evaluate_with_options(
    node: &AstNode,
    resolver: &mut dyn CellResolver,
    options: EvaluationOptions,
) -> EvalResult<Value> {
    let mut evaluator = Evaluator {
        resolver,
        options,
        depth: 0,
    };
    let result = evaluator.eval(node);
    match &result {
        Ok(value) => log::trace!("Evaluated to {value:?}"),
        Err(e) => log::debug!("Evaluation failed: {e}"),
    }
    result
}

/// Compile and evaluate in one step
pub fn calculate(formula: &str, resolver: &mut dyn CellResolver) -> FormulaResult<Value> {
    let ast = compile(formula)?;
    Ok(evaluate(&ast, resolver)?)
}

impl AstNode {
    /// Evaluate this node and replace it with the resulting constant
    ///
    /// On failure the node is left as it was.
    pub fn fold(&mut self, resolver: &mut dyn CellResolver) -> EvalResult<()> {
        self.fold_with_options(resolver, EvaluationOptions::default())
    }

    /// [`fold`](AstNode::fold) with explicit limits
    pub fn fold_with_options(
        &mut self,
        resolver: &mut dyn CellResolver,
        options: EvaluationOptions,
    ) -> EvalResult<()> {
        let value = evaluate_with_options(self, resolver, options)?;
        *self = AstNode::Constant(value);
        Ok(())
    }
}

/// Order two values for the comparison operators
///
/// When both sides coerce to numbers they compare numerically, otherwise
/// their text forms compare by code point. `None` only for NaN operands.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left.as_number(), right.as_number()) {
        (Some(Number::Integer(a)), Some(Number::Integer(b))) => Some(a.cmp(&b)),
        (Some(a), Some(b)) => a.to_f64().partial_cmp(&b.to_f64()),
        _ => Some(left.as_string().cmp(&right.as_string())),
    }
}

/// Children an aggregate, AND or OR actually iterates: the items of a sole
/// LIST child, or the children themselves
fn arguments(children: &[AstNode]) -> &[AstNode] {
    match children {
        [list] if list.op() == Some(OperatorKind::List) => list.children(),
        _ => children,
    }
}

struct Evaluator<'r> {
    resolver: &'r mut dyn CellResolver,
    options: EvaluationOptions,
    depth: usize,
}

impl Evaluator<'_> {
    fn eval(&mut self, node: &AstNode) -> EvalResult<Value> {
        match node {
            AstNode::Constant(value) => Ok(value.clone()),
            AstNode::Operation { op, children } => {
                self.enter()?;
                let result = self.eval_operation(*op, children);
                self.depth -= 1;
                result
            }
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        if self.depth + self.resolver.nesting_depth() >= self.options.max_depth {
            return Err(EvalError::DepthExceeded(self.options.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn eval_operation(&mut self, op: OperatorKind, children: &[AstNode]) -> EvalResult<Value> {
        check_arity(op, children)?;

        use OperatorKind::*;
        match op {
            // === Boolean ===
            If => {
                let condition = self.eval(&children[0])?;
                if condition.as_bool() {
                    self.eval(&children[1])
                } else {
                    match children.get(2) {
                        Some(otherwise) => self.eval(otherwise),
                        None => Ok(Value::Empty),
                    }
                }
            }
            Not => Ok(logical::fn_not(&self.eval(&children[0])?)),
            And => Ok(logical::fn_and(&self.collect(arguments(children))?)),
            Or => Ok(logical::fn_or(&self.collect(arguments(children))?)),

            // === Math ===
            Pi => Ok(math::fn_pi()),
            Abs => self.unary(op, children, f64::abs),
            Sqrt => self.unary(op, children, f64::sqrt),
            Cos => self.unary(op, children, f64::cos),
            Sin => self.unary(op, children, f64::sin),
            Tan => self.unary(op, children, f64::tan),
            Acos => self.unary(op, children, f64::acos),
            Asin => self.unary(op, children, f64::asin),
            Atan => self.unary(op, children, f64::atan),
            Exp => self.unary(op, children, f64::exp),
            Ln => self.unary(op, children, f64::ln),
            Log => self.unary(op, children, f64::log10),

            // === Text ===
            Len => Ok(text::fn_len(&self.eval(&children[0])?)),
            Left => {
                let [s, n] = self.eval_pair(children)?;
                text::fn_left(&s, &n)
            }
            Right => {
                let [s, n] = self.eval_pair(children)?;
                text::fn_right(&s, &n)
            }
            Mid => {
                let s = self.eval(&children[0])?;
                let start = self.eval(&children[1])?;
                let len = self.eval(&children[2])?;
                text::fn_mid(&s, &start, &len)
            }
            Concat => {
                let [a, b] = self.eval_pair(children)?;
                Ok(text::fn_concat(&a, &b))
            }

            // === Aggregates ===
            Sum => statistical::fn_sum(&self.collect(arguments(children))?),
            Average => statistical::fn_average(&self.collect(arguments(children))?),
            Min => Ok(statistical::fn_min(&self.collect(arguments(children))?)),
            Max => Ok(statistical::fn_max(&self.collect(arguments(children))?)),
            Count => Ok(statistical::fn_count(&self.collect(arguments(children))?)),
            CountA => Ok(statistical::fn_counta(&self.collect(arguments(children))?)),

            // === Comparison ===
            Eq => self.compare(children, |o| o == Ordering::Equal),
            Ne => self.compare(children, |o| o != Ordering::Equal),
            Lt => self.compare(children, |o| o == Ordering::Less),
            Gt => self.compare(children, |o| o == Ordering::Greater),
            Le => self.compare(children, |o| o != Ordering::Greater),
            Ge => self.compare(children, |o| o != Ordering::Less),

            // === Arithmetic ===
            Add | Subtract | Multiply | Divide | Modulus => {
                let [a, b] = self.eval_pair(children)?;
                math::arithmetic(op, &a, &b)
            }

            // === Structural and references ===
            List => Err(EvalError::ListOutsideFunction),
            CellRange => Err(EvalError::RangeOutsideAggregate),
            Cell => {
                let values = self.resolve(op, children)?;
                let actual = values.len();
                match <[Value; 1]>::try_from(values) {
                    Ok([value]) => Ok(value),
                    Err(_) => Err(EvalError::ShapeMismatch {
                        expected: 1,
                        actual,
                    }),
                }
            }
        }
    }

    fn eval_pair(&mut self, children: &[AstNode]) -> EvalResult<[Value; 2]> {
        let left = self.eval(&children[0])?;
        let right = self.eval(&children[1])?;
        Ok([left, right])
    }

    fn unary(
        &mut self,
        op: OperatorKind,
        children: &[AstNode],
        f: fn(f64) -> f64,
    ) -> EvalResult<Value> {
        let value = self.eval(&children[0])?;
        math::unary(op, &value, f)
    }

    fn compare(
        &mut self,
        children: &[AstNode],
        accept: fn(Ordering) -> bool,
    ) -> EvalResult<Value> {
        let [a, b] = self.eval_pair(children)?;
        Ok(Value::from_bool(
            compare_values(&a, &b).map_or(false, accept),
        ))
    }

    /// Evaluate argument items into one flat list
    ///
    /// References expand to their cells and nested LISTs are spliced in.
    fn collect(&mut self, items: &[AstNode]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        self.collect_into(items, &mut values)?;
        Ok(values)
    }

    fn collect_into(&mut self, items: &[AstNode], out: &mut Vec<Value>) -> EvalResult<()> {
        for item in items {
            match item {
                AstNode::Operation {
                    op: op @ (OperatorKind::Cell | OperatorKind::CellRange),
                    children,
                } => {
                    check_arity(*op, children)?;
                    self.enter()?;
                    let resolved = self.resolve(*op, children);
                    self.depth -= 1;
                    out.extend(resolved?);
                }
                AstNode::Operation {
                    op: OperatorKind::List,
                    children,
                } => {
                    self.enter()?;
                    let nested = self.collect_into(children, out);
                    self.depth -= 1;
                    nested?;
                }
                other => out.push(self.eval(other)?),
            }
        }
        Ok(())
    }

    /// Look up the cells of a CELL or CELL_RANGE node
    fn resolve(&mut self, op: OperatorKind, children: &[AstNode]) -> EvalResult<Vec<Value>> {
        let start = self.address(op, &children[0])?;
        let end = match children.get(1) {
            Some(node) => self.address(op, node)?,
            None => start,
        };

        let range = CellRange::new(start, end);
        let depth = self.depth + self.resolver.nesting_depth();
        let values = self.resolver.evaluate_range_at(range, depth)?;

        if values.len() as u64 != range.cell_count() {
            return Err(EvalError::ShapeMismatch {
                expected: range.cell_count(),
                actual: values.len(),
            });
        }
        if values
            .iter()
            .any(|v| matches!(v, Value::Float(f) if !f.is_finite()))
        {
            return Err(EvalError::NotFinite(op));
        }

        Ok(values)
    }

    fn address(&mut self, op: OperatorKind, node: &AstNode) -> EvalResult<CellAddress> {
        match self.eval(node)? {
            Value::String(reference) => Ok(self.resolver.decode_reference(&reference)?),
            other => Err(EvalError::TypeMismatch {
                op,
                found: other.kind(),
            }),
        }
    }
}

fn check_arity(op: OperatorKind, children: &[AstNode]) -> EvalResult<()> {
    let expected = functions::arity(op);
    if expected.accepts(children.len()) {
        Ok(())
    } else {
        Err(EvalError::Arity {
            op,
            expected: expected.to_string(),
            actual: children.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormulaError, ResolveError, ResolveResult};
    use crate::resolver::NoCells;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> EvalResult<Value> {
        let ast = compile(formula).unwrap();
        evaluate(&ast, &mut NoCells)
    }

    /// Column A holds 1, 2, 3; everything else is "x"
    fn column(range: CellRange) -> ResolveResult<Vec<Value>> {
        Ok(range
            .cells()
            .map(|cell| match (cell.col, cell.row) {
                (0, row) if row < 3 => Value::Integer(row as i64 + 1),
                _ => Value::from("x"),
            })
            .collect())
    }

    fn eval_with_column(formula: &str) -> EvalResult<Value> {
        let ast = compile(formula).unwrap();
        evaluate(&ast, &mut column)
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1+2*3"), Ok(Value::Integer(7)));
        assert_eq!(eval("(1+2)*3"), Ok(Value::Integer(9)));
        assert_eq!(eval("10-2-3"), Ok(Value::Integer(5)));
        assert_eq!(eval("2*7%4"), Ok(Value::Integer(6)));
        assert_eq!(eval("-2*-3"), Ok(Value::Integer(6)));
        assert_eq!(eval("1/4"), Ok(Value::Float(0.25)));
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert_eq!(eval("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1%0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("MOD(5,0.0)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_comparisons() {
        for formula in ["1<=2", "1=<2", "1<>2", "1!=2", "2>=2", "2=>1", "3>2", "1<2", "2=2.0"] {
            assert_eq!(eval(formula), Ok(Value::Integer(1)), "{}", formula);
        }
        for formula in ["1>2", "1=2", "2<>2", "\"b\"<\"a\""] {
            assert_eq!(eval(formula), Ok(Value::Integer(0)), "{}", formula);
        }
        assert_eq!(eval("\"10\">9"), Ok(Value::Integer(1)));
        assert_eq!(eval("\"abc\"=\"abc\""), Ok(Value::Integer(1)));
        assert_eq!(eval("\"B\"<\"a\""), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_compare_empty() {
        assert_eq!(compare_values(&Value::Empty, &Value::Empty), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::Empty, &Value::Integer(0)), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::Empty, &Value::from("a")), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::Float(f64::NAN), &Value::Integer(1)), None);
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(eval("LEFT(\"hello\",3)"), Ok(Value::from("hel")));
        assert_eq!(eval("RIGHT(\"hello\";2)"), Ok(Value::from("lo")));
        assert_eq!(eval("MID(\"hello\",2,3)"), Ok(Value::from("ell")));
        assert_eq!(eval("LEN(\"hello\")"), Ok(Value::Integer(5)));
        assert_eq!(eval("\"a\"&\"b\""), Ok(Value::from("ab")));
        assert_eq!(eval("1&2+3"), Ok(Value::Integer(15)));
    }

    #[test]
    fn test_control_flow() {
        assert_eq!(eval("IF(1>0,\"yes\",\"no\")"), Ok(Value::from("yes")));
        assert_eq!(eval("IF(0,\"yes\",\"no\")"), Ok(Value::from("no")));
        assert_eq!(eval("IF(0,\"yes\")"), Ok(Value::Empty));
        assert_eq!(eval("IF(1,2,1/0)"), Ok(Value::Integer(2)));
        assert_eq!(eval("NOT(0)"), Ok(Value::Integer(1)));
        assert_eq!(eval("AND(1,\"TRUE\",2.5)"), Ok(Value::Integer(1)));
        assert_eq!(eval("OR(0,\"\",\"no\")"), Ok(Value::Integer(0)));
    }

    #[test]
    fn test_and_evaluates_every_argument() {
        assert_eq!(eval("AND(0,1/0)"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("OR(1,1/0)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(eval("ABS(-2)"), Ok(Value::Float(2.0)));
        assert_eq!(eval("SQRT(16)"), Ok(Value::Float(4.0)));
        assert_eq!(eval("LOG10(1000)"), Ok(Value::Float(3.0)));
        assert_eq!(eval("LN(1)"), Ok(Value::Float(0.0)));
        assert_eq!(eval("PI()"), Ok(Value::Float(std::f64::consts::PI)));
        assert_eq!(eval("SQRT(-1)"), Err(EvalError::NotFinite(OperatorKind::Sqrt)));
        assert_eq!(eval("ACOS(2)"), Err(EvalError::NotFinite(OperatorKind::Acos)));
    }

    #[test]
    fn test_aggregates_over_ranges() {
        assert_eq!(eval_with_column("SUM([A1:A3])"), Ok(Value::Float(6.0)));
        assert_eq!(eval_with_column("COUNT([A1:A3])"), Ok(Value::Integer(3)));
        assert_eq!(eval_with_column("COUNTA([A1:B3])"), Ok(Value::Integer(6)));
        assert_eq!(eval_with_column("COUNT([A1:B3])"), Ok(Value::Integer(3)));
        assert_eq!(eval_with_column("AVERAGE([A1:B3])"), Ok(Value::Float(2.0)));
        assert_eq!(eval_with_column("MAX([A1:A3],10,\"99\")"), Ok(Value::Float(10.0)));
        assert_eq!(eval_with_column("MIN([A1],[A3])"), Ok(Value::Float(1.0)));
        assert_eq!(eval_with_column("SUM([A3:A1])"), Ok(Value::Float(6.0)));
        assert_eq!(eval_with_column("AVERAGE([B1:B3])"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_with_column("AND([A1:A3])"), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_single_cells() {
        assert_eq!(eval_with_column("[A2]*10"), Ok(Value::Integer(20)));
        assert_eq!(eval_with_column("[.a3]"), Ok(Value::Integer(3)));
        assert_eq!(eval_with_column("[B1]&\"!\""), Ok(Value::from("x!")));
        assert!(matches!(
            eval_with_column("[Price]"),
            Err(EvalError::Resolve(ResolveError::Address(_)))
        ));
    }

    #[test]
    fn test_range_outside_aggregate() {
        assert_eq!(eval_with_column("[A1:A3]"), Err(EvalError::RangeOutsideAggregate));
        assert_eq!(eval_with_column("1+[A1:A3]"), Err(EvalError::RangeOutsideAggregate));
    }

    #[test]
    fn test_resolver_failure_propagates() {
        assert!(matches!(
            eval("[A1]+1"),
            Err(EvalError::Resolve(ResolveError::Unavailable(_)))
        ));
        assert!(matches!(
            eval("SUM(1,[A1:A2])"),
            Err(EvalError::Resolve(ResolveError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_resolver_shape_mismatch() {
        let mut short = |_: CellRange| -> ResolveResult<Vec<Value>> { Ok(vec![Value::Integer(1)]) };
        let ast = compile("SUM([A1:A3])").unwrap();
        assert_eq!(
            evaluate(&ast, &mut short),
            Err(EvalError::ShapeMismatch {
                expected: 3,
                actual: 1
            })
        );

        let mut none = |_: CellRange| -> ResolveResult<Vec<Value>> { Ok(vec![]) };
        let ast = compile("[A1]").unwrap();
        assert_eq!(
            evaluate(&ast, &mut none),
            Err(EvalError::ShapeMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_resolver_nan_fails() {
        let mut nan = |_: CellRange| -> ResolveResult<Vec<Value>> { Ok(vec![Value::Float(f64::NAN)]) };
        let ast = compile("[A1]").unwrap();
        assert_eq!(
            evaluate(&ast, &mut nan),
            Err(EvalError::NotFinite(OperatorKind::Cell))
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            eval("\"abc\"*2"),
            Err(EvalError::TypeMismatch {
                op: OperatorKind::Multiply,
                found: crate::value::ValueKind::String,
            })
        );
        assert_eq!(eval("\"3\"*2"), Ok(Value::Integer(6)));
    }

    #[test]
    fn test_hand_built_trees() {
        let list = AstNode::operation(OperatorKind::List, vec![AstNode::constant(1i64)]);
        assert_eq!(evaluate(&list, &mut NoCells), Err(EvalError::ListOutsideFunction));

        let direct = AstNode::operation(
            OperatorKind::Sum,
            vec![AstNode::constant(1i64), AstNode::constant(2.5)],
        );
        assert_eq!(evaluate(&direct, &mut NoCells), Ok(Value::Float(3.5)));

        let bad = AstNode::operation(OperatorKind::Left, vec![AstNode::constant("a")]);
        assert_eq!(
            evaluate(&bad, &mut NoCells),
            Err(EvalError::Arity {
                op: OperatorKind::Left,
                expected: "2".into(),
                actual: 1
            })
        );

        let numeric_cell = AstNode::operation(OperatorKind::Cell, vec![AstNode::constant(1i64)]);
        assert_eq!(
            evaluate(&numeric_cell, &mut NoCells),
            Err(EvalError::TypeMismatch {
                op: OperatorKind::Cell,
                found: crate::value::ValueKind::Integer,
            })
        );
    }

    #[test]
    fn test_fold_replaces_node() {
        let mut ast = compile("1+2*3").unwrap();
        ast.fold(&mut NoCells).unwrap();
        assert_eq!(ast, AstNode::constant(7i64));
        assert_eq!(ast.dump(), "7\n");

        let mut failing = compile("1/0").unwrap();
        let before = failing.clone();
        assert!(failing.fold(&mut NoCells).is_err());
        assert_eq!(failing, before);
    }

    #[test]
    fn test_depth_limit() {
        let ast = compile("ABS(ABS(ABS(1)))").unwrap();
        let tight = EvaluationOptions { max_depth: 2 };
        assert_eq!(
            evaluate_with_options(&ast, &mut NoCells, tight),
            Err(EvalError::DepthExceeded(2))
        );
        let enough = EvaluationOptions { max_depth: 3 };
        assert_eq!(
            evaluate_with_options(&ast, &mut NoCells, enough),
            Ok(Value::Float(1.0))
        );
    }

    #[test]
    fn test_calculate() {
        assert_eq!(calculate("2*(3+4)", &mut NoCells), Ok(Value::Integer(14)));
        assert!(matches!(
            calculate("2*(3+4", &mut NoCells),
            Err(FormulaError::Syntax(_))
        ));
        assert_eq!(
            calculate("1/0", &mut NoCells),
            Err(FormulaError::Eval(EvalError::DivisionByZero))
        );
    }
}
