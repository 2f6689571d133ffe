//! Formula Abstract Syntax Tree types

use crate::value::Value;
use std::fmt;

/// Every operation a formula can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    // === Boolean ===
    And,
    Or,
    Not,
    If,

    // === Nullary ===
    Pi,

    // === Unary math ===
    Abs,
    Sqrt,
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    Exp,
    Ln,
    Log,

    // === String ===
    Len,
    Left,
    Right,
    Mid,
    Concat,

    // === Aggregate (variable arity) ===
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountA,

    // === Comparison ===
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,

    // === Arithmetic ===
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,

    // === Structural ===
    List,

    // === References ===
    Cell,
    CellRange,
}

impl OperatorKind {
    /// Upper-case name used by the tree dump
    pub fn name(self) -> &'static str {
        use OperatorKind::*;
        match self {
            And => "AND",
            Or => "OR",
            Not => "NOT",
            If => "IF",
            Pi => "PI",
            Abs => "ABS",
            Sqrt => "SQRT",
            Cos => "COS",
            Sin => "SIN",
            Tan => "TAN",
            Acos => "ACOS",
            Asin => "ASIN",
            Atan => "ATAN",
            Exp => "EXP",
            Ln => "LN",
            Log => "LOG",
            Len => "LEN",
            Left => "LEFT",
            Right => "RIGHT",
            Mid => "MID",
            Concat => "CONCAT",
            Sum => "SUM",
            Average => "AVERAGE",
            Min => "MIN",
            Max => "MAX",
            Count => "COUNT",
            CountA => "COUNTA",
            Eq => "EQ",
            Ne => "NE",
            Le => "LE",
            Ge => "GE",
            Lt => "LT",
            Gt => "GT",
            Add => "ADD",
            Subtract => "SUBTRACT",
            Multiply => "MULTIPLY",
            Divide => "DIVIDE",
            Modulus => "MODULUS",
            List => "LIST",
            Cell => "CELL",
            CellRange => "CELL_RANGE",
        }
    }

    pub fn is_unary_math(self) -> bool {
        use OperatorKind::*;
        matches!(
            self,
            Abs | Sqrt | Cos | Sin | Tan | Acos | Asin | Atan | Exp | Ln | Log
        )
    }

    pub fn is_aggregate(self) -> bool {
        use OperatorKind::*;
        matches!(self, Sum | Average | Min | Max | Count | CountA)
    }

    pub fn is_comparison(self) -> bool {
        use OperatorKind::*;
        matches!(self, Eq | Ne | Le | Ge | Lt | Gt)
    }

    pub fn is_arithmetic(self) -> bool {
        use OperatorKind::*;
        matches!(self, Add | Subtract | Multiply | Divide | Modulus)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of a compiled formula
///
/// Each node owns its children outright, so the tree has no sharing and no
/// cycles and dropping the root releases every descendant once.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Constant(Value),
    Operation {
        op: OperatorKind,
        children: Vec<AstNode>,
    },
}

impl AstNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        AstNode::Constant(value.into())
    }

    pub fn operation(op: OperatorKind, children: Vec<AstNode>) -> Self {
        AstNode::Operation { op, children }
    }

    /// `[ID]`: the identifier is kept verbatim for the resolver to decode
    pub fn cell(reference: impl Into<String>) -> Self {
        AstNode::operation(
            OperatorKind::Cell,
            vec![AstNode::Constant(Value::String(reference.into()))],
        )
    }

    /// `[ID1:ID2]`
    pub fn cell_range(start: impl Into<String>, end: impl Into<String>) -> Self {
        AstNode::operation(
            OperatorKind::CellRange,
            vec![
                AstNode::Constant(Value::String(start.into())),
                AstNode::Constant(Value::String(end.into())),
            ],
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, AstNode::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            AstNode::Constant(v) => Some(v),
            AstNode::Operation { .. } => None,
        }
    }

    pub fn op(&self) -> Option<OperatorKind> {
        match self {
            AstNode::Constant(_) => None,
            AstNode::Operation { op, .. } => Some(*op),
        }
    }

    pub fn children(&self) -> &[AstNode] {
        match self {
            AstNode::Constant(_) => &[],
            AstNode::Operation { children, .. } => children,
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(AstNode::node_count).sum::<usize>()
    }

    /// Operations on the longest path from this node down to a constant
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0)];
        while let Some((node, above)) = pending.pop() {
            if let AstNode::Operation { children, .. } = node {
                deepest = deepest.max(above + 1);
                pending.extend(children.iter().map(|child| (child, above + 1)));
            }
        }
        deepest
    }

    /// Render the tree, one node per line, children indented two spaces
    ///
    /// Constants are printed as formula literals so that a numeric
    /// constant's dump compiles back to the same value.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, indent: usize) {
        for _ in 0..indent {
            out.push_str("  ");
        }
        match self {
            AstNode::Constant(v) => {
                out.push_str(&v.to_literal());
                out.push('\n');
            }
            AstNode::Operation { op, children } => {
                out.push_str(op.name());
                out.push('\n');
                for child in children {
                    child.dump_into(out, indent + 1);
                }
            }
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

impl From<Value> for AstNode {
    fn from(value: Value) -> Self {
        AstNode::Constant(value)
    }
}
