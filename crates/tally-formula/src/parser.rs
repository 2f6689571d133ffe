//! Formula parser
//!
//! A recursive descent parser over the token stream with this precedence,
//! lowest to highest:
//!
//! 1. Comparison: `=`, `<>`, `!=`, `<`, `>`, `<=`, `=<`, `>=`, `=>`
//! 2. Addition/Subtraction: `+`, `-`
//! 3. Concatenation: `&`
//! 4. Multiplication/Division: `*`, `/`
//! 5. Modulus: `%`
//! 6. Unary minus
//! 7. Primary: literals, `[cell]` references, function calls, parentheses

use crate::ast::{AstNode, OperatorKind};
use crate::error::{ParseResult, SyntaxError};
use crate::lexer::{FunctionArity, Lexer, Token};
use crate::value::Value;

/// Deepest allowed nesting of parentheses, calls and unary minus, and of
/// operations in the compiled tree
pub const MAX_NESTING: usize = 256;

/// Most operation nodes one formula may produce
pub const MAX_OPERATIONS: usize = 4096;

const END_OF_FORMULA: &str = "end of formula";

/// Compile formula text into an AST
///
/// # Example
/// ```rust
/// use tally_formula::compile;
///
/// let ast = compile("1+2*3").unwrap();
/// let ast = compile("SUM([A1:A10])").unwrap();
/// let ast = compile("IF([A1]>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn compile(formula: &str) -> ParseResult<AstNode> {
    let result = compile_inner(formula);
    if let Err(e) = &result {
        log::debug!("Failed to compile '{}': {}", formula, e);
    }
    result
}

fn compile_inner(formula: &str) -> ParseResult<AstNode> {
    let mut parser = FormulaParser::new(formula)?;

    if parser.current.is_none() {
        return Err(SyntaxError::new("empty formula", END_OF_FORMULA));
    }

    let expr = parser.parse_expression()?;

    if parser.current.is_some() {
        return Err(parser.unexpected(END_OF_FORMULA));
    }

    // Operator chains nest in the tree without nesting in the source
    let depth = expr.depth();
    if depth > MAX_NESTING {
        return Err(SyntaxError::new(
            format!(
                "formula nested {} operations deep, more than {}",
                depth, MAX_NESTING
            ),
            END_OF_FORMULA,
        ));
    }

    Ok(expr)
}

/// Negate an operand at parse time
///
/// Numeric constants are folded in place. Everything else, including the
/// one integer whose negation overflows, becomes `MULTIPLY(-1, operand)`.
pub fn negate(operand: AstNode) -> AstNode {
    match operand {
        AstNode::Constant(Value::Integer(i)) if i != i64::MIN => AstNode::constant(-i),
        AstNode::Constant(Value::Float(f)) => AstNode::constant(-f),
        other => AstNode::operation(
            OperatorKind::Multiply,
            vec![AstNode::constant(-1i64), other],
        ),
    }
}

/// Parser state: the lexer plus one token of lookahead
struct FormulaParser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    nesting: usize,
    operations: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            nesting: 0,
            operations: 0,
        })
    }

    // === Token handling ===

    /// Take the current token and read the next one
    fn advance(&mut self) -> ParseResult<Option<Token>> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.current.as_ref() == Some(token)
    }

    /// Consume the current token if it equals `token`
    fn eat(&mut self, token: &Token) -> ParseResult<bool> {
        if self.peek_is(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: &Token) -> ParseResult<()> {
        if self.eat(token)? {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_separator(&mut self) -> ParseResult<()> {
        if self.eat_separator()? {
            Ok(())
        } else {
            Err(self.unexpected("',' or ';'"))
        }
    }

    fn eat_separator(&mut self) -> ParseResult<bool> {
        Ok(self.eat(&Token::Comma)? || self.eat(&Token::Semicolon)?)
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.current {
            Some(Token::Identifier(_)) => match self.advance()? {
                Some(Token::Identifier(name)) => Ok(name),
                _ => Err(self.unexpected("a cell identifier")),
            },
            _ => Err(self.unexpected("a cell identifier")),
        }
    }

    fn describe_current(&self) -> String {
        self.current
            .as_ref()
            .map_or_else(|| END_OF_FORMULA.to_string(), Token::describe)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(format!("expected {}", expected), self.describe_current())
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(SyntaxError::new(
                format!("formula nested more than {} levels deep", MAX_NESTING),
                self.describe_current(),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn operation(&mut self, op: OperatorKind, children: Vec<AstNode>) -> ParseResult<AstNode> {
        self.operations += 1;
        if self.operations > MAX_OPERATIONS {
            return Err(SyntaxError::new(
                format!("formula has more than {} operations", MAX_OPERATIONS),
                self.describe_current(),
            ));
        }
        Ok(AstNode::operation(op, children))
    }

    fn binary(&mut self, op: OperatorKind, left: AstNode, right: AstNode) -> ParseResult<AstNode> {
        self.operation(op, vec![left, right])
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self) -> ParseResult<AstNode> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<AstNode> {
        let mut left = self.parse_additive()?;

        while let Some(op) = self.comparison_operator()? {
            let right = self.parse_additive()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    /// Consume a one- or two-token comparison operator if one is next
    fn comparison_operator(&mut self) -> ParseResult<Option<OperatorKind>> {
        let op = if self.eat(&Token::Equal)? {
            if self.eat(&Token::Less)? {
                OperatorKind::Le
            } else if self.eat(&Token::Greater)? {
                OperatorKind::Ge
            } else {
                OperatorKind::Eq
            }
        } else if self.eat(&Token::Less)? {
            if self.eat(&Token::Greater)? {
                OperatorKind::Ne
            } else if self.eat(&Token::Equal)? {
                OperatorKind::Le
            } else {
                OperatorKind::Lt
            }
        } else if self.eat(&Token::Greater)? {
            if self.eat(&Token::Equal)? {
                OperatorKind::Ge
            } else {
                OperatorKind::Gt
            }
        } else if self.eat(&Token::Bang)? {
            self.expect(&Token::Equal)?;
            OperatorKind::Ne
        } else {
            return Ok(None);
        };

        Ok(Some(op))
    }

    fn parse_additive(&mut self) -> ParseResult<AstNode> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = if self.eat(&Token::Plus)? {
                OperatorKind::Add
            } else if self.eat(&Token::Minus)? {
                OperatorKind::Subtract
            } else {
                break;
            };

            let right = self.parse_concatenation()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> ParseResult<AstNode> {
        let mut left = self.parse_multiplicative()?;

        while self.eat(&Token::Ampersand)? {
            let right = self.parse_multiplicative()?;
            left = self.binary(OperatorKind::Concat, left, right)?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<AstNode> {
        let mut left = self.parse_modulus()?;

        loop {
            let op = if self.eat(&Token::Star)? {
                OperatorKind::Multiply
            } else if self.eat(&Token::Slash)? {
                OperatorKind::Divide
            } else {
                break;
            };

            let right = self.parse_modulus()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_modulus(&mut self) -> ParseResult<AstNode> {
        let mut left = self.parse_unary()?;

        while self.eat(&Token::Percent)? {
            let right = self.parse_unary()?;
            left = self.binary(OperatorKind::Modulus, left, right)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<AstNode> {
        if self.eat(&Token::Minus)? {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            return Ok(negate(operand));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<AstNode> {
        let Some(token) = self.advance()? else {
            return Err(SyntaxError::new(
                "expected a value",
                END_OF_FORMULA,
            ));
        };

        match token {
            Token::Integer(i) => Ok(AstNode::constant(i)),
            Token::Float(f) => Ok(AstNode::constant(f)),
            Token::String(s) => Ok(AstNode::constant(s)),

            Token::LeftParen => {
                self.enter()?;
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                self.leave();
                Ok(expr)
            }

            Token::LeftBracket => self.parse_cell_reference(),

            Token::Not => {
                let args = self.parse_fixed_arguments(1)?;
                self.operation(OperatorKind::Not, args)
            }

            Token::If => self.parse_if(),

            Token::And => self.parse_list_call(OperatorKind::And),
            Token::Or => self.parse_list_call(OperatorKind::Or),

            Token::Function { op, arity } => match arity {
                FunctionArity::None => {
                    let args = self.parse_fixed_arguments(0)?;
                    self.operation(op, args)
                }
                FunctionArity::One => {
                    let args = self.parse_fixed_arguments(1)?;
                    self.operation(op, args)
                }
                FunctionArity::Two => {
                    let args = self.parse_fixed_arguments(2)?;
                    self.operation(op, args)
                }
                FunctionArity::Three => {
                    let args = self.parse_fixed_arguments(3)?;
                    self.operation(op, args)
                }
                FunctionArity::Variable => self.parse_list_call(op),
            },

            other => Err(SyntaxError::new("expected a value", other.describe())),
        }
    }

    /// `[ID]` or `[ID:ID]`, after the opening bracket
    fn parse_cell_reference(&mut self) -> ParseResult<AstNode> {
        let start = self.expect_identifier()?;

        if self.eat(&Token::Colon)? {
            let end = self.expect_identifier()?;
            self.expect(&Token::RightBracket)?;
            return self.operation(
                OperatorKind::CellRange,
                vec![AstNode::constant(start), AstNode::constant(end)],
            );
        }

        self.expect(&Token::RightBracket)?;
        self.operation(OperatorKind::Cell, vec![AstNode::constant(start)])
    }

    /// `(expr, expr, ...)` with exactly `count` arguments
    fn parse_fixed_arguments(&mut self, count: usize) -> ParseResult<Vec<AstNode>> {
        self.enter()?;
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                self.expect_separator()?;
            }
            args.push(self.parse_expression()?);
        }

        self.expect(&Token::RightParen)?;
        self.leave();
        Ok(args)
    }

    /// `IF(cond, then)` or `IF(cond, then, else)`
    fn parse_if(&mut self) -> ParseResult<AstNode> {
        self.enter()?;
        self.expect(&Token::LeftParen)?;

        let mut args = vec![self.parse_expression()?];
        self.expect_separator()?;
        args.push(self.parse_expression()?);
        if self.eat_separator()? {
            args.push(self.parse_expression()?);
        }

        self.expect(&Token::RightParen)?;
        self.leave();
        self.operation(OperatorKind::If, args)
    }

    /// `NAME(arg {, arg}*)` wrapped as `NAME(LIST(args...))`
    ///
    /// Arguments may be plain expressions or `[A1:B2]` ranges; the list
    /// keeps them in source order.
    fn parse_list_call(&mut self, op: OperatorKind) -> ParseResult<AstNode> {
        self.enter()?;
        self.expect(&Token::LeftParen)?;

        let mut items = vec![self.parse_expression()?];
        while self.eat_separator()? {
            items.push(self.parse_expression()?);
        }

        self.expect(&Token::RightParen)?;
        self.leave();

        let list = self.operation(OperatorKind::List, items)?;
        self.operation(op, vec![list])
    }
}
