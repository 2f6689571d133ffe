//! Formula tokenizer
//!
//! Turns formula text into [`Token`]s one at a time. Keywords are resolved
//! here, so the parser sees `SUM` as a variable-arity function token rather
//! than an identifier.

use crate::ast::OperatorKind;
use crate::error::{ParseResult, SyntaxError};
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Argument shape of a built-in function name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionArity {
    None,
    One,
    Two,
    Three,
    Variable,
}

/// A lexical unit of a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),

    /// Bare name, only meaningful inside `[...]` cell syntax
    Identifier(String),

    // Control keywords
    Not,
    And,
    Or,
    If,

    /// Built-in function name
    Function { op: OperatorKind, arity: FunctionArity },

    // Punctuation
    Plus,
    Minus,
    Ampersand,
    Star,
    Slash,
    Percent,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    Equal,
    Less,
    Greater,
    Bang,
    LeftBracket,
    RightBracket,
    Colon,
}

impl Token {
    /// Description used in syntax error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(i) => format!("number {}", i),
            Token::Float(f) => format!("number {:?}", f),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Identifier(s) => format!("identifier '{}'", s),
            Token::Not => "keyword NOT".into(),
            Token::And => "keyword AND".into(),
            Token::Or => "keyword OR".into(),
            Token::If => "keyword IF".into(),
            Token::Function { op, .. } => format!("function {}", op),
            other => match other.punctuation() {
                Some(c) => format!("'{}'", c),
                None => format!("{:?}", other),
            },
        }
    }

    fn punctuation(&self) -> Option<char> {
        Some(match self {
            Token::Plus => '+',
            Token::Minus => '-',
            Token::Ampersand => '&',
            Token::Star => '*',
            Token::Slash => '/',
            Token::Percent => '%',
            Token::Comma => ',',
            Token::Semicolon => ';',
            Token::LeftParen => '(',
            Token::RightParen => ')',
            Token::Equal => '=',
            Token::Less => '<',
            Token::Greater => '>',
            Token::Bang => '!',
            Token::LeftBracket => '[',
            Token::RightBracket => ']',
            Token::Colon => ':',
            _ => return None,
        })
    }
}

/// Keyword table, keyed by upper-case spelling
static KEYWORDS: Lazy<AHashMap<&'static str, Token>> = Lazy::new(|| {
    use FunctionArity as A;
    use OperatorKind as Op;

    let function = |op, arity| Token::Function { op, arity };
    let mut table = AHashMap::new();

    table.insert("TRUE", Token::Integer(1));
    table.insert("FALSE", Token::Integer(0));

    table.insert("NOT", Token::Not);
    table.insert("AND", Token::And);
    table.insert("OR", Token::Or);
    table.insert("IF", Token::If);

    table.insert("PI", function(Op::Pi, A::None));

    for (name, op) in [
        ("LEN", Op::Len),
        ("ABS", Op::Abs),
        ("SQRT", Op::Sqrt),
        ("COS", Op::Cos),
        ("SIN", Op::Sin),
        ("TAN", Op::Tan),
        ("ACOS", Op::Acos),
        ("ASIN", Op::Asin),
        ("ATAN", Op::Atan),
        ("EXP", Op::Exp),
        ("LN", Op::Ln),
        ("LOG", Op::Log),
        ("LOG10", Op::Log),
    ] {
        table.insert(name, function(op, A::One));
    }

    for (name, op) in [("MOD", Op::Modulus), ("LEFT", Op::Left), ("RIGHT", Op::Right)] {
        table.insert(name, function(op, A::Two));
    }

    table.insert("MID", function(Op::Mid, A::Three));

    for (name, op) in [
        ("SUM", Op::Sum),
        ("AVERAGE", Op::Average),
        ("MIN", Op::Min),
        ("MAX", Op::Max),
        ("COUNT", Op::Count),
        ("COUNTA", Op::CountA),
    ] {
        table.insert(name, function(op, A::Variable));
    }

    table
});

/// Cursor over formula text
///
/// Holds no state beyond the input and the current byte offset, so any
/// number of lexers can run at once.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Produce the next token, `Ok(None)` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token>> {
        self.skip_whitespace();

        let Some(&b) = self.input.as_bytes().get(self.pos) else {
            return Ok(None);
        };

        let token = match b {
            b'"' => self.scan_string()?,
            b'0'..=b'9' => self.scan_number()?,
            b'.' => self.scan_identifier(),
            b if b.is_ascii_alphabetic() => self.scan_identifier(),
            _ => self.scan_punctuation()?,
        };

        Ok(Some(token))
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_byte().map_or(false, |b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn scan_punctuation(&mut self) -> ParseResult<Token> {
        let rest = &self.input[self.pos..];
        let c = rest.chars().next().unwrap_or('\0');
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '&' => Token::Ampersand,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '=' => Token::Equal,
            '<' => Token::Less,
            '>' => Token::Greater,
            '!' => Token::Bang,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ':' => Token::Colon,
            _ => {
                return Err(SyntaxError::new(
                    format!("unexpected character at byte {}", self.pos),
                    format!("'{}'", c),
                ))
            }
        };
        self.pos += 1;
        Ok(token)
    }

    /// `"..."` with `\"`, `\'` and `''` standing for a single quote character
    /// and `\\` for a backslash
    fn scan_string(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        self.pos += 1;

        let mut s = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let mut chars = rest.chars();
            match chars.next() {
                None => {
                    return Err(SyntaxError::new(
                        format!("unterminated string starting at byte {}", start),
                        format!("string \"{}\"", s),
                    ))
                }
                Some('\\') if matches!(chars.next(), Some('"' | '\'' | '\\')) => {
                    s.push(rest.as_bytes()[1] as char);
                    self.pos += 2;
                }
                Some('\'') if chars.next() == Some('\'') => {
                    s.push('\'');
                    self.pos += 2;
                }
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        Ok(Token::String(s))
    }

    /// Digits, optional fraction, optional exponent
    ///
    /// Integer literals too large for an `i64` become floats.
    fn scan_number(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        let mut is_float = false;

        self.skip_digits();

        if self.peek_byte() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.skip_digits();
        }

        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            let sign = matches!(self.peek_byte_at(1), Some(b'+' | b'-')) as usize;
            if self
                .peek_byte_at(1 + sign)
                .map_or(false, |b| b.is_ascii_digit())
            {
                is_float = true;
                self.pos += 1 + sign;
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Token::Integer(i));
            }
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Token::Float(f)),
            _ => Err(SyntaxError::new(
                "number out of range",
                format!("number {}", text),
            )),
        }
    }

    /// Names start with a letter or `.` and continue with letters, digits,
    /// `_` or any non-ASCII character
    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1;
        while self
            .peek_byte()
            .map_or(false, |b| b.is_ascii_alphanumeric() || b == b'_' || b > 127)
        {
            self.pos += 1;
        }

        let text = &self.input[start..self.pos];
        match KEYWORDS.get(text.to_ascii_uppercase().as_str()) {
            Some(keyword) => keyword.clone(),
            None => Token::Identifier(text.to_string()),
        }
    }
}

/// Tokenize a whole formula
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
