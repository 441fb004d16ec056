//! Rule conditions: a small arithmetic/boolean language over `amount`.
//!
//! Conditions come from a user-edited rules file, so the grammar is closed:
//! decimal literals, the single name `amount`, `+ - * /`, the comparisons
//! `< <= > >= == !=`, `and`/`or`/`not` and parentheses. Anything else is
//! rejected when the rules are loaded. Parsing produces a typed tree, so a
//! condition that loads can only fail at runtime on arithmetic (division by
//! zero or decimal overflow).

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_DEPTH: usize = 64;
const MAX_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Number,
    Boolean,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Number => write!(f, "a number"),
            Kind::Boolean => write!(f, "a boolean"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("expression is longer than {limit} characters")]
    TooLong { limit: usize },
    #[error("unexpected character '{ch}' at column {column}")]
    UnexpectedChar { ch: char, column: usize },
    #[error("unknown name '{name}' at column {column} (only 'amount' is available)")]
    UnknownName { name: String, column: usize },
    #[error("invalid number '{literal}' at column {column}")]
    InvalidNumber { literal: String, column: usize },
    #[error("unexpected {found} at column {column}")]
    UnexpectedToken { found: String, column: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expected {expected} but found {found} at column {column}")]
    TypeMismatch { expected: Kind, found: Kind, column: usize },
    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
}

// ── Operators ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn holds(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, lhs: Decimal, rhs: Decimal) -> Result<Decimal, EvaluationError> {
        match self {
            ArithOp::Add => lhs.checked_add(rhs).ok_or(EvaluationError::Overflow),
            ArithOp::Sub => lhs.checked_sub(rhs).ok_or(EvaluationError::Overflow),
            ArithOp::Mul => lhs.checked_mul(rhs).ok_or(EvaluationError::Overflow),
            ArithOp::Div => {
                if rhs.is_zero() {
                    return Err(EvaluationError::DivisionByZero);
                }
                lhs.checked_div(rhs).ok_or(EvaluationError::Overflow)
            }
        }
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(Decimal),
    Amount,
    And,
    Or,
    Not,
    Cmp(CmpOp),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Amount => write!(f, "'amount'"),
            TokenKind::And => write!(f, "'and'"),
            TokenKind::Or => write!(f, "'or'"),
            TokenKind::Not => write!(f, "'not'"),
            TokenKind::Cmp(op) => write!(f, "'{}'", op.symbol()),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    column: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: TokenKind::Number(parse_number(&literal, column)?), column });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let kind = match word.as_str() {
                "amount" => TokenKind::Amount,
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                _ => return Err(ExprError::UnknownName { name: word, column }),
            };
            tokens.push(Token { kind, column });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (kind, width) = match (c, next) {
            ('<', Some('=')) => (TokenKind::Cmp(CmpOp::Le), 2),
            ('<', _) => (TokenKind::Cmp(CmpOp::Lt), 1),
            ('>', Some('=')) => (TokenKind::Cmp(CmpOp::Ge), 2),
            ('>', _) => (TokenKind::Cmp(CmpOp::Gt), 1),
            ('=', Some('=')) => (TokenKind::Cmp(CmpOp::Eq), 2),
            ('!', Some('=')) => (TokenKind::Cmp(CmpOp::Ne), 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            _ => return Err(ExprError::UnexpectedChar { ch: c, column }),
        };
        tokens.push(Token { kind, column });
        i += width;
    }

    Ok(tokens)
}

fn parse_number(literal: &str, column: usize) -> Result<Decimal, ExprError> {
    let invalid = || ExprError::InvalidNumber { literal: literal.to_string(), column };
    let well_formed = literal.chars().all(|c| c.is_ascii_digit() || c == '.')
        && literal.matches('.').count() <= 1
        && literal.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(invalid());
    }
    let normalized = if literal.starts_with('.') { format!("0{literal}") } else { literal.to_string() };
    Decimal::from_str(&normalized).map_err(|_| invalid())
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum NodeKind {
    Number(Decimal),
    Amount,
    Neg(Box<Node>),
    Arith(ArithOp, Box<Node>, Box<Node>),
    Compare(Box<Node>, Vec<(CmpOp, Node)>),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    column: usize,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn parse(mut self) -> Result<Node, ExprError> {
        let node = self.parse_or()?;
        match self.advance() {
            None => Ok(node),
            Some(token) => Err(ExprError::UnexpectedToken {
                found: token.kind.to_string(),
                column: token.column,
            }),
        }
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            let column = lhs.column;
            lhs = Node { kind: NodeKind::Or(Box::new(lhs), Box::new(rhs)), column };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&TokenKind::And) {
            self.advance();
            let rhs = self.parse_not()?;
            let column = lhs.column;
            lhs = Node { kind: NodeKind::And(Box::new(lhs), Box::new(rhs)), column };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Node, ExprError> {
        if self.peek() != Some(&TokenKind::Not) {
            return self.parse_comparison();
        }
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        self.descend()?;
        let operand = self.parse_not()?;
        self.ascend();
        Ok(Node { kind: NodeKind::Not(Box::new(operand)), column: token.column })
    }

    fn parse_comparison(&mut self) -> Result<Node, ExprError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(TokenKind::Cmp(op)) = self.peek() {
            let op = *op;
            self.advance();
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let column = first.column;
        Ok(Node { kind: NodeKind::Compare(Box::new(first), rest), column })
    }

    fn parse_sum(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            let column = lhs.column;
            lhs = Node { kind: NodeKind::Arith(op, Box::new(lhs), Box::new(rhs)), column };
        }
    }

    fn parse_term(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_factor()?;
            let column = lhs.column;
            lhs = Node { kind: NodeKind::Arith(op, Box::new(lhs), Box::new(rhs)), column };
        }
    }

    fn parse_factor(&mut self) -> Result<Node, ExprError> {
        let negate = match self.peek() {
            Some(TokenKind::Minus) => true,
            Some(TokenKind::Plus) => false,
            _ => return self.parse_atom(),
        };
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        self.descend()?;
        let operand = self.parse_factor()?;
        self.ascend();
        if !negate {
            return Ok(operand);
        }
        Ok(Node { kind: NodeKind::Neg(Box::new(operand)), column: token.column })
    }

    fn parse_atom(&mut self) -> Result<Node, ExprError> {
        let token = self.advance().ok_or(ExprError::UnexpectedEnd)?;
        let column = token.column;
        match token.kind {
            TokenKind::Number(n) => Ok(Node { kind: NodeKind::Number(n), column }),
            TokenKind::Amount => Ok(Node { kind: NodeKind::Amount, column }),
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.ascend();
                match self.advance() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken {
                        found: other.kind.to_string(),
                        column: other.column,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            other => Err(ExprError::UnexpectedToken { found: other.to_string(), column }),
        }
    }
}

// ── Typed tree ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum NumExpr {
    Literal(Decimal),
    Amount,
    Neg(Box<NumExpr>),
    Binary(ArithOp, Box<NumExpr>, Box<NumExpr>),
}

#[derive(Debug, Clone, PartialEq)]
enum BoolExpr {
    Compare(NumExpr, Vec<(CmpOp, NumExpr)>),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

impl Node {
    fn into_num(self) -> Result<NumExpr, ExprError> {
        match self.kind {
            NodeKind::Number(n) => Ok(NumExpr::Literal(n)),
            NodeKind::Amount => Ok(NumExpr::Amount),
            NodeKind::Neg(inner) => Ok(NumExpr::Neg(Box::new(inner.into_num()?))),
            NodeKind::Arith(op, lhs, rhs) => {
                Ok(NumExpr::Binary(op, Box::new(lhs.into_num()?), Box::new(rhs.into_num()?)))
            }
            _ => Err(ExprError::TypeMismatch {
                expected: Kind::Number,
                found: Kind::Boolean,
                column: self.column,
            }),
        }
    }

    fn into_bool(self) -> Result<BoolExpr, ExprError> {
        match self.kind {
            NodeKind::Compare(first, rest) => {
                let first = first.into_num()?;
                let rest = rest
                    .into_iter()
                    .map(|(op, node)| node.into_num().map(|n| (op, n)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BoolExpr::Compare(first, rest))
            }
            NodeKind::Not(inner) => Ok(BoolExpr::Not(Box::new(inner.into_bool()?))),
            NodeKind::And(lhs, rhs) => {
                Ok(BoolExpr::And(Box::new(lhs.into_bool()?), Box::new(rhs.into_bool()?)))
            }
            NodeKind::Or(lhs, rhs) => {
                Ok(BoolExpr::Or(Box::new(lhs.into_bool()?), Box::new(rhs.into_bool()?)))
            }
            _ => Err(ExprError::TypeMismatch {
                expected: Kind::Boolean,
                found: Kind::Number,
                column: self.column,
            }),
        }
    }
}

impl NumExpr {
    fn eval(&self, amount: Decimal) -> Result<Decimal, EvaluationError> {
        match self {
            NumExpr::Literal(n) => Ok(*n),
            NumExpr::Amount => Ok(amount),
            NumExpr::Neg(inner) => Ok(-inner.eval(amount)?),
            NumExpr::Binary(op, lhs, rhs) => op.apply(lhs.eval(amount)?, rhs.eval(amount)?),
        }
    }
}

impl BoolExpr {
    fn eval(&self, amount: Decimal) -> Result<bool, EvaluationError> {
        match self {
            BoolExpr::Compare(first, rest) => {
                let mut lhs = first.eval(amount)?;
                for (op, rhs) in rest {
                    let rhs = rhs.eval(amount)?;
                    if !op.holds(lhs, rhs) {
                        return Ok(false);
                    }
                    lhs = rhs;
                }
                Ok(true)
            }
            BoolExpr::Not(inner) => Ok(!inner.eval(amount)?),
            BoolExpr::And(lhs, rhs) => Ok(lhs.eval(amount)? && rhs.eval(amount)?),
            BoolExpr::Or(lhs, rhs) => Ok(lhs.eval(amount)? || rhs.eval(amount)?),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A parsed, type-checked rule condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: BoolExpr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        if source.chars().count() > MAX_LENGTH {
            return Err(ExprError::TooLong { limit: MAX_LENGTH });
        }
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let node = Parser { tokens, pos: 0, depth: 0 }.parse()?;
        Ok(Condition { source: source.trim().to_string(), expr: node.into_bool()? })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, amount: Decimal) -> Result<bool, EvaluationError> {
        self.expr.eval(amount)
    }
}

impl FromStr for Condition {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
