//! Recursive descent parser producing an [`Expr`] tree.
//!
//! Grammar:
//!   expression     --> comparison
//!   comparison     --> concatenation ( ("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation )*
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("-" | "+") unary | primary
//!   primary        --> NUMBER | STRING | FIELD | "(" expression ")"
//!
//! A field name followed by `(` is rejected: there are no function calls.
//! Trees taller than [`MAX_DEPTH`] are rejected, which also bounds the
//! recursion of binding and evaluation.

use tabflow_model::Value;
use thiserror::Error;

use super::ast::{BinaryOp, Expr};
use super::lexer::{Lexer, Token};

/// Deepest nesting a formula may have, counting operators and parentheses.
pub const MAX_DEPTH: usize = 256;

/// Parse-time failure of a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character `{0}`")]
    IllegalCharacter(char),

    #[error("missing closing `{0}`")]
    Unterminated(char),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("function calls are not supported (`{0}(...)`)")]
    FunctionCall(String),

    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },

    #[error("expression is nested more than {} levels deep", MAX_DEPTH)]
    TooDeep,
}

pub type ParseResult<T> = Result<T, ExpressionError>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

/// A parsed subtree and its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn binary(op: BinaryOp, left: Node, right: Node) -> ParseResult<Self> {
        let height = left.height.max(right.height) + 1;
        if height > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(Self {
            expr: Expr::binary(op, left.expr, right.expr),
            height,
        })
    }

    fn negate(inner: Node) -> ParseResult<Self> {
        let height = inner.height + 1;
        if height > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(Self {
            expr: Expr::Negate(Box::new(inner.expr)),
            height,
        })
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(v) => format!("number `{v}`"),
        Token::Float(v) => format!("number `{v}`"),
        Token::Str(s) => format!("string '{s}'"),
        Token::Ident(name) => format!("field `{name}`"),
        Token::Eof => "end of expression".to_string(),
        other => format!("{other:?}"),
    }
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> ParseResult<Expr> {
        if self.current == Token::Eof {
            return Err(ExpressionError::Empty);
        }
        let node = self.parse_comparison()?;
        match &self.current {
            Token::Eof => Ok(node.expr),
            other => Err(self.unexpected("an operator", other)),
        }
    }

    fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    /// Enter one level of parser recursion.
    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn unexpected(&self, expected: &'static str, found: &Token) -> ExpressionError {
        match found {
            Token::Illegal(ch) => ExpressionError::IllegalCharacter(*ch),
            Token::Unterminated(ch) => ExpressionError::Unterminated(*ch),
            Token::BadNumber(text) => ExpressionError::InvalidNumber(text.clone()),
            other => ExpressionError::Unexpected {
                expected,
                found: describe(other),
            },
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_concatenation()?;
        loop {
            let op = match self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::Less => BinaryOp::Lt,
                Token::LessEqual => BinaryOp::Le,
                Token::Greater => BinaryOp::Gt,
                Token::GreaterEqual => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_concatenation()?;
            left = Node::binary(op, left, right)?;
        }
    }

    fn parse_concatenation(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_additive()?;
        while self.current == Token::Ampersand {
            self.advance();
            let right = self.parse_additive()?;
            left = Node::binary(BinaryOp::Concat, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Node::binary(op, left, right)?;
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Node::binary(op, left, right)?;
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Node> {
        match self.current {
            Token::Minus => {
                self.advance();
                self.descend()?;
                let inner = self.parse_unary()?;
                self.depth -= 1;
                Node::negate(inner)
            }
            Token::Plus => {
                self.advance();
                self.descend()?;
                let inner = self.parse_unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        match self.advance() {
            Token::Int(v) => Ok(Node::leaf(Expr::Literal(Value::Int(v)))),
            Token::Float(v) => Ok(Node::leaf(Expr::Literal(Value::Float(v)))),
            Token::Str(s) => Ok(Node::leaf(Expr::Literal(Value::Str(s)))),
            Token::Ident(name) => {
                if self.current == Token::LParen {
                    return Err(ExpressionError::FunctionCall(name));
                }
                Ok(Node::leaf(Expr::Field { name, slot: None }))
            }
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_comparison()?;
                self.depth -= 1;
                if self.current == Token::RParen {
                    self.advance();
                    Ok(inner)
                } else {
                    Err(self.unexpected("`)`", &self.current))
                }
            }
            other => Err(self.unexpected("a value or field", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParseResult<Expr> {
        Parser::new(input).parse()
    }

    fn field(name: &str) -> Expr {
        Expr::Field {
            name: name.to_string(),
            slot: None,
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("A + B * 2").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                field("A"),
                Expr::binary(BinaryOp::Mul, field("B"), Expr::Literal(Value::Int(2)))
            )
        );
    }

    #[test]
    fn test_parentheses_and_unary() {
        let expr = parse("-(A - B)").unwrap();
        assert_eq!(
            expr,
            Expr::Negate(Box::new(Expr::binary(BinaryOp::Sub, field("A"), field("B"))))
        );
    }

    #[test]
    fn test_concat_binds_looser_than_addition() {
        let expr = parse("A & B + 1").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Concat,
                field("A"),
                Expr::binary(BinaryOp::Add, field("B"), Expr::Literal(Value::Int(1)))
            )
        );
    }

    #[test]
    fn test_comparison_is_loosest() {
        let expr = parse("A + 1 >= B").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Ge, .. }));
    }

    #[test]
    fn test_rejects_calls_and_garbage() {
        assert_eq!(parse("abs(A)"), Err(ExpressionError::FunctionCall("abs".into())));
        assert_eq!(parse(""), Err(ExpressionError::Empty));
        assert_eq!(parse("A ; B"), Err(ExpressionError::IllegalCharacter(';')));
        assert_eq!(parse("'x"), Err(ExpressionError::Unterminated('\'')));
        assert!(matches!(parse("(A + B"), Err(ExpressionError::Unexpected { .. })));
        assert!(matches!(parse("A B"), Err(ExpressionError::Unexpected { .. })));
        assert!(matches!(parse("A +"), Err(ExpressionError::Unexpected { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let negations = format!("{}A", "-".repeat(200_000));
        assert_eq!(parse(&negations), Err(ExpressionError::TooDeep));

        let parens = format!("{}A{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&parens), Err(ExpressionError::TooDeep));

        let chain = format!("A{}", " + A".repeat(100_000));
        assert_eq!(parse(&chain), Err(ExpressionError::TooDeep));

        let shallow = format!("{}A{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&shallow), Ok(field("A")));
        assert!(parse(&format!("{}A", "-".repeat(MAX_DEPTH - 1))).is_ok());
    }
}
