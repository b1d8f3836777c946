//! Scans a formula string into tokens.
//!
//! Recognized input:
//! - numbers: `12`, `1.5`, `.5`, `2e3`
//! - strings: `'text'` or `"text"`, a doubled quote escapes itself
//! - field names: `Amount`, `order.total`, or `[Field With Spaces]`
//! - operators: `+ - * / & ( )` and `= == != <> < <= > >=`

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    LParen,
    RParen,
    Comma,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// A character the language does not use.
    Illegal(char),
    /// A string or bracketed name missing its closing delimiter.
    Unterminated(char),
    /// A numeric literal that does not fit its type.
    BadNumber(String),
    Eof,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Star,
            Some('/') => Token::Slash,
            Some('&') => Token::Ampersand,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some('=') => {
                self.eat('=');
                Token::Equal
            }
            Some('!') => {
                if self.eat('=') {
                    Token::NotEqual
                } else {
                    Token::Illegal('!')
                }
            }
            Some('<') => {
                if self.eat('=') {
                    Token::LessEqual
                } else if self.eat('>') {
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            Some('>') => {
                if self.eat('=') {
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            Some(quote @ ('\'' | '"')) => self.read_string(quote),
            Some('[') => self.read_bracketed(),
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),
            Some(ch) if is_ident_start(ch) => self.read_identifier(ch),
            Some(ch) => Token::Illegal(ch),
            None => Token::Eof,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.input.next_if(|ch| ch.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.input.next_if_eq(&expected).is_some()
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.input.next() {
            if ch == quote {
                if self.eat(quote) {
                    text.push(quote);
                } else {
                    return Token::Str(text);
                }
            } else {
                text.push(ch);
            }
        }
        Token::Unterminated(quote)
    }

    fn read_bracketed(&mut self) -> Token {
        let mut name = String::new();
        for ch in self.input.by_ref() {
            if ch == ']' {
                return Token::Ident(name.trim().to_string());
            }
            name.push(ch);
        }
        Token::Unterminated('[')
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut literal = String::from(first);
        let mut is_float = first == '.';
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                literal.push(ch);
            } else if ch == '.' && !is_float {
                is_float = true;
                literal.push(ch);
            } else if ch == 'e' || ch == 'E' {
                is_float = true;
                literal.push(ch);
                self.input.next();
                if let Some(sign) = self.input.next_if(|c| *c == '+' || *c == '-') {
                    literal.push(sign);
                }
                continue;
            } else {
                break;
            }
            self.input.next();
        }

        if is_float {
            literal
                .parse::<f64>()
                .map_or(Token::BadNumber(literal), Token::Float)
        } else {
            match literal.parse::<i64>() {
                Ok(value) => Token::Int(value),
                Err(_) => Token::BadNumber(literal),
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while let Some(ch) = self.input.next_if(|ch| is_ident_continue(*ch)) {
            name.push(ch);
        }
        Token::Ident(name)
    }
}
