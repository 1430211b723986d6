//! Minimal S-expression parser for formula files.
//!
//! Parses strings like:
//! ```lisp
//! (formula "riofs"
//!   (version "0.6")
//!   (depends-on "autoconf" build)
//!   (install (system "make install")))
//! ```
//!
//! `;` starts a comment that runs to the end of the line. A file holds
//! exactly one top-level expression.

use crate::ast::Expr;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("{line}:{col}: unexpected character: {ch:?}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("{line}:{col}: unclosed string")]
    UnclosedString { line: usize, col: usize },
    #[error("{line}:{col}: unclosed list")]
    UnclosedList { line: usize, col: usize },
    #[error("{line}:{col}: trailing input after expression")]
    TrailingInput { line: usize, col: usize },
}

/// Parse a single expression, rejecting anything but comments after it.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut cursor = Cursor::new(input);
    let expr = cursor.parse_expr()?;
    cursor.skip_whitespace_and_comments();
    if cursor.peek().is_some() {
        return Err(ParseError::TrailingInput {
            line: cursor.line,
            col: cursor.col,
        });
    }
    Ok(expr)
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace_and_comments();

        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some('"') => self.parse_string(),
            Some(')') => Err(ParseError::UnexpectedChar {
                ch: ')',
                line: self.line,
                col: self.col,
            }),
            Some(_) => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // '('
        let mut items = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(ParseError::UnclosedList { line, col }),
                Some(')') => {
                    self.bump();
                    return Ok(Expr::List(items));
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // opening '"'
        let mut s = String::new();

        loop {
            match self.bump() {
                None => return Err(ParseError::UnclosedString { line, col }),
                Some('"') => return Ok(Expr::Str(s)),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err(ParseError::UnclosedString { line, col }),
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn parse_symbol(&mut self) -> Result<Expr, ParseError> {
        let mut s = String::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';') {
                break;
            }
            s.push(c);
            self.bump();
        }

        Ok(Expr::Symbol(s))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            if self.peek() == Some(';') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }
}
