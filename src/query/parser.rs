// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smallvec::SmallVec;

use super::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    Empty,
    /// An opener without its closer (position of the opener) or a stray closer.
    Unbalanced { position: usize, delimiter: char },
    UnexpectedToken { position: usize, found: String },
    UnexpectedEnd,
    UnknownKeyword { position: usize, keyword: String },
    MissingArgument { position: usize, keyword: String },
    InvalidTerm { position: usize, term: String },
    UnterminatedQuote { position: usize },
    /// A group or `not` opened past [`MAX_NESTING`] levels.
    TooDeep { position: usize },
}

impl QueryParseError {
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Empty | Self::UnexpectedEnd => None,
            Self::Unbalanced { position, .. }
            | Self::UnexpectedToken { position, .. }
            | Self::UnknownKeyword { position, .. }
            | Self::MissingArgument { position, .. }
            | Self::InvalidTerm { position, .. }
            | Self::UnterminatedQuote { position }
            | Self::TooDeep { position } => Some(*position),
        }
    }
}

impl fmt::Display for QueryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("query is empty"),
            Self::Unbalanced {
                position,
                delimiter,
            } => write!(f, "unbalanced '{delimiter}' at {position}"),
            Self::UnexpectedToken { position, found } => {
                write!(f, "unexpected {found} at {position}")
            }
            Self::UnexpectedEnd => f.write_str("query ends where an operand is expected"),
            Self::UnknownKeyword { position, keyword } => {
                write!(f, "unknown predicate '@{keyword}' at {position}")
            }
            Self::MissingArgument { position, keyword } => {
                write!(f, "'@{keyword}' at {position} needs a parenthesized argument")
            }
            Self::InvalidTerm { position, term } => {
                write!(f, "invalid term '{term}' at {position}")
            }
            Self::UnterminatedQuote { position } => {
                write!(f, "quote opened at {position} is never closed")
            }
            Self::TooDeep { position } => {
                write!(f, "query nests deeper than {MAX_NESTING} levels at {position}")
            }
        }
    }
}

impl std::error::Error for QueryParseError {}

/// A tag path pattern: lower-cased segments, the last one optionally a prefix (`Label/Go*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPattern {
    segments: Vec<String>,
    wildcard: bool,
}

impl TermPattern {
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        let (body, wildcard) = match text.strip_suffix('*') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let segments = body
            .split('/')
            .map(|segment| segment.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let last = segments.len() - 1;
        let well_formed = segments.iter().enumerate().all(|(idx, segment)| {
            !segment.contains('*') && (!segment.is_empty() || (wildcard && idx == last))
        });
        well_formed.then_some(Self { segments, wildcard })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// True when the pattern occurs as a contiguous run of `path` (lower-cased segments).
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let n = self.segments.len();
        if n > path.len() {
            return false;
        }
        (0..=path.len() - n).any(|start| {
            self.segments.iter().enumerate().all(|(idx, pattern)| {
                let segment = path[start + idx].as_ref();
                if self.wildcard && idx == n - 1 {
                    segment.starts_with(pattern.as_str())
                } else {
                    segment == pattern
                }
            })
        })
    }
}

/// Parsed query tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(TermPattern),
    /// `@exact(T)`: short form equals `T`.
    Exact(String),
    /// `@attr(A)`: schema node carries attribute `A`.
    Attr(String),
    /// `@def(N)`: a definition reference named `N`.
    Def(String),
    And { items: Vec<Expr> },
    Or { items: Vec<Expr> },
    Not { item: Box<Expr> },
    /// `[a, b]`: all items hold somewhere inside one group.
    AnyGroup { items: Vec<Expr> },
    /// `{a, b}`: all items hold among one group's direct children.
    ChildGroup { items: Vec<Expr> },
}

/// Deepest nesting of groups and `not` accepted by [`parse_query`].
pub const MAX_NESTING: usize = 64;

pub(crate) fn parse_query(text: &str) -> Result<Expr, QueryParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(QueryParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(parser.unexpected(spanned)),
    }
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Spanned<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Spanned<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, token: Token<'_>) -> bool {
        if self.peek().is_some_and(|spanned| spanned.token == token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn nested<T>(
        &mut self,
        position: usize,
        inner: impl FnOnce(&mut Self) -> Result<T, QueryParseError>,
    ) -> Result<T, QueryParseError> {
        if self.depth >= MAX_NESTING {
            return Err(QueryParseError::TooDeep { position });
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn unexpected(&self, spanned: Spanned<'_>) -> QueryParseError {
        let delimiter = match spanned.token {
            Token::RParen => Some(')'),
            Token::RBracket => Some(']'),
            Token::RBrace => Some('}'),
            _ => None,
        };
        match delimiter {
            Some(delimiter) => QueryParseError::Unbalanced {
                position: spanned.position,
                delimiter,
            },
            None => QueryParseError::UnexpectedToken {
                position: spanned.position,
                found: spanned.token.describe(),
            },
        }
    }

    fn or(&mut self) -> Result<Expr, QueryParseError> {
        let mut items = SmallVec::<[Expr; 2]>::new();
        items.push(self.and()?);
        while self.eat(Token::Or) {
            items.push(self.and()?);
        }
        Ok(fold(items, |items| Expr::Or { items }))
    }

    fn and(&mut self) -> Result<Expr, QueryParseError> {
        let mut items = SmallVec::<[Expr; 2]>::new();
        items.push(self.unary()?);
        while self.eat(Token::And) {
            items.push(self.unary()?);
        }
        Ok(fold(items, |items| Expr::And { items }))
    }

    fn unary(&mut self) -> Result<Expr, QueryParseError> {
        match self.peek() {
            Some(spanned) if spanned.token == Token::Not => {
                self.pos += 1;
                let item = self.nested(spanned.position, Self::unary)?;
                Ok(Expr::Not {
                    item: Box::new(item),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, QueryParseError> {
        let Some(spanned) = self.next() else {
            return Err(QueryParseError::UnexpectedEnd);
        };
        match spanned.token {
            Token::LParen => self.nested(spanned.position, |parser| {
                let expr = parser.or()?;
                parser.close(spanned, Token::RParen, '(')?;
                Ok(expr)
            }),
            Token::LBracket => Ok(Expr::AnyGroup {
                items: self.nested(spanned.position, |parser| {
                    parser.list(spanned, Token::RBracket, '[')
                })?,
            }),
            Token::LBrace => Ok(Expr::ChildGroup {
                items: self.nested(spanned.position, |parser| {
                    parser.list(spanned, Token::RBrace, '{')
                })?,
            }),
            Token::Keyword(keyword) => self.keyword(spanned.position, keyword),
            Token::Term(text) | Token::Quoted(text) => term(text, spanned.position),
            _ => Err(self.unexpected(spanned)),
        }
    }

    fn list(
        &mut self,
        open: Spanned<'_>,
        close: Token<'_>,
        delimiter: char,
    ) -> Result<Vec<Expr>, QueryParseError> {
        let mut items = vec![self.or()?];
        while self.eat(Token::Comma) {
            items.push(self.or()?);
        }
        self.close(open, close, delimiter)?;
        Ok(items)
    }

    fn close(
        &mut self,
        open: Spanned<'_>,
        close: Token<'_>,
        delimiter: char,
    ) -> Result<(), QueryParseError> {
        match self.peek() {
            Some(spanned) if spanned.token == close => {
                self.pos += 1;
                Ok(())
            }
            Some(spanned) if !is_closer(spanned.token) => Err(self.unexpected(spanned)),
            _ => Err(QueryParseError::Unbalanced {
                position: open.position,
                delimiter,
            }),
        }
    }

    fn keyword(&mut self, position: usize, keyword: &str) -> Result<Expr, QueryParseError> {
        let build: fn(String) -> Expr = match keyword.to_ascii_lowercase().as_str() {
            "exact" => Expr::Exact,
            "attr" => Expr::Attr,
            "def" => Expr::Def,
            _ => {
                return Err(QueryParseError::UnknownKeyword {
                    position,
                    keyword: keyword.to_owned(),
                })
            }
        };
        let missing = || QueryParseError::MissingArgument {
            position,
            keyword: keyword.to_owned(),
        };
        let Some(open) = self.next().filter(|spanned| spanned.token == Token::LParen) else {
            return Err(missing());
        };
        let argument = match self.next().map(|spanned| spanned.token) {
            Some(Token::Term(text) | Token::Quoted(text)) if !text.trim().is_empty() => text.trim(),
            _ => return Err(missing()),
        };
        self.close(open, Token::RParen, '(')?;
        Ok(build(argument.to_owned()))
    }
}

fn is_closer(token: Token<'_>) -> bool {
    matches!(token, Token::RParen | Token::RBracket | Token::RBrace)
}

fn fold(mut items: SmallVec<[Expr; 2]>, join: impl FnOnce(Vec<Expr>) -> Expr) -> Expr {
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return item;
        }
    }
    join(items.into_vec())
}

fn term(text: &str, position: usize) -> Result<Expr, QueryParseError> {
    TermPattern::new(text)
        .map(Expr::Term)
        .ok_or_else(|| QueryParseError::InvalidTerm {
            position,
            term: text.to_owned(),
        })
}
