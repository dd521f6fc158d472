// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::QueryParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    And,
    Or,
    Not,
    /// `@name`
    Keyword(&'a str),
    Term(&'a str),
    /// Text between double quotes, taken literally.
    Quoted(&'a str),
}

impl Token<'_> {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_owned(),
            Self::RParen => "')'".to_owned(),
            Self::LBracket => "'['".to_owned(),
            Self::RBracket => "']'".to_owned(),
            Self::LBrace => "'{'".to_owned(),
            Self::RBrace => "'}'".to_owned(),
            Self::Comma => "','".to_owned(),
            Self::And => "'and'".to_owned(),
            Self::Or => "'or'".to_owned(),
            Self::Not => "'not'".to_owned(),
            Self::Keyword(name) => format!("'@{name}'"),
            Self::Term(text) => format!("'{text}'"),
            Self::Quoted(text) => format!("'\"{text}\"'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Spanned<'a> {
    pub(crate) token: Token<'a>,
    pub(crate) position: usize,
}

fn is_term_byte(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !b"()[]{},\"~@&|".contains(&byte)
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned<'_>>, QueryParseError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let position = i;
        let single = match bytes[i] {
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b',' => Some(Token::Comma),
            b'~' => Some(Token::Not),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(Spanned { token, position });
            i += 1;
            continue;
        }

        let token = match bytes[i] {
            b'&' | b'|' => {
                if bytes.get(i + 1) != Some(&bytes[i]) {
                    return Err(QueryParseError::UnexpectedToken {
                        position,
                        found: char::from(bytes[i]).to_string(),
                    });
                }
                i += 2;
                if bytes[position] == b'&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            b'"' => {
                let Some(len) = text[i + 1..].find('"') else {
                    return Err(QueryParseError::UnterminatedQuote { position });
                };
                i += len + 2;
                Token::Quoted(&text[position + 1..position + 1 + len])
            }
            b'@' => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                Token::Keyword(&text[position + 1..i])
            }
            _ => {
                while i < bytes.len() && is_term_byte(bytes[i]) {
                    i += 1;
                }
                let word = &text[position..i];
                if word.eq_ignore_ascii_case("and") {
                    Token::And
                } else if word.eq_ignore_ascii_case("or") {
                    Token::Or
                } else if word.eq_ignore_ascii_case("not") {
                    Token::Not
                } else {
                    Token::Term(word)
                }
            }
        };
        tokens.push(Spanned { token, position });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Token};
    use crate::query::QueryParseError;

    fn tokens(text: &str) -> Vec<Token<'_>> {
        tokenize(text)
            .expect("tokenize")
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn splits_operators_and_terms() {
        assert_eq!(
            tokens("Red AND not [Blue, Label/Go*] || @def(Cue)"),
            vec![
                Token::Term("Red"),
                Token::And,
                Token::Not,
                Token::LBracket,
                Token::Term("Blue"),
                Token::Comma,
                Token::Term("Label/Go*"),
                Token::RBracket,
                Token::Or,
                Token::Keyword("def"),
                Token::LParen,
                Token::Term("Cue"),
                Token::RParen,
            ]
        );
        assert_eq!(
            tokens("~{Red}&&\"Time-value/2 s\""),
            vec![
                Token::Not,
                Token::LBrace,
                Token::Term("Red"),
                Token::RBrace,
                Token::And,
                Token::Quoted("Time-value/2 s"),
            ]
        );
    }

    #[test]
    fn keeps_positions() {
        let spanned = tokenize("Red  or Blue").expect("tokenize");
        let positions = spanned.iter().map(|s| s.position).collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 5, 8]);
    }

    #[test]
    fn rejects_stray_symbols() {
        assert_eq!(
            tokenize("Red & Blue"),
            Err(QueryParseError::UnexpectedToken {
                position: 4,
                found: "&".to_owned()
            })
        );
        assert_eq!(
            tokenize("Red, \"Blue"),
            Err(QueryParseError::UnterminatedQuote { position: 5 })
        );
    }
}
