// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use memchr::memchr3;
use smol_str::SmolStr;

use super::node::{DefRef, HedGroup, HedNode, HedString, HedTag, Reserved, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnbalancedOpen { position: usize },
    UnbalancedClose { position: usize },
    EmptyTag { position: usize },
    EmptyPathSegment { position: usize, tag: String },
    InvalidCharacter { position: usize, character: char },
    MissingComma { position: usize },
    EmptyGroup { position: usize },
    TooDeep { position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            Self::UnbalancedOpen { position }
            | Self::UnbalancedClose { position }
            | Self::EmptyTag { position }
            | Self::EmptyPathSegment { position, .. }
            | Self::InvalidCharacter { position, .. }
            | Self::MissingComma { position }
            | Self::EmptyGroup { position }
            | Self::TooDeep { position } => *position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedOpen { position } => {
                write!(f, "unbalanced '(' at position {position}")
            }
            Self::UnbalancedClose { position } => {
                write!(f, "unbalanced ')' at position {position}")
            }
            Self::EmptyTag { position } => {
                write!(f, "empty tag at position {position} (check for stray commas)")
            }
            Self::EmptyPathSegment { position, tag } => {
                write!(f, "tag '{tag}' at position {position} has an empty path segment")
            }
            Self::InvalidCharacter {
                position,
                character,
            } => write!(f, "invalid character {character:?} at position {position}"),
            Self::MissingComma { position } => {
                write!(f, "missing comma before position {position}")
            }
            Self::EmptyGroup { position } => write!(f, "empty group at position {position}"),
            Self::TooDeep { position } => write!(
                f,
                "group at position {position} nests deeper than {MAX_NESTING} levels"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Comma,
    Open,
    Close,
    Tag,
}

/// Deepest group nesting accepted by [`parse`]. Later tree walks recurse per level.
pub const MAX_NESTING: usize = 64;

struct Frame {
    start: usize,
    nodes: Vec<HedNode>,
}

/// Parses an annotation string into a [`HedString`].
///
/// Whitespace-only input parses to an empty string. Grouping and separator mistakes are
/// structural errors; schema conformance is left to [`crate::hed::validate`].
pub fn parse(text: &str) -> Result<HedString, ParseError> {
    let bytes = text.as_bytes();
    let mut stack = vec![Frame {
        start: 0,
        nodes: Vec::new(),
    }];
    let mut last = Last::Start;
    let mut pos = 0;

    loop {
        let next = memchr3(b',', b'(', b')', &bytes[pos..]).map(|idx| pos + idx);
        let end = next.unwrap_or(bytes.len());

        let raw = &text[pos..end];
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let start = pos + (raw.len() - raw.trim_start().len());
            if last == Last::Close {
                return Err(ParseError::MissingComma { position: start });
            }
            let node = parse_tag(trimmed, Span::new(start, start + trimmed.len()))?;
            if let Some(frame) = stack.last_mut() {
                frame.nodes.push(node);
            }
            last = Last::Tag;
        }

        let Some(at) = next else {
            break;
        };
        match bytes[at] {
            b',' => {
                if matches!(last, Last::Start | Last::Comma | Last::Open) {
                    return Err(ParseError::EmptyTag { position: at });
                }
                last = Last::Comma;
            }
            b'(' => {
                if matches!(last, Last::Tag | Last::Close) {
                    return Err(ParseError::MissingComma { position: at });
                }
                // The root frame is not a group.
                if stack.len() > MAX_NESTING {
                    return Err(ParseError::TooDeep { position: at });
                }
                stack.push(Frame {
                    start: at,
                    nodes: Vec::new(),
                });
                last = Last::Open;
            }
            _ => {
                if stack.len() == 1 {
                    return Err(ParseError::UnbalancedClose { position: at });
                }
                match last {
                    Last::Open => return Err(ParseError::EmptyGroup { position: at }),
                    Last::Comma => return Err(ParseError::EmptyTag { position: at }),
                    _ => {}
                }
                if let Some(frame) = stack.pop() {
                    let group = HedGroup {
                        children: frame.nodes,
                        span: Span::new(frame.start, at + 1),
                    };
                    if let Some(parent) = stack.last_mut() {
                        parent.nodes.push(HedNode::Group(group));
                    }
                }
                last = Last::Close;
            }
        }
        pos = at + 1;
    }

    if stack.len() > 1 {
        let position = stack.last().map_or(0, |frame| frame.start);
        return Err(ParseError::UnbalancedOpen { position });
    }
    if last == Last::Comma {
        return Err(ParseError::EmptyTag {
            position: bytes.len(),
        });
    }

    let children = stack.pop().map(|frame| frame.nodes).unwrap_or_default();
    Ok(HedString {
        source: text.to_owned(),
        children,
    })
}

fn is_invalid_char(c: char) -> bool {
    c.is_control() || matches!(c, '{' | '}' | '[' | ']' | '~' | '"')
}

fn parse_tag(text: &str, span: Span) -> Result<HedNode, ParseError> {
    if let Some((offset, character)) = text.char_indices().find(|(_, c)| is_invalid_char(*c)) {
        return Err(ParseError::InvalidCharacter {
            position: span.start + offset,
            character,
        });
    }
    if text.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(ParseError::EmptyPathSegment {
            position: span.start,
            tag: text.to_owned(),
        });
    }

    let tag = HedTag::with_span(text, span);
    let first = tag.segments().next().unwrap_or_default();
    if Reserved::from_name(first) == Some(Reserved::Def) || looks_like_long_def(&tag) {
        if let Some((name, value)) = tag.def_target(Reserved::Def) {
            let def = DefRef {
                name: SmolStr::new(name),
                value: value.map(str::to_owned),
                tag: tag.clone(),
            };
            return Ok(HedNode::Def(def));
        }
    }
    Ok(HedNode::Tag(tag))
}

fn looks_like_long_def(tag: &HedTag) -> bool {
    let mut previous = "";
    for segment in tag.segments() {
        if Reserved::from_name(segment) == Some(Reserved::Def) {
            return previous.eq_ignore_ascii_case("Organizational-property");
        }
        previous = segment;
    }
    false
}
