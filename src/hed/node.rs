// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smol_str::SmolStr;

use crate::schema::{split_prefix, LookupError, TagId};

/// Byte range of a node inside the text it was parsed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Tags with structural meaning in HED strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reserved {
    Def,
    DefExpand,
    Definition,
    Onset,
    Offset,
    Inset,
    Duration,
    Delay,
    EventContext,
}

impl Reserved {
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMES: [(&str, Reserved); 9] = [
            ("Def", Reserved::Def),
            ("Def-expand", Reserved::DefExpand),
            ("Definition", Reserved::Definition),
            ("Onset", Reserved::Onset),
            ("Offset", Reserved::Offset),
            ("Inset", Reserved::Inset),
            ("Duration", Reserved::Duration),
            ("Delay", Reserved::Delay),
            ("Event-context", Reserved::EventContext),
        ];
        NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, reserved)| *reserved)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Onset | Self::Offset | Self::Inset)
    }
}

/// Schema information attached to a tag by [`crate::hed::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    pub(crate) member: usize,
    pub(crate) tag: TagId,
    pub(crate) name: SmolStr,
    pub(crate) base_long_form: String,
    pub(crate) value_node: Option<TagId>,
    pub(crate) extension: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) case_mismatch: bool,
}

impl ResolvedTag {
    /// Index of the schema group member the tag was found in.
    pub fn member(&self) -> usize {
        self.member
    }

    /// The deepest schema node named by the tag text (the value-taking node for values).
    pub fn tag(&self) -> TagId {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_long_form(&self) -> &str {
        &self.base_long_form
    }

    pub fn value_node(&self) -> Option<TagId> {
        self.value_node
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn case_mismatch(&self) -> bool {
        self.case_mismatch
    }

    /// Long form including any extension or value, e.g. `Property/.../Label/Go-trial`.
    pub fn long_form(&self) -> String {
        match self.extension.as_deref().or(self.value.as_deref()) {
            Some(rest) => format!("{}/{rest}", self.base_long_form),
            None => self.base_long_form.clone(),
        }
    }
}

/// One tag occurrence such as `Label/Go-trial` or `sc:Alert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedTag {
    text: String,
    span: Span,
    resolution: Option<Result<ResolvedTag, LookupError>>,
}

impl HedTag {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let span = Span::new(0, text.len());
        Self {
            text,
            span,
            resolution: None,
        }
    }

    pub(crate) fn with_span(text: &str, span: Span) -> Self {
        Self {
            text: text.to_owned(),
            span,
            resolution: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn prefix(&self) -> Option<&str> {
        split_prefix(&self.text).0
    }

    /// Tag text without its library prefix.
    pub fn body(&self) -> &str {
        split_prefix(&self.text).1
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.body().split('/').map(str::trim)
    }

    pub fn has_placeholder(&self) -> bool {
        self.text.contains('#')
    }

    pub fn resolved(&self) -> Option<&ResolvedTag> {
        self.resolution.as_ref().and_then(|r| r.as_ref().ok())
    }

    pub fn lookup_error(&self) -> Option<&LookupError> {
        self.resolution.as_ref().and_then(|r| r.as_ref().err())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved().is_some()
    }

    pub(crate) fn set_resolution(&mut self, resolution: Result<ResolvedTag, LookupError>) {
        self.resolution = Some(resolution);
    }

    /// Schema node name when resolved, otherwise the first path segment.
    pub fn base_name(&self) -> &str {
        match self.resolved() {
            Some(resolved) => resolved.name(),
            None => self.segments().next().unwrap_or_default(),
        }
    }

    pub fn reserved(&self) -> Option<Reserved> {
        if let Some(resolved) = self.resolved() {
            return Reserved::from_name(resolved.name());
        }
        self.segments().find_map(Reserved::from_name)
    }

    /// Lower-cased identity used for duplicate detection and de-duplication.
    pub fn identity(&self) -> String {
        match self.resolved() {
            Some(resolved) => resolved.long_form().to_ascii_lowercase(),
            None => self.text.to_ascii_lowercase(),
        }
    }

    /// Returns `(name, value)` when the tag is `Def/Name[/value]` or `Def-expand/Name[/value]`.
    pub(crate) fn def_target(&self, kind: Reserved) -> Option<(&str, Option<&str>)> {
        let body = self.body();
        let segments = body.split('/').collect::<Vec<_>>();
        let at = segments
            .iter()
            .position(|seg| Reserved::from_name(seg.trim()) == Some(kind))?;
        let name = segments.get(at + 1)?.trim();
        if name.is_empty() {
            return None;
        }
        let value = if segments.len() > at + 2 {
            let offset = segments[..at + 2].iter().map(|s| s.len() + 1).sum::<usize>();
            Some(body[offset..].trim())
        } else {
            None
        };
        Some((name, value))
    }
}

impl fmt::Display for HedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A `Def/Name[/value]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefRef {
    pub(crate) name: SmolStr,
    pub(crate) value: Option<String>,
    pub(crate) tag: HedTag,
}

impl DefRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn tag(&self) -> &HedTag {
        &self.tag
    }

    /// Case-insensitive key of the reference, used to pair Onset and Offset anchors.
    pub fn anchor_key(&self) -> String {
        match &self.value {
            Some(value) => format!(
                "{}/{}",
                self.name.to_ascii_lowercase(),
                value.to_ascii_lowercase()
            ),
            None => self.name.to_ascii_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedGroup {
    pub(crate) children: Vec<HedNode>,
    pub(crate) span: Span,
}

impl HedGroup {
    pub fn new(children: Vec<HedNode>) -> Self {
        Self {
            children,
            span: Span::default(),
        }
    }

    pub fn children(&self) -> &[HedNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<HedNode> {
        &mut self.children
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child tags (including Def references), in order.
    pub fn direct_tags(&self) -> impl Iterator<Item = &HedTag> {
        self.children.iter().filter_map(HedNode::as_tag)
    }

    pub fn direct_groups(&self) -> impl Iterator<Item = &HedGroup> {
        self.children.iter().filter_map(HedNode::as_group)
    }

    pub fn has_reserved(&self, kind: Reserved) -> bool {
        self.direct_tags().any(|tag| tag.reserved() == Some(kind))
    }

    /// True when a direct tag is `Definition/...`.
    pub fn is_definition(&self) -> bool {
        self.has_reserved(Reserved::Definition)
    }

    pub fn is_def_expand(&self) -> bool {
        self.has_reserved(Reserved::DefExpand)
    }

    /// Every tag below this group, depth first in text order.
    pub fn all_tags(&self) -> Vec<&HedTag> {
        let mut out = Vec::new();
        collect_tags(&self.children, &mut out);
        out
    }
}

impl fmt::Display for HedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        write_nodes(f, &self.children)?;
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HedNode {
    Tag(HedTag),
    Group(HedGroup),
    Def(DefRef),
}

impl HedNode {
    /// The tag of a plain tag or Def reference.
    pub fn as_tag(&self) -> Option<&HedTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Def(def) => Some(&def.tag),
            Self::Group(_) => None,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut HedTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Def(def) => Some(&mut def.tag),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&HedGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_def(&self) -> Option<&DefRef> {
        match self {
            Self::Def(def) => Some(def),
            _ => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Tag(tag) => tag.span(),
            Self::Def(def) => def.tag.span(),
            Self::Group(group) => group.span(),
        }
    }

    /// Lower-cased identity of the node, used when de-duplicating context tags.
    pub fn identity(&self) -> String {
        match self {
            Self::Group(group) => {
                let inner = group.children.iter().map(HedNode::identity).collect::<Vec<_>>();
                format!("({})", inner.join(","))
            }
            _ => self.as_tag().map(HedTag::identity).unwrap_or_default(),
        }
    }
}

impl fmt::Display for HedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => fmt::Display::fmt(tag, f),
            Self::Def(def) => fmt::Display::fmt(&def.tag, f),
            Self::Group(group) => fmt::Display::fmt(group, f),
        }
    }
}

/// A parsed annotation: an ordered list of top-level tags and groups.
///
/// `source` keeps the text the string was parsed from; spans index into it. `Display` renders
/// the canonical form (`a, (b, c)`), which is what assembly emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HedString {
    pub(crate) source: String,
    pub(crate) children: Vec<HedNode>,
}

impl HedString {
    pub fn from_nodes(children: Vec<HedNode>) -> Self {
        let mut out = Self {
            source: String::new(),
            children,
        };
        out.source = out.to_string();
        out
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn children(&self) -> &[HedNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<HedNode> {
        &mut self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every tag in the string, depth first in text order.
    pub fn tags(&self) -> Vec<&HedTag> {
        let mut out = Vec::new();
        collect_tags(&self.children, &mut out);
        out
    }

    /// Every group in the string, outer groups before the groups they contain.
    pub fn groups(&self) -> Vec<&HedGroup> {
        let mut out = Vec::new();
        let mut stack = self.children.iter().rev().collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            if let HedNode::Group(group) = node {
                out.push(group);
                stack.extend(group.children.iter().rev());
            }
        }
        out
    }

    pub fn def_refs(&self) -> Vec<&DefRef> {
        let mut out = Vec::new();
        let mut stack = self.children.iter().rev().collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            match node {
                HedNode::Def(def) => out.push(def),
                HedNode::Group(group) => stack.extend(group.children.iter().rev()),
                HedNode::Tag(_) => {}
            }
        }
        out
    }

    pub(crate) fn tags_mut(&mut self) -> Vec<&mut HedTag> {
        let mut out = Vec::new();
        collect_tags_mut(&mut self.children, &mut out);
        out
    }

    /// Appends nodes and refreshes the canonical source text.
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = HedNode>) {
        self.children.extend(nodes);
        self.refresh_source();
    }

    pub(crate) fn refresh_source(&mut self) {
        self.source = self.to_string();
    }
}

impl fmt::Display for HedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.children)
    }
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[HedNode]) -> fmt::Result {
    for (idx, node) in nodes.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        fmt::Display::fmt(node, f)?;
    }
    Ok(())
}

fn collect_tags<'a>(nodes: &'a [HedNode], out: &mut Vec<&'a HedTag>) {
    for node in nodes {
        match node {
            HedNode::Group(group) => collect_tags(&group.children, out),
            _ => out.extend(node.as_tag()),
        }
    }
}

fn collect_tags_mut<'a>(nodes: &'a mut [HedNode], out: &mut Vec<&'a mut HedTag>) {
    for node in nodes {
        match node {
            HedNode::Tag(tag) => out.push(tag),
            HedNode::Def(def) => out.push(&mut def.tag),
            HedNode::Group(group) => collect_tags_mut(&mut group.children, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HedGroup, HedNode, HedString, HedTag, Reserved};

    #[test]
    fn displays_canonical_text() {
        let hed = HedString::from_nodes(vec![
            HedNode::Tag(HedTag::new("Red")),
            HedNode::Group(HedGroup::new(vec![
                HedNode::Tag(HedTag::new("Blue")),
                HedNode::Group(HedGroup::new(vec![HedNode::Tag(HedTag::new("Green"))])),
            ])),
        ]);
        assert_eq!(hed.to_string(), "Red, (Blue, (Green))");
        assert_eq!(hed.source(), "Red, (Blue, (Green))");
        assert_eq!(hed.tags().len(), 3);
        assert_eq!(hed.groups().len(), 2);
    }

    #[test]
    fn reserved_names_and_def_targets() {
        let tag = HedTag::new("Def/Acc/3.5 m-per-s");
        assert_eq!(tag.reserved(), Some(Reserved::Def));
        assert_eq!(tag.def_target(Reserved::Def), Some(("Acc", Some("3.5 m-per-s"))));

        let long = HedTag::new("Property/Organizational-property/Def/Go");
        assert_eq!(long.def_target(Reserved::Def), Some(("Go", None)));
        assert_eq!(HedTag::new("Def").def_target(Reserved::Def), None);
        assert_eq!(HedTag::new("onset").reserved(), Some(Reserved::Onset));
        assert_eq!(HedTag::new("Red").reserved(), None);
    }
}
