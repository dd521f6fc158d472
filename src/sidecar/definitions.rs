// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use smol_str::SmolStr;

use crate::hed::{parse, resolve, DefRef, HedGroup, HedNode, HedString, Reserved};
use crate::issues::{Issue, IssueCode, IssueList};
use crate::schema::SchemaGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    UndefinedDefinition { name: String },
    DefinitionValueMismatch { name: String, takes_value: bool },
    ExpansionTooDeep { name: String, max_depth: usize },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedDefinition { name } => {
                write!(f, "definition '{name}' is not defined")
            }
            Self::DefinitionValueMismatch { name, takes_value } => {
                if *takes_value {
                    write!(f, "definition '{name}' requires a value but none was given")
                } else {
                    write!(f, "definition '{name}' takes no value but one was given")
                }
            }
            Self::ExpansionTooDeep { name, max_depth } => write!(
                f,
                "expanding definition '{name}' exceeds the nesting limit of {max_depth}"
            ),
        }
    }
}

impl std::error::Error for DefinitionError {}

/// A named reusable annotation: `(Definition/Name[/#], (content))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    name: SmolStr,
    takes_value: bool,
    content: Option<HedGroup>,
}

impl Definition {
    /// Builds a definition from its name and optional content text (without the outer group).
    pub fn new(name: &str, content: Option<&str>) -> Result<Self, crate::hed::ParseError> {
        let content = match content.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => {
                let parsed = parse(&format!("({text})"))?;
                parsed.children().first().and_then(HedNode::as_group).cloned()
            }
            None => None,
        };
        let takes_value = content
            .as_ref()
            .is_some_and(|group| group.to_string().contains('#'));
        Ok(Self {
            name: SmolStr::new(name),
            takes_value,
            content,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn takes_value(&self) -> bool {
        self.takes_value
    }

    pub fn content(&self) -> Option<&HedGroup> {
        self.content.as_ref()
    }

    /// Content with `#` replaced by `value`, resolved against `schemas`.
    pub fn expand(
        &self,
        value: Option<&str>,
        schemas: &SchemaGroup,
    ) -> Result<Option<HedGroup>, DefinitionError> {
        if self.takes_value != value.is_some() {
            return Err(DefinitionError::DefinitionValueMismatch {
                name: self.name.to_string(),
                takes_value: self.takes_value,
            });
        }
        let Some(content) = &self.content else {
            return Ok(None);
        };
        let text = match value {
            Some(value) => content.to_string().replace('#', value),
            None => content.to_string(),
        };
        // Substituted values come from parsed tags and never hold delimiters.
        let Ok(mut parsed) = parse(&text) else {
            return Ok(Some(content.clone()));
        };
        resolve(&mut parsed, schemas);
        Ok(parsed.children.into_iter().next().and_then(|node| match node {
            HedNode::Group(group) => Some(group),
            _ => None,
        }))
    }
}

/// Borrowed view of a well-formed definition group.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionShape<'a> {
    pub name: &'a str,
    pub takes_value: bool,
    pub content: Option<&'a HedGroup>,
}

/// Checks that `group` is `(Definition/Name[/#][, (content)])` with a placeholder count that
/// matches the name form.
pub fn definition_shape(group: &HedGroup) -> Result<DefinitionShape<'_>, String> {
    let definition_tags = group
        .direct_tags()
        .filter(|tag| tag.reserved() == Some(Reserved::Definition))
        .collect::<Vec<_>>();
    let [tag] = definition_tags.as_slice() else {
        return Err(format!("{group} must hold exactly one Definition tag"));
    };
    if group.direct_tags().count() > 1 || group.direct_groups().count() > 1 {
        return Err(format!(
            "{group} may hold only the Definition tag and one content group"
        ));
    }
    let Some((name, value)) = tag.def_target(Reserved::Definition) else {
        return Err(format!("'{}' does not name a definition", tag.text()));
    };
    let takes_value = match value {
        None => false,
        Some("#") => true,
        Some(other) => {
            return Err(format!(
                "'{}' may only be followed by '#', not '{other}'",
                tag.text()
            ))
        }
    };

    let content = group.direct_groups().next();
    if let Some(content) = content {
        if content.all_tags().iter().any(|t| t.reserved() == Some(Reserved::Definition)) {
            return Err(format!("definition '{name}' contains another definition"));
        }
    }
    let placeholders = content.map_or(0, |content| content.to_string().matches('#').count());
    match (takes_value, placeholders) {
        (true, 1) | (false, 0) => Ok(DefinitionShape {
            name,
            takes_value,
            content,
        }),
        (true, count) => Err(format!(
            "definition '{name}' needs exactly one '#' in its content, found {count}"
        )),
        (false, _) => Err(format!(
            "definition '{name}' has '#' in its content but is not declared as 'Definition/{name}/#'"
        )),
    }
}

/// Definitions keyed by name, case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionDict {
    entries: BTreeMap<String, Definition>,
}

impl DefinitionDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition. Returns false (keeping the existing entry) if the name is taken.
    pub fn insert(&mut self, definition: Definition) -> bool {
        let key = definition.name.to_ascii_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, definition);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects the top-level definition groups of `hed`, reporting malformed and duplicate
    /// ones.
    pub fn extract_from(&mut self, hed: &HedString) -> IssueList {
        self.collect(hed, true)
    }

    pub(crate) fn collect(&mut self, hed: &HedString, report_shape: bool) -> IssueList {
        let mut issues = IssueList::new();
        for group in hed.children().iter().filter_map(HedNode::as_group) {
            if !group.is_definition() {
                continue;
            }
            let shape = match definition_shape(group) {
                Ok(shape) => shape,
                Err(reason) => {
                    if report_shape {
                        issues.push(Issue::new(IssueCode::DefinitionInvalid, reason));
                    }
                    continue;
                }
            };
            let definition = Definition {
                name: SmolStr::new(shape.name),
                takes_value: shape.takes_value,
                content: shape.content.cloned(),
            };
            if !self.insert(definition) {
                issues.push(Issue::new(
                    IssueCode::DefinitionDuplicate,
                    format!("definition '{}' is declared more than once", shape.name),
                ));
            }
        }
        issues
    }

    /// Reports definitions whose content refers back to themselves, directly or through
    /// other definitions.
    pub fn check_cycles(&self) -> IssueList {
        let mut issues = IssueList::new();
        for definition in self.entries.values() {
            let mut stack = def_names(definition);
            let mut visited = HashSet::new();
            while let Some(name) = stack.pop() {
                if name.eq_ignore_ascii_case(&definition.name) {
                    issues.push(Issue::new(
                        IssueCode::DefinitionInvalid,
                        format!("definition '{}' refers to itself", definition.name),
                    ));
                    break;
                }
                if !visited.insert(name.to_ascii_lowercase()) {
                    continue;
                }
                if let Some(next) = self.get(&name) {
                    stack.extend(def_names(next));
                }
            }
        }
        issues
    }
}

fn def_names(definition: &Definition) -> Vec<String> {
    let Some(content) = &definition.content else {
        return Vec::new();
    };
    let mut names = Vec::new();
    let mut stack = content.children().iter().collect::<Vec<_>>();
    while let Some(node) = stack.pop() {
        match node {
            HedNode::Def(def) => names.push(def.name().to_owned()),
            HedNode::Group(group) => {
                for tag in group.direct_tags() {
                    if let Some((name, _)) = tag.def_target(Reserved::DefExpand) {
                        names.push(name.to_owned());
                    }
                }
                stack.extend(group.children());
            }
            HedNode::Tag(_) => {}
        }
    }
    names
}

/// Removes top-level `(Definition/...)` groups from `hed` and returns them.
pub fn strip_definitions(hed: &mut HedString) -> Vec<HedGroup> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(hed.children.len());
    for node in std::mem::take(&mut hed.children) {
        match node {
            HedNode::Group(group) if group.is_definition() => removed.push(group),
            other => kept.push(other),
        }
    }
    hed.children = kept;
    if !removed.is_empty() {
        hed.refresh_source();
    }
    removed
}

/// Replaces every `Def/X` with X's content group and every `(Def-expand/X, (c))` with `(c)`.
///
/// Nested references are expanded recursively up to `max_depth` levels. On error `hed` is left
/// unchanged.
pub fn replace_defs(
    hed: &mut HedString,
    definitions: &DefinitionDict,
    schemas: &SchemaGroup,
    max_depth: usize,
) -> Result<(), DefinitionError> {
    let expander = Expander {
        definitions,
        schemas,
        max_depth,
    };
    let expanded = expander.nodes(hed.children.clone(), 0)?;
    hed.children = expanded;
    hed.refresh_source();
    Ok(())
}

struct Expander<'a> {
    definitions: &'a DefinitionDict,
    schemas: &'a SchemaGroup,
    max_depth: usize,
}

impl Expander<'_> {
    fn nodes(&self, nodes: Vec<HedNode>, depth: usize) -> Result<Vec<HedNode>, DefinitionError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                HedNode::Def(def) => {
                    if let Some(group) = self.reference(&def, depth)? {
                        out.push(HedNode::Group(group));
                    }
                }
                HedNode::Group(group) if group.is_def_expand() => {
                    let name = group
                        .direct_tags()
                        .find_map(|tag| tag.def_target(Reserved::DefExpand))
                        .map(|(name, _)| name.to_owned())
                        .unwrap_or_default();
                    for inner in group.children {
                        if let HedNode::Group(inner) = inner {
                            if let Some(inner) = self.group(inner, &name, depth + 1)? {
                                out.push(HedNode::Group(inner));
                            }
                        }
                    }
                }
                HedNode::Group(mut group) => {
                    group.children = self.nodes(group.children, depth)?;
                    if !group.is_empty() {
                        out.push(HedNode::Group(group));
                    }
                }
                tag @ HedNode::Tag(_) => out.push(tag),
            }
        }
        Ok(out)
    }

    fn reference(&self, def: &DefRef, depth: usize) -> Result<Option<HedGroup>, DefinitionError> {
        let definition = self.definitions.get(def.name()).ok_or_else(|| {
            DefinitionError::UndefinedDefinition {
                name: def.name().to_owned(),
            }
        })?;
        match definition.expand(def.value(), self.schemas)? {
            Some(group) => self.group(group, def.name(), depth + 1),
            None => Ok(None),
        }
    }

    fn group(
        &self,
        mut group: HedGroup,
        name: &str,
        depth: usize,
    ) -> Result<Option<HedGroup>, DefinitionError> {
        if depth > self.max_depth {
            return Err(DefinitionError::ExpansionTooDeep {
                name: name.to_owned(),
                max_depth: self.max_depth,
            });
        }
        group.children = self.nodes(group.children, depth)?;
        Ok((!group.is_empty()).then_some(group))
    }
}
