// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Schema conformance checks for parsed annotation strings.
//!
//! Issues are emitted while walking the tree in text order, so identical input always yields
//! the same list in the same order. Group-level problems are reported at the group's opening
//! parenthesis, before anything inside the group.

use std::borrow::Cow;
use std::collections::HashSet;

use super::node::{DefRef, HedGroup, HedNode, HedString, HedTag, Reserved, ResolvedTag};
use super::parser::{parse, ParseError};
use super::resolve::{lookup, resolve};
use crate::issues::{Issue, IssueCode, IssueList};
use crate::schema::{
    split_value_unit, value_class_accepts, LookupError, SchemaGroup, TagId, NAME_CLASS,
    REQUIRE_CHILD, TAG_GROUP, TOP_LEVEL_TAG_GROUP, UNIQUE, UNIT_CLASS, VALUE_CLASS,
};
use crate::sidecar::{definition_shape, DefinitionDict};

/// Knobs for one validation pass.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions<'a> {
    /// Keep warning-severity issues in the result.
    pub check_warnings: bool,
    /// `#` placeholders are accepted (sidecar value templates).
    pub allow_placeholders: bool,
    /// `(Definition/..., (...))` groups are accepted at the top level.
    pub allow_definitions: bool,
    /// When present, every `Def` and `Def-expand` must name an entry with a matching value.
    pub definitions: Option<&'a DefinitionDict>,
    /// Minimum similarity for a "did you mean" hint on unknown tags.
    pub suggestion_cutoff: f64,
}

impl Default for ValidationOptions<'_> {
    fn default() -> Self {
        Self {
            check_warnings: false,
            allow_placeholders: false,
            allow_definitions: false,
            definitions: None,
            suggestion_cutoff: 0.8,
        }
    }
}

impl<'a> ValidationOptions<'a> {
    pub fn with_warnings(mut self, check_warnings: bool) -> Self {
        self.check_warnings = check_warnings;
        self
    }

    pub fn with_definitions(mut self, definitions: &'a DefinitionDict) -> Self {
        self.definitions = Some(definitions);
        self
    }
}

/// Validates a parsed string. Tags that have not been resolved yet are looked up on the fly.
pub fn validate(
    hed: &HedString,
    schemas: &SchemaGroup,
    options: &ValidationOptions<'_>,
) -> IssueList {
    let mut validator = Validator {
        schemas,
        options,
        issues: IssueList::new(),
        unique_seen: HashSet::new(),
    };
    validator.walk(hed.children(), 0, false);
    validator.issues.filtered(options.check_warnings)
}

/// Parses, resolves and validates `text`. Malformed grouping is a structural error.
pub fn validate_str(
    text: &str,
    schemas: &SchemaGroup,
    options: &ValidationOptions<'_>,
) -> Result<IssueList, ParseError> {
    let mut hed = parse(text)?;
    resolve(&mut hed, schemas);
    Ok(validate(&hed, schemas, options))
}

struct Validator<'a, 'o> {
    schemas: &'a SchemaGroup,
    options: &'o ValidationOptions<'o>,
    issues: IssueList,
    unique_seen: HashSet<(usize, TagId)>,
}

impl Validator<'_, '_> {
    fn push(&mut self, code: IssueCode, message: String) {
        self.issues.push(Issue::new(code, message));
    }

    fn walk(&mut self, nodes: &[HedNode], depth: usize, placeholders: bool) {
        let mut seen = HashSet::new();
        for node in nodes {
            match node {
                HedNode::Group(group) => {
                    let inner_placeholders = self.check_group(group, depth + 1) || placeholders;
                    self.walk(group.children(), depth + 1, inner_placeholders);
                }
                HedNode::Tag(tag) => {
                    self.check_tag(tag, depth, placeholders);
                    self.check_repeated(tag, &mut seen);
                }
                HedNode::Def(def) => {
                    self.check_tag(&def.tag, depth, placeholders);
                    self.check_def(def);
                    self.check_repeated(&def.tag, &mut seen);
                }
            }
        }
    }

    fn check_repeated(&mut self, tag: &HedTag, seen: &mut HashSet<String>) {
        if !seen.insert(tag.identity()) {
            self.push(
                IssueCode::TagRepeated,
                format!("'{}' appears more than once in the same group", tag.text()),
            );
        }
    }

    /// Structural checks for one group. Returns true when its content may use `#`.
    fn check_group(&mut self, group: &HedGroup, depth: usize) -> bool {
        let mut placeholders = false;

        if group.is_definition() {
            if !self.options.allow_definitions || depth != 1 {
                self.push(
                    IssueCode::DefinitionInvalid,
                    format!("definition {group} is not allowed here"),
                );
            } else {
                if let Err(reason) = definition_shape(group) {
                    self.push(IssueCode::DefinitionInvalid, reason);
                }
                placeholders = group.direct_tags().any(|tag| {
                    tag.def_target(Reserved::Definition)
                        .is_some_and(|(_, value)| value == Some("#"))
                });
            }
        }

        if group.is_def_expand() {
            self.check_def_expand(group);
        }

        let temporal = group
            .direct_tags()
            .filter(|tag| tag.reserved().is_some_and(Reserved::is_temporal))
            .collect::<Vec<_>>();
        if !temporal.is_empty() && depth == 1 {
            if let Err(reason) = temporal_shape(group, &temporal) {
                self.push(IssueCode::TemporalTagError, reason);
            }
        }

        placeholders
    }

    fn check_def_expand(&mut self, group: &HedGroup) {
        let expands = group
            .direct_tags()
            .filter(|tag| tag.reserved() == Some(Reserved::DefExpand))
            .collect::<Vec<_>>();
        let other_tags = group.direct_tags().count() - expands.len();
        if expands.len() != 1 || other_tags > 0 || group.direct_groups().count() > 1 {
            self.push(
                IssueCode::DefinitionInvalid,
                format!("{group} must hold exactly one Def-expand tag and at most one group"),
            );
            return;
        }
        let Some(dict) = self.options.definitions else {
            return;
        };
        if let Some((name, value)) = expands[0].def_target(Reserved::DefExpand) {
            self.check_def_target(dict, expands[0].text(), name, value);
        }
    }

    fn check_def(&mut self, def: &DefRef) {
        if let Some(dict) = self.options.definitions {
            self.check_def_target(dict, def.tag.text(), def.name(), def.value());
        }
    }

    fn check_def_target(
        &mut self,
        dict: &DefinitionDict,
        text: &str,
        name: &str,
        value: Option<&str>,
    ) {
        match dict.get(name) {
            None => self.push(
                IssueCode::DefUnmatched,
                format!("'{text}' refers to an unknown definition '{name}'"),
            ),
            Some(definition) if definition.takes_value() != value.is_some() => {
                let reason = if definition.takes_value() {
                    "requires a value"
                } else {
                    "does not take a value"
                };
                self.push(
                    IssueCode::DefValueMismatch,
                    format!("'{text}': definition '{}' {reason}", definition.name()),
                );
            }
            Some(_) => {}
        }
    }

    fn check_tag(&mut self, tag: &HedTag, depth: usize, placeholders: bool) {
        let resolved = match tag.lookup_error() {
            Some(err) => {
                self.report_lookup(tag, err);
                return;
            }
            None => match tag.resolved() {
                Some(resolved) => Cow::Borrowed(resolved),
                None => match lookup(tag, self.schemas) {
                    Ok(resolved) => Cow::Owned(resolved),
                    Err(err) => {
                        self.report_lookup(tag, &err);
                        return;
                    }
                },
            },
        };
        let resolved = resolved.as_ref();
        let schema = self.schemas.schema(resolved.member());
        let def = schema.tag(resolved.tag());

        if resolved.case_mismatch() {
            self.push(
                IssueCode::StyleWarning,
                format!(
                    "'{}' does not match the schema capitalization '{}'",
                    tag.text(),
                    resolved.name()
                ),
            );
        }

        self.check_placement(tag, resolved, depth);

        let key = (resolved.member(), resolved.tag());
        if def.has_attribute(UNIQUE) && !self.unique_seen.insert(key) {
            self.push(
                IssueCode::TagNotUnique,
                format!("'{}' may appear only once in an annotation", resolved.name()),
            );
        }

        if tag.has_placeholder() {
            let reserved = tag.reserved();
            let standalone = match reserved {
                Some(kind @ (Reserved::Def | Reserved::DefExpand | Reserved::Definition)) => tag
                    .def_target(kind)
                    .is_some_and(|(_, value)| value == Some("#")),
                _ => resolved
                    .value()
                    .is_some_and(|value| split_value_unit(value).0 == "#"),
            };
            if !placeholders && reserved != Some(Reserved::Definition) {
                self.push(
                    IssueCode::PlaceholderInvalid,
                    format!("'{}' uses a '#' placeholder where none is allowed", tag.text()),
                );
            } else if !standalone {
                self.push(
                    IssueCode::PlaceholderInvalid,
                    format!(
                        "'#' in '{}' must stand alone as the value of a value-taking tag",
                        tag.text()
                    ),
                );
            }
            return;
        }

        if let Some(extension) = resolved.extension() {
            self.check_extension(tag, resolved, extension);
        } else if let (Some(value), Some(value_node)) = (resolved.value(), resolved.value_node()) {
            self.check_value(tag, resolved, value, value_node);
        } else if def.has_attribute(REQUIRE_CHILD) {
            self.push(
                IssueCode::TagRequiresChild,
                format!("'{}' requires a child or value", tag.text()),
            );
        }
    }

    fn check_placement(&mut self, tag: &HedTag, resolved: &ResolvedTag, depth: usize) {
        let def = self.schemas.tag(resolved.member(), resolved.tag());
        if def.has_attribute(TOP_LEVEL_TAG_GROUP) && depth != 1 {
            self.push(
                IssueCode::TagGroupError,
                format!("'{}' must be in a top-level tag group", tag.text()),
            );
        } else if def.has_attribute(TAG_GROUP) && depth == 0 {
            self.push(
                IssueCode::TagGroupError,
                format!("'{}' must be inside a tag group", tag.text()),
            );
        }
    }

    fn check_extension(&mut self, tag: &HedTag, resolved: &ResolvedTag, extension: &str) {
        let schema = self.schemas.schema(resolved.member());
        if !schema.extension_allowed(resolved.tag()) {
            self.push(
                IssueCode::TagExtensionNotAllowed,
                format!("'{}' cannot be extended with '{extension}'", resolved.name()),
            );
            return;
        }
        if let Some(term) = extension.split('/').find(|seg| self.schemas.is_term(seg)) {
            self.push(
                IssueCode::TagExtensionInvalid,
                format!(
                    "extension '{term}' of '{}' is already a schema term",
                    resolved.name()
                ),
            );
            return;
        }
        self.push(
            IssueCode::TagExtended,
            format!("'{}' extends '{}' with '{extension}'", tag.text(), resolved.name()),
        );
    }

    fn check_value(&mut self, tag: &HedTag, resolved: &ResolvedTag, value: &str, node: TagId) {
        let schema = self.schemas.schema(resolved.member());
        let attributes = schema.tag(node).attributes();

        if let Some(reserved) = tag.reserved().filter(|r| {
            matches!(r, Reserved::Def | Reserved::DefExpand | Reserved::Definition)
        }) {
            let name = tag
                .def_target(reserved)
                .map_or(value, |(name, _)| name);
            if !value_class_accepts(NAME_CLASS, name) {
                self.push(
                    IssueCode::ValueInvalid,
                    format!("'{name}' is not a valid definition name in '{}'", tag.text()),
                );
            }
            return;
        }

        let mut number = value;
        let unit_classes = attributes.values(UNIT_CLASS);
        if !unit_classes.is_empty() {
            let (head, unit) = split_value_unit(value);
            match unit {
                Some(unit) => {
                    let accepted = unit_classes
                        .iter()
                        .filter_map(|class| schema.unit_class(class))
                        .any(|class| class.accepts(unit, schema.unit_modifiers()));
                    if !accepted {
                        self.push(
                            IssueCode::UnitsInvalid,
                            format!(
                                "'{unit}' is not a valid {} unit in '{}'",
                                unit_classes.join("/"),
                                tag.text()
                            ),
                        );
                        return;
                    }
                    number = head;
                }
                None => {
                    let default = unit_classes
                        .iter()
                        .filter_map(|class| schema.unit_class(class))
                        .find_map(|class| class.default_units())
                        .unwrap_or("default units");
                    self.push(
                        IssueCode::UnitsMissing,
                        format!("'{}' has no units; '{default}' is assumed", tag.text()),
                    );
                }
            }
        }

        let value_classes = attributes.values(VALUE_CLASS);
        let accepted = value_classes
            .iter()
            .any(|class| value_class_accepts(class, number));
        if !value_classes.is_empty() && !accepted {
            self.push(
                IssueCode::ValueInvalid,
                format!(
                    "'{number}' is not a valid {} value for '{}'",
                    value_classes.join("/"),
                    resolved.name()
                ),
            );
        }
    }

    fn report_lookup(&mut self, tag: &HedTag, err: &LookupError) {
        let code = match err {
            LookupError::NotFound { .. } | LookupError::InvalidParent { .. } => {
                IssueCode::TagInvalid
            }
            LookupError::Ambiguous { .. } => IssueCode::TagAmbiguous,
            LookupError::UnknownPrefix { .. } => IssueCode::TagPrefixInvalid,
        };
        let mut message = err.to_string();
        if matches!(err, LookupError::NotFound { .. }) {
            let hint = tag
                .segments()
                .find(|segment| !self.schemas.is_term(segment))
                .and_then(|segment| self.schemas.suggest(segment, self.options.suggestion_cutoff));
            if let Some(hint) = hint {
                message.push_str(&format!("; did you mean '{hint}'?"));
            }
        }
        self.push(code, message);
    }
}

/// Checks `(Def/X, Onset[, (content)])`, `(Def/X, Offset)` and `(Def/X, Inset[, (content)])`.
fn temporal_shape(group: &HedGroup, temporal: &[&HedTag]) -> Result<(), String> {
    let Some(kind) = temporal.first().and_then(|tag| tag.reserved()) else {
        return Ok(());
    };
    if temporal.len() > 1 {
        return Err(format!("{group} holds more than one Onset/Offset/Inset tag"));
    }

    let anchors = group.children().iter().filter(|node| is_anchor(node)).count();
    if anchors != 1 {
        return Err(format!("{group} must hold exactly one Def or Def-expand anchor"));
    }

    let extra = group.children().len() - 2;
    let content_is_group = group
        .children()
        .iter()
        .any(|node| !is_anchor(node) && node.as_group().is_some());
    match kind {
        Reserved::Offset if extra > 0 => {
            Err(format!("{group}: Offset groups take no other content"))
        }
        _ if extra > 1 => Err(format!("{group} may hold at most one content group")),
        _ if extra == 1 && !content_is_group => {
            Err(format!("{group}: extra content must be a single group"))
        }
        _ => Ok(()),
    }
}

fn is_anchor(node: &HedNode) -> bool {
    match node {
        HedNode::Def(_) => true,
        HedNode::Group(group) => group.is_def_expand(),
        HedNode::Tag(_) => false,
    }
}
