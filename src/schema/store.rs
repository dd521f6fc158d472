// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::tag_def::{Attributes, TagDef, TagId, EXTENSION_ALLOWED};
use super::units::{UnitClass, UnitModifier};
use super::version::{SchemaVersion, VersionSpec, VersionSpecError};
use super::wiki::parse_wiki_schema;

const HED_8_2_0: &str = include_str!("data/HED8.2.0.mediawiki");
const HED_SCORE_1_1_0: &str = include_str!("data/HED_score_1.1.0.mediawiki");

fn builtin_text(version: &SchemaVersion) -> Option<&'static str> {
    match (version.library(), version.version()) {
        (None, "8.2.0") => Some(HED_8_2_0),
        (Some("score"), "1.1.0") => Some(HED_SCORE_1_1_0),
        _ => None,
    }
}

/// Versions that can be loaded without supplying schema text.
pub fn builtin_versions() -> &'static [&'static str] {
    &["8.2.0", "score_1.1.0"]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLoadError {
    EmptySpec,
    InvalidVersion(VersionSpecError),
    UnknownVersion { version: String },
    DuplicatePrefix { prefix: String },
    Syntax { line_no: usize, reason: String },
    DuplicateTag { name: String },
    MissingParent { line_no: usize, name: String },
}

impl fmt::Display for SchemaLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySpec => f.write_str("no schema version was given"),
            Self::InvalidVersion(err) => write!(f, "invalid schema version: {err}"),
            Self::UnknownVersion { version } => {
                write!(f, "unknown schema version '{version}'")
            }
            Self::DuplicatePrefix { prefix } => {
                if prefix.is_empty() {
                    f.write_str("more than one schema was given without a prefix")
                } else {
                    write!(f, "schema prefix '{prefix}:' is used more than once")
                }
            }
            Self::Syntax { line_no, reason } => {
                write!(f, "schema syntax error on line {line_no}: {reason}")
            }
            Self::DuplicateTag { name } => write!(f, "schema defines tag '{name}' more than once"),
            Self::MissingParent { line_no, name } => write!(
                f,
                "schema node '{name}' on line {line_no} is nested deeper than its parent allows"
            ),
        }
    }
}

impl std::error::Error for SchemaLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidVersion(err) => Some(err),
            _ => None,
        }
    }
}

/// Lookup failure for a tag against a schema or schema group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound { tag: String },
    Ambiguous { tag: String, candidates: Vec<String> },
    UnknownPrefix { prefix: String },
    InvalidParent { tag: String, expected: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { tag } => write!(f, "'{tag}' is not a valid tag"),
            Self::Ambiguous { tag, candidates } => write!(
                f,
                "'{tag}' is ambiguous; it is defined in {} (qualify it with a library prefix)",
                candidates.join(", ")
            ),
            Self::UnknownPrefix { prefix } => {
                write!(f, "no schema is loaded with prefix '{prefix}:'")
            }
            Self::InvalidParent { tag, expected } => {
                write!(f, "'{tag}' has an invalid parent path (schema path is '{expected}')")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// An immutable vocabulary tree plus its unit and value classes.
#[derive(Debug, Clone)]
pub struct Schema {
    version: SchemaVersion,
    tags: Vec<TagDef>,
    roots: Vec<TagId>,
    by_short: HashMap<String, TagId>,
    by_long: HashMap<String, TagId>,
    unit_classes: BTreeMap<String, UnitClass>,
    unit_modifiers: Vec<UnitModifier>,
    value_classes: Vec<SmolStr>,
}

/// Result of matching slash-separated tag segments against one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMatch {
    pub tag: TagId,
    /// Index of the segment that first hit a schema term.
    pub anchor: usize,
    /// Index of the first segment that is not part of the schema path (extension or value).
    pub remainder_start: usize,
    /// A schema term was written with non-canonical capitalization.
    pub case_mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchFailure {
    NotFound,
    InvalidParent { expected: String },
}

impl Schema {
    pub fn from_wiki(text: &str) -> Result<Self, SchemaLoadError> {
        parse_wiki_schema(text)
    }

    pub fn builtin(version: &SchemaVersion) -> Result<Self, SchemaLoadError> {
        let text = builtin_text(version)
            .ok_or_else(|| SchemaLoadError::UnknownVersion {
                version: version.to_string(),
            })?;
        Self::from_wiki(text)
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn roots(&self) -> &[TagId] {
        &self.roots
    }

    pub fn tag(&self, id: TagId) -> &TagDef {
        &self.tags[id.index()]
    }

    pub fn tags(&self) -> impl Iterator<Item = (TagId, &TagDef)> {
        self.tags.iter().enumerate().map(|(idx, tag)| (TagId(idx as u32), tag))
    }

    /// Case-insensitive lookup of a canonical short name such as `Label`.
    pub fn find_short(&self, name: &str) -> Option<TagId> {
        self.by_short.get(&name.to_ascii_lowercase()).copied()
    }

    /// Case-insensitive lookup of a full path from a root.
    pub fn find_long(&self, path: &str) -> Option<TagId> {
        self.by_long.get(&path.to_ascii_lowercase()).copied()
    }

    /// Resolves a short name, a full long form, or a partial ancestor path ending in a
    /// schema term. Values and extensions are not accepted here.
    pub fn resolve(&self, path_or_name: &str) -> Result<TagId, LookupError> {
        let segments = path_or_name.split('/').collect::<SmallVec<[&str; 8]>>();
        match self.match_segments(&segments) {
            Ok(found) if found.remainder_start == segments.len() => Ok(found.tag),
            Ok(_) | Err(MatchFailure::NotFound) => {
                Err(LookupError::NotFound {
                    tag: path_or_name.to_owned(),
                })
            }
            Err(MatchFailure::InvalidParent { expected }) => {
                Err(LookupError::InvalidParent {
                    tag: path_or_name.to_owned(),
                    expected,
                })
            }
        }
    }

    pub fn is_term(&self, name: &str) -> bool {
        self.by_short.contains_key(&name.to_ascii_lowercase())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().filter(|tag| !tag.is_value_node()).map(TagDef::name)
    }

    pub fn child_named(&self, parent: TagId, name: &str) -> Option<TagId> {
        self.tag(parent)
            .children()
            .iter()
            .copied()
            .find(|child| {
                let child = self.tag(*child);
                !child.is_value_node() && child.name().eq_ignore_ascii_case(name)
            })
    }

    /// The `#` child of a value-taking tag.
    pub fn value_child(&self, parent: TagId) -> Option<TagId> {
        self.tag(parent).children().iter().copied().find(|child| self.tag(*child).is_value_node())
    }

    pub fn ancestors(&self, id: TagId) -> impl Iterator<Item = TagId> + '_ {
        std::iter::successors(Some(id), move |current| self.tag(*current).parent())
    }

    /// True if the tag or any ancestor carries `name`.
    pub fn inherits_attribute(&self, id: TagId, name: &str) -> bool {
        self.ancestors(id).any(|ancestor| self.tag(ancestor).has_attribute(name))
    }

    pub fn extension_allowed(&self, id: TagId) -> bool {
        self.inherits_attribute(id, EXTENSION_ALLOWED)
    }

    pub fn unit_class(&self, name: &str) -> Option<&UnitClass> {
        self.unit_classes.get(&name.to_ascii_lowercase())
    }

    pub fn unit_modifiers(&self) -> &[UnitModifier] {
        &self.unit_modifiers
    }

    pub fn value_classes(&self) -> &[SmolStr] {
        &self.value_classes
    }

    /// Locates the schema path inside `segments`.
    ///
    /// The first segment naming a schema term anchors the match; every segment before it
    /// must spell that term's ancestors. From the anchor the match descends through
    /// children as long as segment names agree.
    pub fn match_tag(&self, segments: &[&str]) -> Option<SchemaMatch> {
        self.match_segments(segments).ok()
    }

    fn match_segments(&self, segments: &[&str]) -> Result<SchemaMatch, MatchFailure> {
        let Some((anchor, tag)) = segments
            .iter()
            .enumerate()
            .find_map(|(idx, seg)| self.find_short(seg.trim()).map(|tag| (idx, tag)))
        else {
            return Err(MatchFailure::NotFound);
        };

        let tag_def = self.tag(tag);
        let path = tag_def.long_form_segments().collect::<SmallVec<[&str; 8]>>();
        let mut case_mismatch = false;
        if anchor > 0 {
            if anchor >= path.len() {
                return Err(MatchFailure::InvalidParent {
                    expected: tag_def.long_form().to_owned(),
                });
            }
            let expected = &path[path.len() - 1 - anchor..path.len() - 1];
            for (given, canonical) in segments[..anchor].iter().zip(expected) {
                let given = given.trim();
                if !given.eq_ignore_ascii_case(canonical) {
                    return Err(MatchFailure::InvalidParent {
                        expected: tag_def.long_form().to_owned(),
                    });
                }
                case_mismatch |= given != *canonical;
            }
        }
        case_mismatch |= segments[anchor].trim() != tag_def.name();

        let mut current = tag;
        let mut next = anchor + 1;
        while next < segments.len() {
            let Some(child) = self.child_named(current, segments[next].trim()) else {
                break;
            };
            case_mismatch |= segments[next].trim() != self.tag(child).name();
            current = child;
            next += 1;
        }

        Ok(SchemaMatch {
            tag: current,
            anchor,
            remainder_start: next,
            case_mismatch,
        })
    }
}

/// Incremental construction of a [`Schema`]; used by the MediaWiki loader.
#[derive(Debug)]
pub(crate) struct SchemaBuilder {
    version: SchemaVersion,
    tags: Vec<TagDef>,
    roots: Vec<TagId>,
    by_short: HashMap<String, TagId>,
    unit_classes: BTreeMap<String, UnitClass>,
    unit_modifiers: Vec<UnitModifier>,
    value_classes: Vec<SmolStr>,
}

impl SchemaBuilder {
    pub(crate) fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            tags: Vec::new(),
            roots: Vec::new(),
            by_short: HashMap::new(),
            unit_classes: BTreeMap::new(),
            unit_modifiers: Vec::new(),
            value_classes: Vec::new(),
        }
    }

    pub(crate) fn add_tag(
        &mut self,
        parent: Option<TagId>,
        name: &str,
        attributes: Attributes,
        description: Option<String>,
    ) -> Result<TagId, SchemaLoadError> {
        let id = TagId(self.tags.len() as u32);
        let long_form = match parent {
            Some(parent) => format!("{}/{name}", self.tags[parent.index()].long_form),
            None => name.to_owned(),
        };

        if name != "#" {
            let key = name.to_ascii_lowercase();
            if self.by_short.insert(key, id).is_some() {
                return Err(SchemaLoadError::DuplicateTag {
                    name: name.to_owned(),
                });
            }
        }

        self.tags.push(TagDef {
            name: SmolStr::new(name),
            long_form,
            parent,
            children: Vec::new(),
            attributes,
            description,
        });
        match parent {
            Some(parent) => self.tags[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub(crate) fn add_unit_class(&mut self, class: UnitClass) {
        self.unit_classes.insert(class.name.to_ascii_lowercase(), class);
    }

    pub(crate) fn unit_class_mut(&mut self, name: &str) -> Option<&mut UnitClass> {
        self.unit_classes.get_mut(&name.to_ascii_lowercase())
    }

    pub(crate) fn add_unit_modifier(&mut self, modifier: UnitModifier) {
        self.unit_modifiers.push(modifier);
    }

    pub(crate) fn add_value_class(&mut self, name: &str) {
        self.value_classes.push(SmolStr::new(name));
    }

    pub(crate) fn build(self) -> Schema {
        let by_long = self
            .tags
            .iter()
            .enumerate()
            .map(|(idx, tag)| (tag.long_form.to_ascii_lowercase(), TagId(idx as u32)))
            .collect();
        Schema {
            version: self.version,
            tags: self.tags,
            roots: self.roots,
            by_short: self.by_short,
            by_long,
            unit_classes: self.unit_classes,
            unit_modifiers: self.unit_modifiers,
            value_classes: self.value_classes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaMember {
    prefix: Option<SmolStr>,
    schema: Arc<Schema>,
}

impl SchemaMember {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn label(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.schema.version()),
            None => self.schema.version().to_string(),
        }
    }
}

/// Where a tag was found in a [`SchemaGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch {
    pub member: usize,
    pub tag: TagId,
    pub anchor: usize,
    pub remainder_start: usize,
    pub case_mismatch: bool,
}

/// Ordered list of schemas consulted together. Shared read-only after construction.
#[derive(Debug, Clone)]
pub struct SchemaGroup {
    members: Vec<SchemaMember>,
}

impl SchemaGroup {
    pub fn single(schema: Schema) -> Self {
        Self {
            members: vec![SchemaMember {
                prefix: None,
                schema: Arc::new(schema),
            }],
        }
    }

    /// Builds a group from already-loaded schemas. Prefixes must be unique; `None` counts
    /// as a prefix of its own.
    pub fn new(members: Vec<(Option<&str>, Arc<Schema>)>) -> Result<Self, SchemaLoadError> {
        if members.is_empty() {
            return Err(SchemaLoadError::EmptySpec);
        }
        let mut seen = Vec::<Option<String>>::new();
        let mut out = Vec::with_capacity(members.len());
        for (prefix, schema) in members {
            let prefix = prefix.map(|p| p.trim_end_matches(':').to_ascii_lowercase());
            if seen.contains(&prefix) {
                return Err(SchemaLoadError::DuplicatePrefix {
                    prefix: prefix.unwrap_or_default(),
                });
            }
            seen.push(prefix.clone());
            out.push(SchemaMember {
                prefix: prefix.map(SmolStr::new),
                schema,
            });
        }
        Ok(Self { members: out })
    }

    /// Loads built-in schemas from one or more version strings such as `8.2.0` or
    /// `sc:score_1.1.0`.
    pub fn load<S: AsRef<str>>(versions: &[S]) -> Result<Self, SchemaLoadError> {
        if versions.is_empty() {
            return Err(SchemaLoadError::EmptySpec);
        }
        let specs = versions
            .iter()
            .map(|v| VersionSpec::parse(v.as_ref()).map_err(SchemaLoadError::InvalidVersion))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = Vec::<Option<&str>>::new();
        for spec in &specs {
            if seen.contains(&spec.prefix()) {
                return Err(SchemaLoadError::DuplicatePrefix {
                    prefix: spec.prefix().unwrap_or_default().to_owned(),
                });
            }
            seen.push(spec.prefix());
        }

        let mut members = Vec::with_capacity(specs.len());
        for spec in &specs {
            let schema = Schema::builtin(spec.schema_version())?;
            tracing::debug!(version = %spec, tags = schema.len(), "loaded schema");
            members.push(SchemaMember {
                prefix: spec.prefix().map(SmolStr::new),
                schema: Arc::new(schema),
            });
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[SchemaMember] {
        &self.members
    }

    pub fn member(&self, index: usize) -> &SchemaMember {
        &self.members[index]
    }

    pub fn tag(&self, member: usize, id: TagId) -> &TagDef {
        self.members[member].schema.tag(id)
    }

    pub fn schema(&self, member: usize) -> &Schema {
        &self.members[member].schema
    }

    /// Comma-separated version list, e.g. `8.2.0, sc:score_1.1.0`.
    pub fn version_label(&self) -> String {
        self.members.iter().map(SchemaMember::label).collect::<Vec<_>>().join(", ")
    }

    pub fn is_term(&self, name: &str) -> bool {
        self.members.iter().any(|member| member.schema.is_term(name))
    }

    /// Finds the schema path of a tag that may carry an extension or value.
    ///
    /// `sc:Foo` only consults the member loaded with prefix `sc`. Unqualified names found
    /// in more than one member are ambiguous unless written as a full path from a root, in
    /// which case the first member in list order wins.
    pub fn find_tag(&self, text: &str) -> Result<TagMatch, LookupError> {
        let (prefix, body) = split_prefix(text);
        let candidates = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, member)| match prefix {
                Some(prefix) => member.prefix().is_some_and(|p| p.eq_ignore_ascii_case(prefix)),
                None => true,
            })
            .collect::<SmallVec<[_; 4]>>();

        if let (Some(prefix), true) = (prefix, candidates.is_empty()) {
            return Err(LookupError::UnknownPrefix {
                prefix: prefix.to_owned(),
            });
        }

        let segments = body.split('/').collect::<SmallVec<[&str; 8]>>();
        let mut found = SmallVec::<[(usize, SchemaMatch); 2]>::new();
        let mut invalid_parent = None;
        for (index, member) in candidates {
            match member.schema.match_segments(&segments) {
                Ok(hit) => found.push((index, hit)),
                Err(MatchFailure::InvalidParent { expected }) => {
                    invalid_parent.get_or_insert(expected);
                }
                Err(MatchFailure::NotFound) => {}
            }
        }

        match found.as_slice() {
            [] => Err(match invalid_parent {
                Some(expected) => LookupError::InvalidParent {
                    tag: text.to_owned(),
                    expected,
                },
                None => LookupError::NotFound {
                    tag: text.to_owned(),
                },
            }),
            [(member, hit)] => Ok(to_tag_match(*member, *hit)),
            [(member, hit), ..] => {
                let rooted = found.iter().all(|(m, h)| {
                    let schema = self.schema(*m);
                    h.anchor == 0
                        && schema
                            .find_short(segments[0].trim())
                            .is_some_and(|id| schema.tag(id).parent().is_none())
                });
                if rooted {
                    return Ok(to_tag_match(*member, *hit));
                }
                Err(LookupError::Ambiguous {
                    tag: text.to_owned(),
                    candidates: found.iter().map(|(m, _)| self.members[*m].label()).collect(),
                })
            }
        }
    }

    /// Exact lookup by short name or path (no extension or value).
    pub fn resolve(&self, path_or_name: &str) -> Result<(usize, TagId), LookupError> {
        let found = self.find_tag(path_or_name)?;
        let (_, body) = split_prefix(path_or_name);
        if found.remainder_start != body.split('/').count() {
            return Err(LookupError::NotFound {
                tag: path_or_name.to_owned(),
            });
        }
        Ok((found.member, found.tag))
    }

    /// Closest schema term to `term` when its similarity ratio reaches `cutoff` (0.0..=1.0).
    pub fn suggest(&self, term: &str, cutoff: f64) -> Option<&str> {
        let needle = term.to_ascii_lowercase();
        let mut best: Option<(f64, &str)> = None;
        for member in &self.members {
            for candidate in member.schema.terms() {
                let score = rapidfuzz::fuzz::ratio(
                    needle.chars(),
                    candidate.to_ascii_lowercase().chars(),
                );
                if score >= cutoff && best.map_or(true, |(best_score, _)| score > best_score) {
                    best = Some((score, candidate));
                }
            }
        }
        best.map(|(_, name)| name)
    }
}

fn to_tag_match(member: usize, hit: SchemaMatch) -> TagMatch {
    TagMatch {
        member,
        tag: hit.tag,
        anchor: hit.anchor,
        remainder_start: hit.remainder_start,
        case_mismatch: hit.case_mismatch,
    }
}

/// Splits a library prefix (`sc:Foo` -> `("sc", "Foo")`). Colons after the first `/` belong
/// to values and are not prefixes.
pub fn split_prefix(text: &str) -> (Option<&str>, &str) {
    let head = text.split('/').next().unwrap_or_default();
    match head.split_once(':') {
        Some((prefix, _))
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            (Some(prefix), &text[prefix.len() + 1..])
        }
        _ => (None, text),
    }
}

#[cfg(test)]
mod tests;
