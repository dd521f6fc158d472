// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// Index of a [`TagDef`] inside its owning schema arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(pub(crate) u32);

impl TagId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub const EXTENSION_ALLOWED: &str = "extensionAllowed";
pub const TAKES_VALUE: &str = "takesValue";
pub const VALUE_CLASS: &str = "valueClass";
pub const UNIT_CLASS: &str = "unitClass";
pub const REQUIRE_CHILD: &str = "requireChild";
pub const TOP_LEVEL_TAG_GROUP: &str = "topLevelTagGroup";
pub const TAG_GROUP: &str = "tagGroup";
pub const UNIQUE: &str = "unique";
pub const RESERVED: &str = "reserved";

/// Schema attributes attached to a node. Flag attributes map to an empty value list.
///
/// Names are matched case-insensitively; the canonical spelling is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: BTreeMap<SmolStr, (SmolStr, Vec<String>)>,
}

impl Attributes {
    pub fn insert_flag(&mut self, name: &str) {
        self.entries
            .entry(SmolStr::new(name.to_ascii_lowercase()))
            .or_insert_with(|| (SmolStr::new(name), Vec::new()));
    }

    pub fn insert_value(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(SmolStr::new(name.to_ascii_lowercase()))
            .or_insert_with(|| (SmolStr::new(name), Vec::new()))
            .1
            .push(value.into());
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name.to_ascii_lowercase().as_str())
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.entries
            .get(name.to_ascii_lowercase().as_str())
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One node of the vocabulary tree.
///
/// Children are owned by the schema arena; `parent` is a back-reference by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef {
    pub(crate) name: SmolStr,
    pub(crate) long_form: String,
    pub(crate) parent: Option<TagId>,
    pub(crate) children: Vec<TagId>,
    pub(crate) attributes: Attributes,
    pub(crate) description: Option<String>,
}

impl TagDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slash-separated path from the root, e.g. `Property/Informational-property/Label`.
    pub fn long_form(&self) -> &str {
        &self.long_form
    }

    pub fn parent(&self) -> Option<TagId> {
        self.parent
    }

    pub fn children(&self) -> &[TagId] {
        &self.children
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has(name)
    }

    pub fn is_value_node(&self) -> bool {
        self.name == "#"
    }

    pub fn long_form_segments(&self) -> impl Iterator<Item = &str> {
        self.long_form.split('/')
    }
}
