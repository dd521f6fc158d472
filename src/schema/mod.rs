// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Versioned HED vocabularies.
//!
//! A [`Schema`] is an immutable tag tree loaded from MediaWiki text; a [`SchemaGroup`] is an
//! ordered list of schemas (optionally prefixed, e.g. `sc:`) consulted together. Both are
//! built once and shared read-only.

mod store;
mod tag_def;
mod units;
mod version;
mod wiki;

pub use store::{
    builtin_versions, split_prefix, LookupError, Schema, SchemaGroup, SchemaLoadError,
    SchemaMatch, SchemaMember, TagMatch,
};
pub use tag_def::{
    Attributes, TagDef, TagId, EXTENSION_ALLOWED, REQUIRE_CHILD, RESERVED, TAG_GROUP,
    TAKES_VALUE, TOP_LEVEL_TAG_GROUP, UNIQUE, UNIT_CLASS, VALUE_CLASS,
};
pub use units::{
    split_value_unit, value_class_accepts, Unit, UnitClass, UnitModifier, NAME_CLASS,
    NUMERIC_CLASS, TEXT_CLASS,
};
pub use version::{SchemaVersion, VersionSpec, VersionSpecError};
