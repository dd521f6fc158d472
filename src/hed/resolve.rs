// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::node::{HedString, HedTag, ResolvedTag};
use crate::schema::{LookupError, SchemaGroup};

/// Attaches schema information to every tag of `hed`. Lookup failures are recorded on the
/// tag and reported later by validation.
pub fn resolve(hed: &mut HedString, schemas: &SchemaGroup) {
    for tag in hed.tags_mut() {
        resolve_tag(tag, schemas);
    }
}

pub fn resolve_tag(tag: &mut HedTag, schemas: &SchemaGroup) {
    let resolution = lookup(tag, schemas);
    tag.set_resolution(resolution);
}

pub(crate) fn lookup(tag: &HedTag, schemas: &SchemaGroup) -> Result<ResolvedTag, LookupError> {
    let found = schemas.find_tag(tag.text())?;
    let schema = schemas.schema(found.member);
    let def = schema.tag(found.tag);

    let remainder = tag
        .segments()
        .skip(found.remainder_start)
        .collect::<SmallVec<[&str; 4]>>();
    let rest = (!remainder.is_empty()).then(|| remainder.join("/"));
    let value_node = rest.as_ref().and_then(|_| schema.value_child(found.tag));

    let (extension, value) = match (rest, value_node) {
        (Some(rest), Some(_)) => (None, Some(rest)),
        (Some(rest), None) => (Some(rest), None),
        (None, _) => (None, None),
    };

    Ok(ResolvedTag {
        member: found.member,
        tag: found.tag,
        name: SmolStr::new(def.name()),
        base_long_form: def.long_form().to_owned(),
        value_node,
        extension,
        value,
        case_mismatch: found.case_mismatch,
    })
}
