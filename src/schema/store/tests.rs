// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::{split_prefix, LookupError, Schema, SchemaGroup, SchemaLoadError};
use crate::schema::version::SchemaVersion;

#[fixture]
fn standard() -> SchemaGroup {
    SchemaGroup::load(&["8.2.0"]).expect("load 8.2.0")
}

#[fixture]
fn combined() -> SchemaGroup {
    SchemaGroup::load(&["8.2.0", "sc:score_1.1.0"]).expect("load group")
}

#[rstest]
#[case("Red")]
#[case("red")]
#[case("Red-color/Red")]
#[case("Color/CSS-color/Red-color/Red")]
#[case(
    "Property/Sensory-property/Sensory-attribute/Visual-attribute/Color/CSS-color/Red-color/Red"
)]
fn resolves_short_partial_and_long_forms(standard: SchemaGroup, #[case] text: &str) {
    let (member, id) = standard.resolve(text).expect("resolve");
    assert_eq!(member, 0);
    assert_eq!(
        standard.tag(member, id).long_form(),
        "Property/Sensory-property/Sensory-attribute/Visual-attribute/Color/CSS-color/Red-color/Red"
    );
}

#[rstest]
fn rejects_wrong_ancestor_path(standard: SchemaGroup) {
    let err = standard.resolve("Colour/Red").expect_err("invalid parent");
    assert!(matches!(err, LookupError::InvalidParent { .. }), "{err}");
}

#[rstest]
fn unknown_names_are_not_found(standard: SchemaGroup) {
    assert_eq!(
        standard.resolve("Blech"),
        Err(LookupError::NotFound {
            tag: "Blech".to_owned()
        })
    );
}

#[rstest]
fn find_tag_reports_extension_remainder(standard: SchemaGroup) {
    let found = standard.find_tag("Blue/Apple").expect("find");
    assert_eq!(standard.tag(found.member, found.tag).name(), "Blue");
    assert_eq!(found.anchor, 0);
    assert_eq!(found.remainder_start, 1);
    assert!(!found.case_mismatch);

    let lowered = standard.find_tag("blue").expect("find");
    assert!(lowered.case_mismatch);
}

#[rstest]
fn resolve_rejects_extended_text(standard: SchemaGroup) {
    assert!(matches!(
        standard.resolve("Blue/Apple"),
        Err(LookupError::NotFound { .. })
    ));
}

#[rstest]
fn duplicate_short_names_need_a_prefix(combined: SchemaGroup) {
    let err = combined.find_tag("Alert").expect_err("ambiguous");
    let LookupError::Ambiguous { candidates, .. } = err else {
        panic!("expected ambiguity, got {err:?}");
    };
    assert_eq!(candidates, vec!["8.2.0".to_owned(), "sc:score_1.1.0".to_owned()]);

    let scored = combined.find_tag("sc:Alert").expect("prefixed");
    assert_eq!(scored.member, 1);
    assert_eq!(
        combined.tag(scored.member, scored.tag).long_form(),
        "Patient-state/Consciousness/Alert"
    );

    let standard = combined
        .find_tag("Agent-cognitive-state/Alert")
        .expect("partial path disambiguates");
    assert_eq!(standard.member, 0);
}

#[rstest]
fn unique_names_resolve_across_members(combined: SchemaGroup) {
    assert_eq!(combined.resolve("Hyperventilation").map(|(m, _)| m), Ok(1));
    assert_eq!(combined.resolve("Green").map(|(m, _)| m), Ok(0));
    assert!(combined.is_term("eye-blink-artifact"));
}

#[rstest]
fn unknown_prefix_is_reported(combined: SchemaGroup) {
    assert_eq!(
        combined.find_tag("xy:Red"),
        Err(LookupError::UnknownPrefix {
            prefix: "xy".to_owned()
        })
    );
}

#[rstest]
fn version_label_lists_members(combined: SchemaGroup) {
    assert_eq!(combined.version_label(), "8.2.0, sc:score_1.1.0");
}

#[rstest]
#[case(&["8.2.0", "8.2.0"], "")]
#[case(&["sc:score_1.1.0", "SC:8.2.0"], "sc")]
fn duplicate_prefixes_fail(#[case] versions: &[&str], #[case] prefix: &str) {
    assert_eq!(
        SchemaGroup::load(versions).map(|_| ()),
        Err(SchemaLoadError::DuplicatePrefix {
            prefix: prefix.to_owned()
        })
    );
}

#[test]
fn unknown_and_malformed_versions_fail() {
    assert!(matches!(
        SchemaGroup::load(&["9.9.9"]),
        Err(SchemaLoadError::UnknownVersion { .. })
    ));
    assert!(matches!(
        SchemaGroup::load(&["8.2"]),
        Err(SchemaLoadError::InvalidVersion(_))
    ));
    assert!(matches!(
        SchemaGroup::load::<&str>(&[]),
        Err(SchemaLoadError::EmptySpec)
    ));
}

#[test]
fn prebuilt_schemas_form_a_group() {
    let schema = Arc::new(Schema::builtin(&SchemaVersion::new(None, "8.2.0")).expect("builtin"));
    let group = SchemaGroup::new(vec![(None, schema.clone()), (Some("ts:"), schema.clone())])
        .expect("group");
    assert_eq!(group.members()[1].prefix(), Some("ts"));

    let duplicate = SchemaGroup::new(vec![(None, schema.clone()), (None, schema)]);
    assert!(matches!(
        duplicate,
        Err(SchemaLoadError::DuplicatePrefix { .. })
    ));
}

#[rstest]
fn inherited_extension_permission(standard: SchemaGroup) {
    let schema = standard.schema(0);
    let blue = schema.find_short("Blue").expect("blue");
    let speak = schema.find_short("Speak").expect("speak");
    assert!(schema.extension_allowed(blue));
    assert!(!schema.extension_allowed(speak));
}

#[rstest]
#[case("Blu", Some("Blue"))]
#[case("Sensory-evnt", Some("Sensory-event"))]
#[case("Qzxwv", None)]
fn suggests_close_terms(standard: SchemaGroup, #[case] term: &str, #[case] expected: Option<&str>) {
    assert_eq!(standard.suggest(term, 0.8), expected);
}

#[rstest]
#[case("sc:Alert", Some("sc"), "Alert")]
#[case("Label/a:b", None, "Label/a:b")]
#[case("Red", None, "Red")]
#[case("1:Red", None, "1:Red")]
fn splits_library_prefixes(
    #[case] text: &str,
    #[case] prefix: Option<&str>,
    #[case] body: &str,
) {
    assert_eq!(split_prefix(text), (prefix, body));
}
