// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::{
    assemble_row, get_hed_string_objs, remove_categories, Assembler, AssemblyError,
    AssemblyOptions, Cell, CategoryError, CategorySet, TabularError, TabularInput,
};
use crate::hed::{parse, resolve, ValidationOptions};
use crate::issues::IssueCode;
use crate::schema::SchemaGroup;
use crate::sidecar::{replace_defs, Sidecar};

const NO_CATEGORIES: &[&str] = &[];

#[fixture]
fn schemas() -> SchemaGroup {
    SchemaGroup::load(&["8.2.0"]).expect("schema")
}

#[fixture]
fn sidecar() -> Arc<Sidecar> {
    let mut sidecar = Sidecar::new();
    sidecar.insert_categorical(
        "trial_type",
        [
            ("go", "Label/Go-trial, Def/Cue"),
            ("stop", "Label/Stop-trial"),
            ("odd", "Label/Odd-trial, Def/Nope"),
        ],
    );
    sidecar.insert_value("count", "Def/Acc/#");
    sidecar.insert_value("rt", "Time-value/# s");
    sidecar.insert_categorical(
        "defs",
        [
            ("cue", "(Definition/Cue, (Green))"),
            ("acc", "(Definition/Acc/#, (Item-count/#))"),
        ],
    );
    Arc::new(sidecar)
}

fn strings(rows: &[Option<crate::hed::HedString>]) -> Vec<Option<String>> {
    rows.iter().map(|row| row.as_ref().map(ToString::to_string)).collect()
}

fn options() -> AssemblyOptions {
    AssemblyOptions::default()
}

#[rstest]
fn categorical_rows_assemble_in_order(schemas: SchemaGroup) {
    let mut sidecar = Sidecar::new();
    sidecar.insert_categorical(
        "trial_type",
        [("go", "Label/Go-trial"), ("stop", "Label/Stop-trial")],
    );
    let table = TabularInput::from_rows(&["trial_type"], [["go"], ["stop"], ["n/a"]])
        .expect("table")
        .with_sidecar(Arc::new(sidecar));

    let rows = get_hed_string_objs(&table, &schemas, NO_CATEGORIES, false, false).expect("rows");
    assert_eq!(
        strings(&rows),
        vec![
            Some("Label/Go-trial".to_owned()),
            Some("Label/Stop-trial".to_owned()),
            None,
        ]
    );
}

#[rstest]
fn joins_fragments_in_column_order(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let table = TabularInput::from_rows(
        &["onset", "trial_type", "rt", "HED"],
        [["1.0", "stop", "0.45", "Red"], ["2.0", "n/a", "", "n/a"]],
    )
    .expect("table")
    .with_sidecar(sidecar);

    let hed = assemble_row(&table, 0, &schemas).expect("row");
    assert_eq!(hed.to_string(), "Label/Stop-trial, Time-value/0.45 s, Red");
    assert!(hed.tags().iter().all(|tag| tag.is_resolved()));

    let empty = assemble_row(&table, 1, &schemas).expect("row");
    assert!(empty.is_empty());
    let rows = get_hed_string_objs(&table, &schemas, NO_CATEGORIES, false, false).expect("rows");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].is_none());
}

#[rstest]
fn failing_rows_become_none_and_processing_continues(
    schemas: SchemaGroup,
    sidecar: Arc<Sidecar>,
) {
    let table = TabularInput::from_rows(
        &["trial_type", "HED"],
        [["stop", "n/a"], ["pause", "Red"], ["n/a", "(Red"], ["stop", "Blue"]],
    )
    .expect("table")
    .with_sidecar(sidecar);

    let assembly = Assembler::new(&schemas, options()).expect("assembler").assemble(&table);
    assert_eq!(
        assembly.strings(),
        vec![
            Some("Label/Stop-trial".to_owned()),
            None,
            None,
            Some("Label/Stop-trial, Blue".to_owned()),
        ]
    );
    let issues = assembly.issues.as_slice();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].code(), IssueCode::SidecarKeyMissing);
    assert_eq!(issues[0].locator().row, Some(1));
    assert_eq!(issues[0].locator().column.as_deref(), Some("trial_type"));
    assert_eq!(issues[1].code(), IssueCode::HedSyntax);
    assert_eq!(issues[1].locator().row, Some(2));
}

#[rstest]
fn replaces_definitions_in_place(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let table = TabularInput::from_rows(&["trial_type", "count"], [["go", "3"]])
        .expect("table")
        .with_sidecar(Arc::clone(&sidecar));

    let plain = get_hed_string_objs(&table, &schemas, NO_CATEGORIES, false, false).expect("rows");
    assert_eq!(
        strings(&plain),
        vec![Some("Label/Go-trial, Def/Cue, Def/Acc/3".to_owned())]
    );

    let replaced = get_hed_string_objs(&table, &schemas, NO_CATEGORIES, false, true).expect("rows");
    assert_eq!(
        strings(&replaced),
        vec![Some("Label/Go-trial, (Green), (Item-count/3)".to_owned())]
    );

    let (definitions, issues) = sidecar.definitions();
    assert!(issues.is_empty(), "{}", issues.render());
    let mut later = plain[0].clone().expect("row");
    replace_defs(&mut later, &definitions, &schemas, 8).expect("replace");
    assert_eq!(Some(later.to_string()), strings(&replaced)[0]);
}

#[rstest]
fn undefined_definitions_fail_only_when_replacing(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let table = TabularInput::from_rows(&["trial_type"], [["odd"], ["stop"]])
        .expect("table")
        .with_sidecar(sidecar);

    let kept = Assembler::new(&schemas, options()).expect("assembler").assemble(&table);
    assert_eq!(kept.strings()[0].as_deref(), Some("Label/Odd-trial, Def/Nope"));
    assert!(kept.issues.is_empty());

    let replacing = AssemblyOptions {
        replace_defs: true,
        ..options()
    };
    let replaced = Assembler::new(&schemas, replacing).expect("assembler").assemble(&table);
    assert_eq!(
        replaced.strings(),
        vec![None, Some("Label/Stop-trial".to_owned())]
    );
    let codes = replaced.issues.iter().map(|issue| issue.code()).collect::<Vec<_>>();
    assert_eq!(codes, vec![IssueCode::DefUnmatched]);
}

#[rstest]
fn removes_categories_by_ancestry(schemas: SchemaGroup) {
    let categories = CategorySet::new(&schemas, &["Condition-variable", "Task"]).expect("set");
    let mut hed = parse("Label/Go-trial, (Condition-variable/Fast, Red), Task/Stroop, (Task/X)")
        .expect("parse");
    resolve(&mut hed, &schemas);

    assert_eq!(remove_categories(&mut hed, &categories), 3);
    assert_eq!(hed.to_string(), "Label/Go-trial, (Red)");

    let once = hed.clone();
    assert_eq!(remove_categories(&mut hed, &categories), 0);
    assert_eq!(hed, once);
}

#[rstest]
fn ancestor_categories_remove_whole_subtrees(schemas: SchemaGroup) {
    let categories = CategorySet::new(&schemas, &["Organizational-property"]).expect("set");
    let mut hed = parse("Red, Task/Stroop, (Def/Cue, Onset)").expect("parse");
    resolve(&mut hed, &schemas);
    remove_categories(&mut hed, &categories);
    assert_eq!(hed.to_string(), "Red, (Onset)");
}

#[rstest]
fn unknown_categories_are_rejected(schemas: SchemaGroup) {
    let options = AssemblyOptions {
        remove_categories: vec!["Not-a-category".to_owned()],
        ..options()
    };
    assert!(matches!(
        Assembler::new(&schemas, options),
        Err(CategoryError::UnknownCategory { name, .. }) if name == "Not-a-category"
    ));
}

#[rstest]
fn context_then_definitions(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let table = TabularInput::from_rows(
        &["HED"],
        [["(Def/Cue, Onset, (Blue))"], ["Red"], ["n/a"], ["(Def/Cue, Offset)"], ["Red"]],
    )
    .expect("table")
    .with_sidecar(sidecar);

    let with_context = AssemblyOptions {
        include_context: true,
        ..options()
    };
    let assembly = Assembler::new(&schemas, with_context.clone())
        .expect("assembler")
        .assemble(&table);
    let rows = assembly.strings();
    assert_eq!(rows[1].as_deref(), Some("Red, (Event-context, Def/Cue, (Blue))"));
    assert_eq!(rows[2], None);
    assert_eq!(rows[4].as_deref(), Some("Red"));

    let expanded = AssemblyOptions {
        replace_defs: true,
        ..with_context
    };
    let assembly = Assembler::new(&schemas, expanded).expect("assembler").assemble(&table);
    assert_eq!(
        assembly.strings()[1].as_deref(),
        Some("Red, (Event-context, (Green), (Blue))")
    );
}

#[rstest]
fn parallel_and_sequential_assembly_agree(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let levels = ["go", "stop", "n/a", "pause"];
    let table = TabularInput::from_rows(
        &["trial_type", "count"],
        (0..40).map(|i| [levels[i % levels.len()].to_owned(), (i % 5).to_string()]),
    )
    .expect("table")
    .with_sidecar(sidecar);

    let run = |threshold| {
        let options = AssemblyOptions {
            replace_defs: true,
            parallel_row_threshold: threshold,
            ..options()
        };
        Assembler::new(&schemas, options).expect("assembler").assemble(&table)
    };
    let sequential = run(usize::MAX);
    let parallel = run(1);
    assert_eq!(sequential.rows.len(), 40);
    assert_eq!(sequential, parallel);
}

#[rstest]
fn validates_tables_row_by_row(schemas: SchemaGroup, sidecar: Arc<Sidecar>) {
    let table = TabularInput::from_rows(
        &["trial_type", "HED"],
        [["stop", "Blech"], ["pause", "n/a"], ["stop", "(Def/Cue, Offset)"]],
    )
    .expect("table")
    .with_sidecar(sidecar);

    let issues = Assembler::new(&schemas, options())
        .expect("assembler")
        .validate(&table, &ValidationOptions::default());
    let found = issues
        .iter()
        .map(|issue| (issue.code(), issue.locator().row))
        .collect::<Vec<_>>();
    assert_eq!(
        found,
        vec![
            (IssueCode::DefUnmatched, None),
            (IssueCode::TagInvalid, Some(0)),
            (IssueCode::SidecarKeyMissing, Some(1)),
            (IssueCode::TemporalTagError, Some(2)),
        ]
    );
}

#[rstest]
fn table_issues_are_ordered_by_row(schemas: SchemaGroup) {
    let table = TabularInput::from_rows(&["HED"], [["(Def/Cue, Offset)"], ["Blech"]])
        .expect("table");

    let issues = Assembler::new(&schemas, options())
        .expect("assembler")
        .validate(&table, &ValidationOptions::default());
    let rows = issues.iter().map(|issue| issue.locator().row).collect::<Vec<_>>();
    assert!(issues.iter().any(|issue| issue.code() == IssueCode::TemporalTagError));
    assert_eq!(rows.first(), Some(&Some(0)));
    assert!(rows.windows(2).all(|pair| pair[0] <= pair[1]), "{rows:?}");
}

#[test]
fn cells_treat_na_and_blank_as_missing() {
    assert_eq!(Cell::from_raw(" n/a "), Cell::Missing);
    assert_eq!(Cell::from_raw("N/A"), Cell::Missing);
    assert_eq!(Cell::from_raw("   "), Cell::Missing);
    assert_eq!(Cell::from_raw(" go "), Cell::Value("go".to_owned()));
}

#[test]
fn tables_check_their_shape() {
    assert_eq!(
        TabularInput::new(&["a", "b", "a"]).map(|_| ()),
        Err(TabularError::DuplicateColumn {
            name: "a".to_owned()
        })
    );

    let mut table = TabularInput::new(&["onset", "trial_type"]).expect("table");
    table.push_row(["1.5", "go"]).expect("row");
    assert_eq!(
        table.push_row(["2.0"]),
        Err(TabularError::RowWidth {
            row: 1,
            expected: 2,
            found: 1
        })
    );
    table.push_row(["n/a", "stop"]).expect("row");

    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(0, "trial_type"), Some(&Cell::Value("go".to_owned())));
    assert_eq!(table.cell(0, "missing"), None);
    assert_eq!(table.onset(0), Some(1.5));
    assert_eq!(table.onset(1), None);
}

#[test]
fn assembly_errors_map_to_issue_codes() {
    let err = AssemblyError::from(crate::sidecar::DefinitionError::ExpansionTooDeep {
        name: "Loop".to_owned(),
        max_depth: 8,
    });
    assert_eq!(err.code(), IssueCode::DefinitionInvalid);
}
