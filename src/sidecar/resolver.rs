// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt;

use super::{ColumnEntry, Sidecar};
use crate::hed::{parse, resolve, validate, ValidationOptions};
use crate::issues::{Issue, IssueCode, IssueList, Locator};
use crate::schema::SchemaGroup;

/// A categorical cell value with no entry in its column's level map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedValue {
    pub column: String,
    pub value: String,
}

impl fmt::Display for UnmappedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value '{}' of column '{}' has no HED mapping in the sidecar",
            self.value, self.column
        )
    }
}

impl std::error::Error for UnmappedValue {}

/// `"n/a"` and blank cells contribute nothing.
pub(crate) fn is_missing(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("n/a")
}

/// Turns one raw cell into its HED fragment. Missing cells and levels mapped to an empty
/// fragment yield `None`.
pub fn resolve_cell(
    column: &str,
    entry: &ColumnEntry,
    raw: &str,
) -> Result<Option<String>, UnmappedValue> {
    if is_missing(raw) {
        return Ok(None);
    }
    let raw = raw.trim();
    let fragment = match entry {
        ColumnEntry::Value { template } => template.replace('#', raw),
        ColumnEntry::Categorical { .. } => entry
            .level(raw)
            .ok_or_else(|| UnmappedValue {
                column: column.to_owned(),
                value: raw.to_owned(),
            })?
            .to_owned(),
    };
    Ok((!fragment.trim().is_empty()).then_some(fragment))
}

pub fn validate_sidecar(
    sidecar: &Sidecar,
    schemas: &SchemaGroup,
    check_warnings: bool,
) -> IssueList {
    validate_sidecar_with(
        sidecar,
        schemas,
        &ValidationOptions::default().with_warnings(check_warnings),
    )
}

/// Validates every fragment of every column, plus the sidecar-wide rules: value templates
/// hold exactly one `#`, categorical levels are unique ignoring case, definition names are
/// unique and acyclic.
pub fn validate_sidecar_with(
    sidecar: &Sidecar,
    schemas: &SchemaGroup,
    options: &ValidationOptions<'_>,
) -> IssueList {
    let (definitions, mut issues) = sidecar.collect_definitions(false);
    issues.extend(definitions.check_cycles());

    for (column, entry) in sidecar.columns() {
        let locator = Locator::column(column);

        if let ColumnEntry::Categorical { levels } = entry {
            let mut seen = HashMap::new();
            for (level, _) in levels {
                if let Some(first) = seen.insert(level.to_ascii_lowercase(), level.as_str()) {
                    issues.push(
                        Issue::new(
                            IssueCode::SidecarKeyDuplicate,
                            format!("levels '{first}' and '{level}' differ only in case"),
                        )
                        .at(locator.clone()),
                    );
                }
            }
        }

        let is_value = matches!(entry, ColumnEntry::Value { .. });
        for (level, fragment) in entry.fragments() {
            if is_value {
                let count = fragment.matches('#').count();
                if count != 1 {
                    issues.push(
                        Issue::new(
                            IssueCode::PlaceholderInvalid,
                            format!(
                                "value template '{fragment}' must contain exactly one '#', \
                                 found {count}"
                            ),
                        )
                        .at(locator.clone()),
                    );
                }
            }

            let mut hed = match parse(fragment) {
                Ok(hed) => hed,
                Err(err) => {
                    let message = match level {
                        Some(level) => format!("level '{level}': {err}"),
                        None => err.to_string(),
                    };
                    issues.push(Issue::new(IssueCode::HedSyntax, message).at(locator.clone()));
                    continue;
                }
            };
            resolve(&mut hed, schemas);

            let fragment_options = ValidationOptions {
                allow_placeholders: is_value,
                allow_definitions: true,
                definitions: Some(&definitions),
                check_warnings: true,
                ..*options
            };
            issues.extend(validate(&hed, schemas, &fragment_options).with_column(column));
        }
    }

    tracing::debug!(
        columns = sidecar.len(),
        definitions = definitions.len(),
        issues = issues.len(),
        "validated sidecar"
    );
    issues.filtered(options.check_warnings)
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{resolve_cell, validate_sidecar, UnmappedValue};
    use crate::issues::IssueCode;
    use crate::schema::SchemaGroup;
    use crate::sidecar::{ColumnEntry, Sidecar};

    #[fixture]
    fn schemas() -> SchemaGroup {
        SchemaGroup::load(&["8.2.0"]).expect("schema")
    }

    fn codes(sidecar: &Sidecar, schemas: &SchemaGroup, check_warnings: bool) -> Vec<IssueCode> {
        validate_sidecar(sidecar, schemas, check_warnings)
            .iter()
            .map(|issue| issue.code())
            .collect()
    }

    #[rstest]
    fn valid_sidecar_has_no_issues(schemas: SchemaGroup) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical(
            "trial_type",
            [
                ("go", "Label/Go-trial, Def/Cue"),
                ("stop", "Label/Stop-trial, (Definition/Cue, (Blue))"),
            ],
        );
        sidecar.insert_value("rt", "Time-value/# s");
        assert!(codes(&sidecar, &schemas, true).is_empty());
    }

    #[rstest]
    fn reports_case_duplicate_levels(schemas: SchemaGroup) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical("c", [("Go", "Red"), ("go", "Blue")]);
        assert_eq!(codes(&sidecar, &schemas, false), vec![IssueCode::SidecarKeyDuplicate]);
    }

    #[rstest]
    #[case("Time-value/2 s", IssueCode::PlaceholderInvalid)]
    #[case("Label/#, Description/#", IssueCode::PlaceholderInvalid)]
    #[case("Label/#, (Red", IssueCode::HedSyntax)]
    #[case("Blech/#", IssueCode::TagInvalid)]
    fn reports_bad_value_templates(
        schemas: SchemaGroup,
        #[case] template: &str,
        #[case] expected: IssueCode,
    ) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_value("v", template);
        let found = codes(&sidecar, &schemas, false);
        assert!(found.contains(&expected), "{template}: {found:?}");
    }

    #[rstest]
    fn placeholders_are_rejected_in_categorical_levels(schemas: SchemaGroup) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical("c", [("a", "Label/#")]);
        assert_eq!(codes(&sidecar, &schemas, false), vec![IssueCode::PlaceholderInvalid]);
    }

    #[rstest]
    fn reports_definition_problems(schemas: SchemaGroup) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical(
            "c",
            [
                ("a", "(Definition/Cue, (Red))"),
                ("b", "(Definition/cue, (Blue))"),
                ("c", "(Definition/Acc/#, (Item-count/#, Label/#))"),
                ("d", "Def/Missing"),
            ],
        );
        let found = codes(&sidecar, &schemas, false);
        assert_eq!(
            found,
            vec![
                IssueCode::DefinitionDuplicate,
                IssueCode::DefinitionInvalid,
                IssueCode::DefUnmatched,
            ]
        );
    }

    #[rstest]
    fn warnings_are_opt_in(schemas: SchemaGroup) {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical("c", [("a", "Blue/Apple")]);
        assert!(codes(&sidecar, &schemas, false).is_empty());
        assert_eq!(codes(&sidecar, &schemas, true), vec![IssueCode::TagExtended]);
    }

    #[test]
    fn resolves_cells() {
        let value = ColumnEntry::Value {
            template: "Time-value/# s".to_owned(),
        };
        assert_eq!(
            resolve_cell("rt", &value, " 0.45 "),
            Ok(Some("Time-value/0.45 s".to_owned()))
        );
        assert_eq!(resolve_cell("rt", &value, "n/a"), Ok(None));
        assert_eq!(resolve_cell("rt", &value, ""), Ok(None));

        let categorical = ColumnEntry::Categorical {
            levels: vec![
                ("go".to_owned(), "Label/Go-trial".to_owned()),
                ("skip".to_owned(), String::new()),
            ],
        };
        assert_eq!(
            resolve_cell("trial_type", &categorical, "GO"),
            Ok(Some("Label/Go-trial".to_owned()))
        );
        assert_eq!(resolve_cell("trial_type", &categorical, "skip"), Ok(None));
        assert_eq!(
            resolve_cell("trial_type", &categorical, "pause"),
            Err(UnmappedValue {
                column: "trial_type".to_owned(),
                value: "pause".to_owned(),
            })
        );
    }
}
