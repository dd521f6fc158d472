// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Column metadata mapping raw table values to HED fragments.
//!
//! A [`Sidecar`] follows the BIDS JSON shape:
//!
//! ```json
//! {
//!   "trial_type": { "HED": { "go": "Label/Go-trial", "stop": "Label/Stop-trial" } },
//!   "response_time": { "HED": "Time-value/# s" }
//! }
//! ```
//!
//! Definitions live inside the fragments as `(Definition/Name, (content))` groups.

mod definitions;
mod resolver;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::hed::parse;
use crate::issues::{Issue, IssueCode, IssueList, Locator};

pub use definitions::{
    definition_shape, replace_defs, strip_definitions, Definition, DefinitionDict,
    DefinitionError, DefinitionShape,
};
pub use resolver::{resolve_cell, validate_sidecar, validate_sidecar_with, UnmappedValue};

pub(crate) use resolver::is_missing;

/// How one table column contributes to the row annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEntry {
    /// Template with exactly one `#`, replaced by the raw cell value.
    Value { template: String },
    /// Raw cell value (level) to fragment, in insertion order.
    Categorical { levels: Vec<(String, String)> },
}

impl ColumnEntry {
    /// Categorical lookup: exact match first, then case-insensitive.
    pub fn level(&self, raw: &str) -> Option<&str> {
        let Self::Categorical { levels } = self else {
            return None;
        };
        levels
            .iter()
            .find(|(level, _)| level == raw)
            .or_else(|| levels.iter().find(|(level, _)| level.eq_ignore_ascii_case(raw)))
            .map(|(_, fragment)| fragment.as_str())
    }

    /// Every HED fragment held by the entry, paired with its level for categorical columns.
    pub fn fragments(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            Self::Value { template } => vec![(None, template.as_str())],
            Self::Categorical { levels } => levels
                .iter()
                .map(|(level, fragment)| (Some(level.as_str()), fragment.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug)]
pub enum SidecarError {
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for SidecarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "sidecar is not valid JSON: {err}"),
            Self::NotAnObject => f.write_str("sidecar JSON must be an object keyed by column"),
        }
    }
}

impl std::error::Error for SidecarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NotAnObject => None,
        }
    }
}

impl From<serde_json::Error> for SidecarError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    columns: BTreeMap<String, ColumnEntry>,
    definitions: DefinitionDict,
}

impl Sidecar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<(Self, IssueList), SidecarError> {
        let value = serde_json::from_str::<Value>(text)?;
        Self::from_json_value(&value)
    }

    /// Reads the `HED` key of every column object. Columns without one are skipped; a `HED`
    /// value that is neither a string nor an object of strings is reported and skipped.
    pub fn from_json_value(value: &Value) -> Result<(Self, IssueList), SidecarError> {
        let Value::Object(columns) = value else {
            return Err(SidecarError::NotAnObject);
        };

        let mut sidecar = Self::new();
        let mut issues = IssueList::new();
        for (column, body) in columns {
            let Some(hed) = body.get("HED") else {
                continue;
            };
            match hed {
                Value::String(template) => sidecar.insert_value(column, template.clone()),
                Value::Object(levels) => {
                    let mut parsed = Vec::with_capacity(levels.len());
                    for (level, fragment) in levels {
                        match fragment {
                            Value::String(fragment) => {
                                parsed.push((level.clone(), fragment.clone()))
                            }
                            other => issues.push(
                                Issue::new(
                                    IssueCode::SidecarInvalid,
                                    format!("level '{level}' maps to {other}, expected a string"),
                                )
                                .at(Locator::column(column.as_str())),
                            ),
                        }
                    }
                    sidecar.insert_categorical(column, parsed);
                }
                other => issues.push(
                    Issue::new(
                        IssueCode::SidecarInvalid,
                        format!("'HED' must be a string or an object of strings, found {other}"),
                    )
                    .at(Locator::column(column.as_str())),
                ),
            }
        }
        tracing::debug!(columns = sidecar.len(), issues = issues.len(), "read sidecar");
        Ok((sidecar, issues))
    }

    pub fn insert_value(&mut self, column: &str, template: impl Into<String>) {
        self.columns.insert(
            column.to_owned(),
            ColumnEntry::Value {
                template: template.into(),
            },
        );
    }

    pub fn insert_categorical<K, V>(
        &mut self,
        column: &str,
        levels: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let levels = levels
            .into_iter()
            .map(|(level, fragment)| (level.into(), fragment.into()))
            .collect();
        self.columns
            .insert(column.to_owned(), ColumnEntry::Categorical { levels });
    }

    /// Registers a definition that is not declared inside any column fragment.
    pub fn add_definition(&mut self, definition: Definition) -> bool {
        self.definitions.insert(definition)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnEntry> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnEntry)> {
        self.columns.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All definitions: programmatic ones first, then those declared in column fragments.
    pub fn definitions(&self) -> (DefinitionDict, IssueList) {
        let (dict, mut issues) = self.collect_definitions(true);
        issues.extend(dict.check_cycles());
        (dict, issues)
    }

    pub(crate) fn collect_definitions(
        &self,
        report_fragments: bool,
    ) -> (DefinitionDict, IssueList) {
        let mut dict = self.definitions.clone();
        let mut issues = IssueList::new();
        for (column, entry) in &self.columns {
            for (_, fragment) in entry.fragments() {
                match parse(fragment) {
                    Ok(hed) => {
                        let found = dict.collect(&hed, report_fragments);
                        issues.extend(found.with_column(column));
                    }
                    Err(err) if report_fragments => issues.push(
                        Issue::new(IssueCode::HedSyntax, err.to_string())
                            .at(Locator::column(column.as_str())),
                    ),
                    Err(_) => {}
                }
            }
        }
        (dict, issues)
    }
}
