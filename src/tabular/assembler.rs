// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use rayon::prelude::*;

use super::context::{expand_context, unmatched_anchors};
use super::{Cell, TabularInput, HED_COLUMN};
use crate::hed::{
    parse, resolve, validate, HedNode, HedString, HedTag, ParseError, ValidationOptions,
};
use crate::issues::{Issue, IssueCode, IssueList, Locator};
use crate::schema::{LookupError, SchemaGroup};
use crate::sidecar::{
    replace_defs, resolve_cell, strip_definitions, validate_sidecar_with, DefinitionDict,
    DefinitionError, UnmappedValue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Schema tags removed from every row together with all of their descendants.
    pub remove_categories: Vec<String>,
    pub include_context: bool,
    pub replace_defs: bool,
    pub max_definition_depth: usize,
    /// Tables with at least this many rows are processed on the rayon pool.
    pub parallel_row_threshold: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            remove_categories: Vec::new(),
            include_context: false,
            replace_defs: false,
            max_definition_depth: 8,
            parallel_row_threshold: 256,
        }
    }
}

/// Why one row produced no annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    UnmappedValue(UnmappedValue),
    Parse(ParseError),
    Definition(DefinitionError),
}

impl AssemblyError {
    pub fn code(&self) -> IssueCode {
        match self {
            Self::UnmappedValue(_) => IssueCode::SidecarKeyMissing,
            Self::Parse(_) => IssueCode::HedSyntax,
            Self::Definition(DefinitionError::UndefinedDefinition { .. }) => {
                IssueCode::DefUnmatched
            }
            Self::Definition(DefinitionError::DefinitionValueMismatch { .. }) => {
                IssueCode::DefValueMismatch
            }
            Self::Definition(DefinitionError::ExpansionTooDeep { .. }) => {
                IssueCode::DefinitionInvalid
            }
        }
    }

    fn issue(&self, row: usize) -> Issue {
        let column = match self {
            Self::UnmappedValue(err) => Some(err.column.clone()),
            _ => None,
        };
        Issue::new(self.code(), self.to_string()).at(Locator {
            row: Some(row),
            column,
            query: None,
        })
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedValue(err) => fmt::Display::fmt(err, f),
            Self::Parse(err) => write!(f, "assembled annotation does not parse: {err}"),
            Self::Definition(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnmappedValue(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Definition(err) => Some(err),
        }
    }
}

impl From<UnmappedValue> for AssemblyError {
    fn from(err: UnmappedValue) -> Self {
        Self::UnmappedValue(err)
    }
}

impl From<ParseError> for AssemblyError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<DefinitionError> for AssemblyError {
    fn from(err: DefinitionError) -> Self {
        Self::Definition(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    UnknownCategory { name: String, source: LookupError },
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCategory { name, source } => {
                write!(f, "unknown tag category '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for CategoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownCategory { source, .. } => Some(source),
        }
    }
}

/// Schema subtrees to strip, matched by ancestry rather than by tag text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<(usize, String)>,
}

impl CategorySet {
    pub fn new<S: AsRef<str>>(schemas: &SchemaGroup, names: &[S]) -> Result<Self, CategoryError> {
        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            let (member, tag) = schemas.resolve(name).map_err(|source| {
                CategoryError::UnknownCategory {
                    name: name.to_owned(),
                    source,
                }
            })?;
            categories.push((member, schemas.tag(member, tag).long_form().to_owned()));
        }
        Ok(Self { categories })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// True when `tag` resolved to a category or to one of its descendants.
    pub fn contains(&self, tag: &HedTag) -> bool {
        let Some(resolved) = tag.resolved() else {
            return false;
        };
        let long_form = resolved.base_long_form();
        self.categories.iter().any(|(member, category)| {
            *member == resolved.member()
                && long_form
                    .strip_prefix(category.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Removes every tag under one of `categories`; groups left empty go too. Returns the number
/// of tags removed.
pub fn remove_categories(hed: &mut HedString, categories: &CategorySet) -> usize {
    if categories.is_empty() {
        return 0;
    }
    let removed = prune(hed.children_mut(), categories);
    if removed > 0 {
        hed.refresh_source();
    }
    removed
}

fn prune(nodes: &mut Vec<HedNode>, categories: &CategorySet) -> usize {
    let mut removed = 0;
    nodes.retain_mut(|node| match node {
        HedNode::Group(group) => {
            removed += prune(group.children_mut(), categories);
            !group.is_empty()
        }
        _ => {
            let hit = node.as_tag().is_some_and(|tag| categories.contains(tag));
            removed += usize::from(hit);
            !hit
        }
    });
    removed
}

/// Joins the row's fragments in column order, parses the result, strips definition groups and
/// resolves every tag. A row without contributions yields an empty string.
pub fn assemble_row(
    table: &TabularInput,
    row: usize,
    schemas: &SchemaGroup,
) -> Result<HedString, AssemblyError> {
    let text = row_text(table, row)?;
    if text.is_empty() {
        return Ok(HedString::default());
    }
    let mut hed = parse(&text)?;
    strip_definitions(&mut hed);
    resolve(&mut hed, schemas);
    Ok(hed)
}

fn row_text(table: &TabularInput, row: usize) -> Result<String, UnmappedValue> {
    let Some(cells) = table.row(row) else {
        return Ok(String::new());
    };
    let sidecar = table.sidecar();
    let mut fragments = Vec::new();
    for (column, cell) in table.columns().iter().zip(cells) {
        let Cell::Value(raw) = cell else {
            continue;
        };
        let fragment = if column == HED_COLUMN {
            Some(raw.clone())
        } else {
            match sidecar.and_then(|sidecar| sidecar.column(column)) {
                Some(entry) => resolve_cell(column, entry, raw)?,
                None => None,
            }
        };
        fragments.extend(fragment);
    }
    Ok(fragments.join(", "))
}

/// Per-table output: one slot per input row plus the row-level problems met on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub rows: Vec<Option<HedString>>,
    pub issues: IssueList,
}

impl Assembly {
    /// Canonical text of every row; `None` where the row contributed nothing.
    pub fn strings(&self) -> Vec<Option<String>> {
        self.rows
            .iter()
            .map(|row| row.as_ref().map(ToString::to_string))
            .collect()
    }
}

/// Turns event tables into per-row annotations.
#[derive(Debug, Clone)]
pub struct Assembler<'a> {
    schemas: &'a SchemaGroup,
    categories: CategorySet,
    options: AssemblyOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(schemas: &'a SchemaGroup, options: AssemblyOptions) -> Result<Self, CategoryError> {
        let categories = CategorySet::new(schemas, &options.remove_categories)?;
        Ok(Self {
            schemas,
            categories,
            options,
        })
    }

    /// Uses an already built category set; `options.remove_categories` is ignored.
    pub fn with_categories(
        schemas: &'a SchemaGroup,
        categories: CategorySet,
        options: AssemblyOptions,
    ) -> Self {
        Self {
            schemas,
            categories,
            options,
        }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Assembles every row. The output has exactly one slot per row; rows that contribute
    /// nothing or fail are `None`, and failures are recorded as issues.
    pub fn assemble(&self, table: &TabularInput) -> Assembly {
        let (definitions, mut issues) = match table.sidecar() {
            Some(sidecar) => sidecar.definitions(),
            None => (DefinitionDict::new(), IssueList::new()),
        };

        let assembled = self.map_rows(table.len(), |row| self.row(table, row));
        let mut rows = Vec::with_capacity(assembled.len());
        for (row, result) in assembled.into_iter().enumerate() {
            match result {
                Ok(hed) => rows.push((!hed.is_empty()).then_some(hed)),
                Err(err) => {
                    report_row(row, &err, &mut issues);
                    rows.push(None);
                }
            }
        }

        if self.options.include_context {
            let augmented = expand_context(&mut rows, table, self.schemas);
            tracing::debug!(rows = augmented, "added event context");
        }

        if self.options.replace_defs {
            let depth = self.options.max_definition_depth;
            let replaced = self.map_rows(rows.len(), |row| -> Result<_, AssemblyError> {
                let Some(hed) = &rows[row] else {
                    return Ok(None);
                };
                let mut hed = hed.clone();
                replace_defs(&mut hed, &definitions, self.schemas, depth)?;
                // Definition contents may hold removed categories.
                remove_categories(&mut hed, &self.categories);
                Ok((!hed.is_empty()).then_some(hed))
            });
            for (row, result) in replaced.into_iter().enumerate() {
                match result {
                    Ok(hed) => rows[row] = hed,
                    Err(err) => {
                        report_row(row, &err, &mut issues);
                        rows[row] = None;
                    }
                }
            }
        }

        tracing::debug!(
            rows = rows.len(),
            empty = rows.iter().filter(|row| row.is_none()).count(),
            issues = issues.len(),
            "assembled table"
        );
        Assembly { rows, issues }
    }

    /// Validates the table's sidecar (when present) and every assembled row, and checks that
    /// each Offset or Inset follows an Onset with the same anchor.
    pub fn validate(&self, table: &TabularInput, options: &ValidationOptions<'_>) -> IssueList {
        let mut issues = IssueList::new();
        let definitions = match table.sidecar() {
            Some(sidecar) => {
                issues.extend(validate_sidecar_with(sidecar, self.schemas, options));
                sidecar.definitions().0
            }
            None => DefinitionDict::new(),
        };
        let row_options = ValidationOptions {
            allow_placeholders: false,
            allow_definitions: false,
            definitions: Some(&definitions),
            ..*options
        };

        let checked = self.map_rows(table.len(), |row| {
            assemble_row(table, row, self.schemas).map(|hed| {
                let found = validate(&hed, self.schemas, &row_options).with_row(row);
                (hed, found)
            })
        });
        let mut rows = Vec::with_capacity(checked.len());
        for (row, result) in checked.into_iter().enumerate() {
            match result {
                Ok((hed, found)) => {
                    issues.extend(found);
                    rows.push(Some(hed));
                }
                Err(err) => {
                    issues.push(err.issue(row));
                    rows.push(None);
                }
            }
        }

        for (row, anchor) in unmatched_anchors(&rows) {
            issues.push(
                Issue::new(
                    IssueCode::TemporalTagError,
                    format!("Offset or Inset for '{anchor}' has no preceding Onset"),
                )
                .at(Locator::row(row)),
            );
        }

        issues.sort_by_row();
        tracing::debug!(rows = table.len(), issues = issues.len(), "validated table");
        issues.filtered(options.check_warnings)
    }

    fn row(&self, table: &TabularInput, row: usize) -> Result<HedString, AssemblyError> {
        let mut hed = assemble_row(table, row, self.schemas)?;
        remove_categories(&mut hed, &self.categories);
        Ok(hed)
    }

    fn map_rows<T, F>(&self, rows: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if rows >= self.options.parallel_row_threshold {
            (0..rows).into_par_iter().map(f).collect()
        } else {
            (0..rows).map(f).collect()
        }
    }
}

fn report_row(row: usize, err: &AssemblyError, issues: &mut IssueList) {
    tracing::warn!(row, error = %err, "row produced no annotation");
    issues.push(err.issue(row));
}

/// Assembles `table` with default options apart from the three switches; the output holds one
/// slot per row.
pub fn get_hed_string_objs<S: AsRef<str>>(
    table: &TabularInput,
    schemas: &SchemaGroup,
    remove_categories: &[S],
    include_context: bool,
    replace_defs: bool,
) -> Result<Vec<Option<HedString>>, CategoryError> {
    let options = AssemblyOptions {
        remove_categories: remove_categories
            .iter()
            .map(|name| name.as_ref().to_owned())
            .collect(),
        include_context,
        replace_defs,
        ..AssemblyOptions::default()
    };
    Ok(Assembler::new(schemas, options)?.assemble(table).rows)
}
