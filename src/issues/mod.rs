// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structured validation issues and their text rendering.
//!
//! Semantic problems (unknown tags, bad values, missing definitions, unmapped sidecar values)
//! are accumulated into an [`IssueList`] instead of being raised one by one, so a single pass
//! reports everything it finds. Structural failures never end up here; they are typed errors.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    HedSyntax,
    TagInvalid,
    TagAmbiguous,
    TagPrefixInvalid,
    TagExtensionInvalid,
    TagExtensionNotAllowed,
    TagExtended,
    TagRequiresChild,
    TagRepeated,
    TagNotUnique,
    TagGroupError,
    StyleWarning,
    ValueInvalid,
    UnitsInvalid,
    UnitsMissing,
    PlaceholderInvalid,
    DefinitionInvalid,
    DefinitionDuplicate,
    DefUnmatched,
    DefValueMismatch,
    TemporalTagError,
    SidecarInvalid,
    SidecarKeyDuplicate,
    SidecarKeyMissing,
    QueryInvalid,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HedSyntax => "HED_SYNTAX",
            Self::TagInvalid => "TAG_INVALID",
            Self::TagAmbiguous => "TAG_AMBIGUOUS",
            Self::TagPrefixInvalid => "TAG_PREFIX_INVALID",
            Self::TagExtensionInvalid => "TAG_EXTENSION_INVALID",
            Self::TagExtensionNotAllowed => "TAG_EXTENSION_NOT_ALLOWED",
            Self::TagExtended => "TAG_EXTENDED",
            Self::TagRequiresChild => "TAG_REQUIRES_CHILD",
            Self::TagRepeated => "TAG_REPEATED",
            Self::TagNotUnique => "TAG_NOT_UNIQUE",
            Self::TagGroupError => "TAG_GROUP_ERROR",
            Self::StyleWarning => "STYLE_WARNING",
            Self::ValueInvalid => "VALUE_INVALID",
            Self::UnitsInvalid => "UNITS_INVALID",
            Self::UnitsMissing => "UNITS_MISSING",
            Self::PlaceholderInvalid => "PLACEHOLDER_INVALID",
            Self::DefinitionInvalid => "DEFINITION_INVALID",
            Self::DefinitionDuplicate => "DEFINITION_DUPLICATE",
            Self::DefUnmatched => "DEF_UNMATCHED",
            Self::DefValueMismatch => "DEF_VALUE_MISMATCH",
            Self::TemporalTagError => "TEMPORAL_TAG_ERROR",
            Self::SidecarInvalid => "SIDECAR_INVALID",
            Self::SidecarKeyDuplicate => "SIDECAR_KEY_DUPLICATE",
            Self::SidecarKeyMissing => "SIDECAR_KEY_MISSING",
            Self::QueryInvalid => "QUERY_INVALID",
        }
    }

    /// Severity an issue with this code carries unless the producer overrides it.
    pub fn default_severity(self) -> Severity {
        match self {
            Self::TagExtended | Self::StyleWarning | Self::UnitsMissing => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an issue was found. Every part is optional; raw-string validation has no locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Locator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<usize>,
}

impl Locator {
    pub fn row(row: usize) -> Self {
        Self {
            row: Some(row),
            ..Self::default()
        }
    }

    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::default()
        }
    }

    pub fn query(index: usize) -> Self {
        Self {
            query: Some(index),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_none() && self.column.is_none() && self.query.is_none()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(row) = self.row {
            parts.push(format!("row {row}"));
        }
        if let Some(column) = &self.column {
            parts.push(format!("column '{column}'"));
        }
        if let Some(query) = self.query {
            parts.push(format!("query {query}"));
        }
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    severity: Severity,
    code: IssueCode,
    message: String,
    #[serde(skip_serializing_if = "Locator::is_empty")]
    locator: Locator,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            locator: Locator::default(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn at(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> IssueCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if !self.locator.is_empty() {
            write!(f, " {}", self.locator)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered sequence of issues; an empty list means "valid".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssueList {
    issues: Vec<Issue>,
}

impl IssueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: IssueList) {
        self.issues.extend(other.issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| !issue.is_error())
    }

    /// True iff any issue has error severity; warnings alone never count.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }

    /// Drops warnings unless the caller opted into them.
    pub fn filtered(self, check_warnings: bool) -> Self {
        if check_warnings {
            return self;
        }
        Self {
            issues: self.issues.into_iter().filter(Issue::is_error).collect(),
        }
    }

    /// Stamps a row index on every issue that does not carry one yet.
    pub fn with_row(mut self, row: usize) -> Self {
        for issue in &mut self.issues {
            issue.locator.row.get_or_insert(row);
        }
        self
    }

    /// Stable sort by row: table-wide issues first, then rows in order. Issues of one row
    /// keep their relative order.
    pub fn sort_by_row(&mut self) {
        self.issues.sort_by_key(|issue| issue.locator.row);
    }

    pub fn with_column(mut self, column: &str) -> Self {
        for issue in &mut self.issues {
            if issue.locator.column.is_none() {
                issue.locator.column = Some(column.to_owned());
            }
        }
        self
    }

    /// One issue per line, in insertion order. Empty string for an empty list.
    pub fn render(&self) -> String {
        render(self)
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

impl From<Vec<Issue>> for IssueList {
    fn from(issues: Vec<Issue>) -> Self {
        Self { issues }
    }
}

impl FromIterator<Issue> for IssueList {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self {
            issues: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for IssueList {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a> IntoIterator for &'a IssueList {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

pub fn render(issues: &IssueList) -> String {
    let mut out = String::new();
    for issue in issues {
        out.push_str(&issue.to_string());
        out.push('\n');
    }
    out
}

pub fn has_errors(issues: &IssueList) -> bool {
    issues.has_errors()
}

#[cfg(test)]
mod tests {
    use super::{Issue, IssueCode, IssueList, Locator, Severity};

    fn sample() -> IssueList {
        let mut issues = IssueList::new();
        issues.push(Issue::new(IssueCode::TagExtended, "'Blue/Apple' extends 'Blue'"));
        issues.push(
            Issue::new(IssueCode::TagInvalid, "'Blech' is not a valid tag").at(Locator {
                row: Some(3),
                column: Some("HED".to_owned()),
                query: None,
            }),
        );
        issues
    }

    #[test]
    fn renders_one_line_per_issue_in_order() {
        let text = sample().render();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "WARNING [TAG_EXTENDED]: 'Blue/Apple' extends 'Blue'",
                "ERROR [TAG_INVALID] row 3, column 'HED': 'Blech' is not a valid tag",
            ]
        );
    }

    #[test]
    fn empty_list_renders_empty_text() {
        assert_eq!(IssueList::new().render(), "");
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let mut issues = IssueList::new();
        issues.push(Issue::new(IssueCode::StyleWarning, "capitalization"));
        assert!(!issues.has_errors());
        assert_eq!(issues.warnings().count(), 1);

        issues.push(Issue::new(IssueCode::UnitsMissing, "no units").with_severity(Severity::Error));
        assert!(issues.has_errors());
    }

    #[test]
    fn filtered_drops_warnings_unless_requested() {
        assert_eq!(sample().filtered(true).len(), 2);
        let errors_only = sample().filtered(false);
        assert_eq!(errors_only.len(), 1);
        assert_eq!(errors_only.as_slice()[0].code(), IssueCode::TagInvalid);
    }

    #[test]
    fn with_row_keeps_existing_rows() {
        let issues = sample().with_row(7);
        assert_eq!(issues.as_slice()[0].locator().row, Some(7));
        assert_eq!(issues.as_slice()[1].locator().row, Some(3));
    }

    #[test]
    fn sort_by_row_is_stable_and_puts_table_issues_first() {
        let mut issues = IssueList::new();
        issues.push(Issue::new(IssueCode::TemporalTagError, "late").at(Locator::row(0)));
        issues.push(Issue::new(IssueCode::TagInvalid, "second").at(Locator::row(2)));
        issues.push(Issue::new(IssueCode::TagRepeated, "first").at(Locator::row(0)));
        issues.push(Issue::new(IssueCode::DefUnmatched, "table"));
        issues.sort_by_row();

        let order = issues.iter().map(Issue::message).collect::<Vec<_>>();
        assert_eq!(order, vec!["table", "late", "first", "second"]);
    }
}
