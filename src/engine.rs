// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The in-process boundary a host talks to.
//!
//! A [`HedEngine`] owns one immutable [`SchemaGroup`] and an [`EngineConfig`]. Cloning it is
//! cheap and clones share the schema. Host-native values are normalized by the caller into
//! [`SchemaSpec`], [`QueryInput`], [`Sidecar`] and [`TabularInput`] before they get here.

use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigError, EngineConfig};
use crate::hed::{parse, resolve, validate_str, HedString, ParseError, ValidationOptions};
use crate::issues::IssueList;
use crate::query::{compile_many_named, evaluate_with, FactorMatrix, QueryHandler};
use crate::schema::{SchemaGroup, SchemaLoadError};
use crate::sidecar::{is_missing, validate_sidecar_with, Sidecar, SidecarError};
use crate::tabular::{
    Assembler, Assembly, AssemblyOptions, CategoryError, CategorySet, TabularInput,
};

/// Which schemas an engine is built on.
#[derive(Debug, Clone)]
pub enum SchemaSpec {
    Version(String),
    /// Ordered list; library members carry a prefix (`sc:score_1.1.0`).
    Versions(Vec<String>),
    Loaded(Arc<SchemaGroup>),
}

impl From<&str> for SchemaSpec {
    fn from(version: &str) -> Self {
        Self::Version(version.to_owned())
    }
}

impl From<Vec<String>> for SchemaSpec {
    fn from(versions: Vec<String>) -> Self {
        Self::Versions(versions)
    }
}

impl From<Arc<SchemaGroup>> for SchemaSpec {
    fn from(schemas: Arc<SchemaGroup>) -> Self {
        Self::Loaded(schemas)
    }
}

/// Queries handed to [`HedEngine::search`].
#[derive(Debug, Clone)]
pub enum QueryInput {
    Single(String),
    List(Vec<String>),
    /// Queries with an optional column name each; unnamed ones get `query_<index>`.
    Named(Vec<(Option<String>, String)>),
}

impl QueryInput {
    fn entries(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            Self::Single(query) => vec![(None, query.as_str())],
            Self::List(queries) => queries.iter().map(|query| (None, query.as_str())).collect(),
            Self::Named(queries) => queries
                .iter()
                .map(|(name, query)| (name.as_deref(), query.as_str()))
                .collect(),
        }
    }
}

impl From<&str> for QueryInput {
    fn from(query: &str) -> Self {
        Self::Single(query.to_owned())
    }
}

impl From<Vec<String>> for QueryInput {
    fn from(queries: Vec<String>) -> Self {
        Self::List(queries)
    }
}

/// Switches for [`HedEngine::annotate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Drop the configured categories.
    pub remove_categories: bool,
    pub include_context: bool,
    pub replace_defs: bool,
}

#[derive(Debug)]
pub enum EngineError {
    Schema(SchemaLoadError),
    Config(ConfigError),
    Parse(ParseError),
    /// An annotation handed to [`HedEngine::search`] does not parse.
    Annotation { row: usize, source: ParseError },
    Sidecar(SidecarError),
    Category(CategoryError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "schema load failed: {err}"),
            Self::Config(err) => fmt::Display::fmt(err, f),
            Self::Parse(err) => fmt::Display::fmt(err, f),
            Self::Annotation { row, source } => write!(f, "annotation of row {row}: {source}"),
            Self::Sidecar(err) => fmt::Display::fmt(err, f),
            Self::Category(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Parse(err) | Self::Annotation { source: err, .. } => Some(err),
            Self::Sidecar(err) => Some(err),
            Self::Category(err) => Some(err),
        }
    }
}

impl From<SchemaLoadError> for EngineError {
    fn from(err: SchemaLoadError) -> Self {
        Self::Schema(err)
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<SidecarError> for EngineError {
    fn from(err: SidecarError) -> Self {
        Self::Sidecar(err)
    }
}

impl From<CategoryError> for EngineError {
    fn from(err: CategoryError) -> Self {
        Self::Category(err)
    }
}

#[derive(Debug, Clone)]
pub struct HedEngine {
    schemas: Arc<SchemaGroup>,
    config: EngineConfig,
}

impl HedEngine {
    pub fn new(spec: impl Into<SchemaSpec>) -> Result<Self, EngineError> {
        Self::with_config(spec, EngineConfig::default())
    }

    /// Loads the schemas once. A failed load leaves no engine behind; build a new one to retry.
    pub fn with_config(
        spec: impl Into<SchemaSpec>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let schemas = match spec.into() {
            SchemaSpec::Version(version) => Arc::new(SchemaGroup::load(&[version])?),
            SchemaSpec::Versions(versions) => Arc::new(SchemaGroup::load(&versions)?),
            SchemaSpec::Loaded(schemas) => schemas,
        };
        tracing::debug!(schemas = %schemas.version_label(), "engine ready");
        Ok(Self { schemas, config })
    }

    pub fn schemas(&self) -> &SchemaGroup {
        &self.schemas
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn options(&self, check_warnings: bool) -> ValidationOptions<'static> {
        ValidationOptions {
            check_warnings,
            suggestion_cutoff: self.config.suggestion_cutoff,
            ..ValidationOptions::default()
        }
    }

    /// Rendered issues for one tag string; an empty string means valid.
    pub fn validate_string(&self, text: &str, check_warnings: bool) -> Result<String, ParseError> {
        Ok(self.check_string(text, check_warnings)?.render())
    }

    pub fn check_string(&self, text: &str, check_warnings: bool) -> Result<IssueList, ParseError> {
        validate_str(text, &self.schemas, &self.options(check_warnings))
    }

    /// Parses and resolves one annotation without validating it.
    pub fn parse_string(&self, text: &str) -> Result<HedString, ParseError> {
        let mut hed = parse(text)?;
        resolve(&mut hed, &self.schemas);
        Ok(hed)
    }

    pub fn validate_sidecar(&self, sidecar: &Sidecar, check_warnings: bool) -> String {
        self.check_sidecar(sidecar, check_warnings).render()
    }

    pub fn check_sidecar(&self, sidecar: &Sidecar, check_warnings: bool) -> IssueList {
        validate_sidecar_with(sidecar, &self.schemas, &self.options(check_warnings))
    }

    /// Reads a BIDS JSON sidecar and validates it. Shape problems found while reading come
    /// first in the rendered text.
    pub fn validate_sidecar_json(
        &self,
        text: &str,
        check_warnings: bool,
    ) -> Result<String, EngineError> {
        let (sidecar, mut issues) = Sidecar::from_json_str(text)?;
        issues.extend(self.check_sidecar(&sidecar, check_warnings));
        Ok(issues.filtered(check_warnings).render())
    }

    pub fn validate_tabular(&self, table: &TabularInput, check_warnings: bool) -> String {
        self.check_tabular(table, check_warnings).render()
    }

    /// Validates the table's sidecar, when it has one, and every assembled row.
    pub fn check_tabular(&self, table: &TabularInput, check_warnings: bool) -> IssueList {
        let options = self.assembly_options(AnnotateOptions::default());
        Assembler::with_categories(&self.schemas, CategorySet::default(), options)
            .validate(table, &self.options(check_warnings))
    }

    /// One annotation per row; `None` where the row contributes nothing or fails.
    pub fn annotate(
        &self,
        table: &TabularInput,
        options: AnnotateOptions,
    ) -> Result<Vec<Option<String>>, EngineError> {
        Ok(self.assemble(table, options)?.strings())
    }

    /// Typed form of [`annotate`](Self::annotate), keeping the row failures as issues.
    pub fn assemble(
        &self,
        table: &TabularInput,
        options: AnnotateOptions,
    ) -> Result<Assembly, EngineError> {
        let assembler = Assembler::new(&self.schemas, self.assembly_options(options))?;
        Ok(assembler.assemble(table))
    }

    fn assembly_options(&self, options: AnnotateOptions) -> AssemblyOptions {
        AssemblyOptions {
            remove_categories: if options.remove_categories {
                self.config.remove_categories.clone()
            } else {
                Vec::new()
            },
            include_context: options.include_context,
            replace_defs: options.replace_defs,
            max_definition_depth: self.config.max_definition_depth,
            parallel_row_threshold: self.config.parallel_row_threshold,
        }
    }

    /// Factor matrix of `queries` over annotation strings. Missing entries (`None`, blank or
    /// `n/a`) are 0 in every column; queries that fail to compile are reported and left out.
    pub fn search<S: AsRef<str>>(
        &self,
        annotations: &[Option<S>],
        queries: &QueryInput,
    ) -> Result<(FactorMatrix, IssueList), EngineError> {
        let rows = annotations
            .iter()
            .enumerate()
            .map(|(row, text)| {
                let text = text.as_ref().map(|text| text.as_ref());
                match text {
                    Some(text) if !is_missing(text) => self
                        .parse_string(text)
                        .map(Some)
                        .map_err(|source| EngineError::Annotation { row, source }),
                    _ => Ok(None),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (handlers, _, issues) = compile_many_named(&queries.entries());
        Ok((self.search_rows(&rows, &handlers), issues))
    }

    pub fn search_rows(
        &self,
        rows: &[Option<HedString>],
        handlers: &[QueryHandler],
    ) -> FactorMatrix {
        evaluate_with(rows, handlers, &self.schemas, self.config.parallel_row_threshold)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};

    use super::{AnnotateOptions, EngineError, HedEngine, QueryInput, SchemaSpec};
    use crate::config::EngineConfig;
    use crate::schema::{SchemaGroup, SchemaLoadError};
    use crate::sidecar::Sidecar;
    use crate::tabular::TabularInput;

    #[fixture]
    fn engine() -> HedEngine {
        HedEngine::new("8.2.0").expect("engine")
    }

    fn table() -> TabularInput {
        let mut sidecar = Sidecar::new();
        sidecar.insert_categorical(
            "trial_type",
            [("go", "Label/Go-trial, Task/Flanker"), ("stop", "Label/Stop-trial")],
        );
        TabularInput::from_rows(&["trial_type"], [["go"], ["stop"], ["n/a"]])
            .expect("table")
            .with_sidecar(Arc::new(sidecar))
    }

    #[rstest]
    fn validates_strings(engine: HedEngine) {
        assert_eq!(engine.validate_string("Red, Blue", false).expect("parse"), "");
        let warned = engine.validate_string("Red, Blue/Apple", true).expect("parse");
        assert!(warned.contains("WARNING"), "{warned}");
        assert!(engine.validate_string("Red, Blech", false).expect("parse").contains("ERROR"));
        assert!(engine.validate_string("(Red", false).is_err());
    }

    #[rstest]
    fn annotates_with_and_without_categories(engine: HedEngine) {
        let plain = engine.annotate(&table(), AnnotateOptions::default()).expect("annotate");
        assert_eq!(
            plain,
            vec![
                Some("Label/Go-trial, Task/Flanker".to_owned()),
                Some("Label/Stop-trial".to_owned()),
                None,
            ]
        );

        let options = AnnotateOptions {
            remove_categories: true,
            ..AnnotateOptions::default()
        };
        let trimmed = engine.annotate(&table(), options).expect("annotate");
        assert_eq!(trimmed[0].as_deref(), Some("Label/Go-trial"));
    }

    #[rstest]
    fn searches_annotation_strings(engine: HedEngine) {
        let annotations = [Some("Red, Blue"), Some("Red"), Some("n/a"), None];
        let queries = QueryInput::Named(vec![
            (Some("red".to_owned()), "Red".to_owned()),
            (None, "Blue and Red".to_owned()),
            (None, "(Blue".to_owned()),
        ]);
        let (matrix, issues) = engine.search(&annotations, &queries).expect("search");
        assert_eq!(matrix.names(), &["red".to_owned(), "query_1".to_owned()]);
        assert_eq!(matrix.rows(), &[vec![1u8, 1], vec![1, 0], vec![0, 0], vec![0, 0]]);
        assert_eq!(issues.len(), 1);
    }

    #[rstest]
    fn unparsable_annotations_fail_the_search(engine: HedEngine) {
        let err = engine
            .search(&[Some("Red"), Some("(Blue")], &QueryInput::from("Red"))
            .expect_err("parse error");
        assert!(matches!(err, EngineError::Annotation { row: 1, .. }));
    }

    #[rstest]
    fn validates_tables_and_json_sidecars(engine: HedEngine) {
        assert_eq!(engine.validate_tabular(&table(), false), "");
        let rendered = engine
            .validate_sidecar_json(r#"{"c": {"HED": {"a": "Blech"}}}"#, false)
            .expect("json");
        assert!(rendered.contains("TAG_INVALID"), "{rendered}");
    }

    #[test]
    fn schema_load_failure_is_terminal() {
        let err = HedEngine::new("9.9.9").expect_err("unknown");
        assert!(matches!(err, EngineError::Schema(SchemaLoadError::UnknownVersion { .. })));
    }

    #[test]
    fn shares_a_prebuilt_group() {
        let schemas = Arc::new(SchemaGroup::load(&["8.2.0"]).expect("schema"));
        let engine = HedEngine::new(SchemaSpec::Loaded(Arc::clone(&schemas))).expect("engine");
        let clone = engine.clone();
        assert!(std::ptr::eq(engine.schemas(), clone.schemas()));
        assert_eq!(Arc::strong_count(&schemas), 3);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            max_definition_depth: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            HedEngine::with_config("8.2.0", config),
            Err(EngineError::Config(_))
        ));
    }
}
