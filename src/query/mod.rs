// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Boolean search over assembled annotations.
//!
//! A query is compiled once into a [`QueryHandler`] and evaluated against every row, giving a
//! rows x queries [`FactorMatrix`] of 0/1 values.
//!
//! ```text
//! Red and not Blue
//! [Red, Def/Cue]            -- both inside one group
//! {Onset, @def(Cue)}        -- both direct children of one group
//! Label/Go* or @exact(Label/Stop-trial)
//! ```

mod eval;
mod lexer;
mod parser;

use crate::hed::HedString;
use crate::issues::{Issue, IssueCode, IssueList, Locator};
use crate::schema::SchemaGroup;

pub use eval::{evaluate, evaluate_with, FactorMatrix, DEFAULT_PARALLEL_THRESHOLD};
pub use parser::{Expr, QueryParseError, TermPattern};

/// A compiled query plus the text it came from and its column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHandler {
    source: String,
    name: String,
    expr: Expr,
}

impl QueryHandler {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the predicate holds anywhere in `hed`.
    pub fn matches(&self, hed: &HedString, schemas: &SchemaGroup) -> bool {
        eval::holds(&self.expr, hed.children(), eval::Reach::Deep, schemas)
    }
}

/// Column name given to the query at `index` when the caller supplies none.
pub fn default_name(index: usize) -> String {
    format!("query_{index}")
}

/// Compiles one query. The handler is named `query_0` until renamed.
pub fn compile(text: &str) -> Result<QueryHandler, QueryParseError> {
    let expr = parser::parse_query(text)?;
    tracing::trace!(query = text, ?expr, "compiled query");
    Ok(QueryHandler {
        source: text.to_owned(),
        name: default_name(0),
        expr,
    })
}

/// Compiles each query on its own. Failures become `QUERY_INVALID` issues located at the
/// query's input position and are left out of the handlers; names stay paired with the
/// handlers that compiled.
pub fn compile_many<S: AsRef<str>>(queries: &[S]) -> (Vec<QueryHandler>, Vec<String>, IssueList) {
    let named = queries
        .iter()
        .map(|query| (None, query.as_ref()))
        .collect::<Vec<_>>();
    compile_many_named(&named)
}

/// Like [`compile_many`], with an optional caller-supplied name per query.
pub fn compile_many_named(
    queries: &[(Option<&str>, &str)],
) -> (Vec<QueryHandler>, Vec<String>, IssueList) {
    let mut handlers = Vec::with_capacity(queries.len());
    let mut issues = IssueList::new();
    for (index, &(name, text)) in queries.iter().enumerate() {
        let name = name.map_or_else(|| default_name(index), str::to_owned);
        match compile(text) {
            Ok(handler) => handlers.push(handler.with_name(name)),
            Err(err) => issues.push(
                Issue::new(IssueCode::QueryInvalid, format!("'{text}': {err}"))
                    .at(Locator::query(index)),
            ),
        }
    }
    let names = handlers.iter().map(|handler| handler.name.clone()).collect();
    tracing::debug!(
        queries = queries.len(),
        compiled = handlers.len(),
        "compiled queries"
    );
    (handlers, names, issues)
}
