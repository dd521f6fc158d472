// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;

use super::parser::{Expr, TermPattern};
use super::QueryHandler;
use crate::hed::{HedGroup, HedNode, HedString, HedTag, Reserved};
use crate::schema::SchemaGroup;

/// Rows at or above this count are evaluated on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Rows x queries matrix of 0/1 results, with one name per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactorMatrix {
    names: Vec<String>,
    rows: Vec<Vec<u8>>,
}

impl FactorMatrix {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        self.rows.get(row)?.get(column).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn column(&self, column: usize) -> Option<Vec<u8>> {
        (column < self.width()).then(|| self.rows.iter().map(|row| row[column]).collect())
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<u8>> {
        let index = self.names.iter().position(|candidate| candidate == name)?;
        self.column(index)
    }
}

pub fn evaluate(
    rows: &[Option<HedString>],
    handlers: &[QueryHandler],
    schemas: &SchemaGroup,
) -> FactorMatrix {
    evaluate_with(rows, handlers, schemas, DEFAULT_PARALLEL_THRESHOLD)
}

/// Evaluates every handler against every row. Missing rows are 0 in every column.
pub fn evaluate_with(
    rows: &[Option<HedString>],
    handlers: &[QueryHandler],
    schemas: &SchemaGroup,
    parallel_threshold: usize,
) -> FactorMatrix {
    let evaluate_row = |row: &Option<HedString>| {
        handlers
            .iter()
            .map(|handler| u8::from(row.as_ref().is_some_and(|hed| handler.matches(hed, schemas))))
            .collect::<Vec<_>>()
    };
    let matrix = if rows.len() >= parallel_threshold {
        rows.par_iter().map(evaluate_row).collect()
    } else {
        rows.iter().map(evaluate_row).collect()
    };
    tracing::debug!(rows = rows.len(), queries = handlers.len(), "evaluated queries");
    FactorMatrix {
        names: handlers.iter().map(|handler| handler.name().to_owned()).collect(),
        rows: matrix,
    }
}

/// How far below the current node list a predicate may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reach {
    /// The whole subtree.
    Deep,
    /// Direct children only.
    Direct,
}

pub(crate) fn holds(expr: &Expr, nodes: &[HedNode], reach: Reach, schemas: &SchemaGroup) -> bool {
    match expr {
        Expr::And { items } => items.iter().all(|item| holds(item, nodes, reach, schemas)),
        Expr::Or { items } => items.iter().any(|item| holds(item, nodes, reach, schemas)),
        Expr::Not { item } => !holds(item, nodes, reach, schemas),
        Expr::AnyGroup { items } => groups(nodes, reach).into_iter().any(|group| {
            items
                .iter()
                .all(|item| holds(item, group.children(), Reach::Deep, schemas))
        }),
        Expr::ChildGroup { items } => groups(nodes, reach).into_iter().any(|group| {
            items
                .iter()
                .all(|item| holds(item, group.children(), Reach::Direct, schemas))
        }),
        leaf => leaves(nodes, reach)
            .into_iter()
            .any(|node| leaf_matches(leaf, node, schemas)),
    }
}

fn groups(nodes: &[HedNode], reach: Reach) -> SmallVec<[&HedGroup; 8]> {
    let mut out = SmallVec::new();
    let mut stack = nodes.iter().rev().collect::<SmallVec<[_; 16]>>();
    while let Some(node) = stack.pop() {
        if let HedNode::Group(group) = node {
            out.push(group);
            if reach == Reach::Deep {
                stack.extend(group.children().iter().rev());
            }
        }
    }
    out
}

fn leaves(nodes: &[HedNode], reach: Reach) -> SmallVec<[&HedNode; 16]> {
    let mut out = SmallVec::new();
    let mut stack = nodes.iter().rev().collect::<SmallVec<[_; 16]>>();
    while let Some(node) = stack.pop() {
        match node {
            HedNode::Group(group) if reach == Reach::Deep => {
                stack.extend(group.children().iter().rev());
            }
            HedNode::Group(_) => {}
            leaf => out.push(leaf),
        }
    }
    out
}

fn leaf_matches(expr: &Expr, node: &HedNode, schemas: &SchemaGroup) -> bool {
    let Some(tag) = node.as_tag() else {
        return false;
    };
    match expr {
        Expr::Term(pattern) => term_matches(pattern, tag),
        Expr::Exact(short) => short_form(tag).eq_ignore_ascii_case(short),
        Expr::Attr(attribute) => tag.resolved().is_some_and(|resolved| {
            let member = resolved.member();
            schemas.tag(member, resolved.tag()).has_attribute(attribute)
                || resolved
                    .value_node()
                    .is_some_and(|node| schemas.tag(member, node).has_attribute(attribute))
        }),
        Expr::Def(name) => match node {
            HedNode::Def(def) => def.name().eq_ignore_ascii_case(name),
            _ => tag
                .def_target(Reserved::DefExpand)
                .is_some_and(|(target, _)| target.eq_ignore_ascii_case(name)),
        },
        _ => false,
    }
}

fn term_matches(pattern: &TermPattern, tag: &HedTag) -> bool {
    let path = match tag.resolved() {
        Some(resolved) => resolved.long_form(),
        None => tag.body().to_owned(),
    };
    let segments = path
        .split('/')
        .map(|segment| segment.trim().to_ascii_lowercase())
        .collect::<SmallVec<[String; 8]>>();
    pattern.matches(&segments)
}

/// Schema short name plus extension or value (`Label/Go-trial`), with its library prefix.
fn short_form(tag: &HedTag) -> String {
    let Some(resolved) = tag.resolved() else {
        return tag.text().trim().to_owned();
    };
    let mut short = match tag.prefix() {
        Some(prefix) => format!("{prefix}:{}", resolved.name()),
        None => resolved.name().to_owned(),
    };
    if let Some(rest) = resolved.extension().or(resolved.value()) {
        short.push('/');
        short.push_str(rest);
    }
    short
}
