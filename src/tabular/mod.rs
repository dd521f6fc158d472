// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Event tables and per-row annotation assembly.
//!
//! A [`TabularInput`] holds already-parsed rows (no file I/O). Each row is turned into one
//! annotation by looking its cells up in the table's [`Sidecar`]; see [`Assembler`] for the
//! table-wide steps (category removal, context expansion, definition replacement).

mod assembler;
mod context;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::sidecar::Sidecar;

pub use assembler::{
    assemble_row, get_hed_string_objs, remove_categories, Assembler, Assembly, AssemblyError,
    AssemblyOptions, CategoryError, CategorySet,
};
pub use context::duration_seconds;

/// Column whose cells hold raw HED strings and need no sidecar entry.
pub const HED_COLUMN: &str = "HED";
/// Column holding each row's onset time in seconds.
pub const ONSET_COLUMN: &str = "onset";

/// One raw cell. `"n/a"` and blank text are [`Cell::Missing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Value(String),
    Missing,
}

impl Cell {
    pub fn from_raw(raw: &str) -> Self {
        if crate::sidecar::is_missing(raw) {
            Self::Missing
        } else {
            Self::Value(raw.trim().to_owned())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<&str> for Cell {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabularError {
    DuplicateColumn { name: String },
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for TabularError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateColumn { name } => write!(f, "column '{name}' appears more than once"),
            Self::RowWidth {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} cells, expected {expected}"),
        }
    }
}

impl std::error::Error for TabularError {}

/// Rows of raw cells in column order, optionally paired with a sidecar.
#[derive(Debug, Clone, Default)]
pub struct TabularInput {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    sidecar: Option<Arc<Sidecar>>,
}

impl TabularInput {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<Self, TabularError> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(columns.len());
        for column in columns {
            let name = column.as_ref().trim();
            if !seen.insert(name.to_owned()) {
                return Err(TabularError::DuplicateColumn {
                    name: name.to_owned(),
                });
            }
            names.push(name.to_owned());
        }
        Ok(Self {
            columns: names,
            rows: Vec::new(),
            sidecar: None,
        })
    }

    pub fn from_rows<S, R, C>(columns: &[S], rows: R) -> Result<Self, TabularError>
    where
        S: AsRef<str>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn with_sidecar(mut self, sidecar: Arc<Sidecar>) -> Self {
        self.sidecar = Some(sidecar);
        self
    }

    pub fn push_row<C>(&mut self, cells: C) -> Result<(), TabularError>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| Cell::from_raw(cell.as_ref()))
            .collect::<Vec<_>>();
        if cells.len() != self.columns.len() {
            return Err(TabularError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sidecar(&self) -> Option<&Sidecar> {
        self.sidecar.as_deref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// The row's `onset` cell as seconds, when present and numeric.
    pub fn onset(&self, row: usize) -> Option<f64> {
        let index = self
            .columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(ONSET_COLUMN))?;
        self.rows.get(row)?.get(index)?.as_str()?.parse().ok()
    }
}

#[cfg(test)]
mod tests;
