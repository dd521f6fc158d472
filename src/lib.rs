// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Hedkit: HED annotation assembly, validation and search.
//!
//! The crate is an in-process library. Schemas are loaded once into an immutable
//! [`SchemaGroup`](schema::SchemaGroup); sidecars and tables are turned into per-row
//! [`HedString`](hed::HedString)s; validation collects [`Issue`](issues::Issue)s instead of
//! failing; compiled queries turn assembled rows into a 0/1 factor matrix.
//!
//! ```no_run
//! use hedkit::{AnnotateOptions, HedEngine, QueryInput};
//!
//! # fn main() -> Result<(), hedkit::EngineError> {
//! let engine = HedEngine::new("8.2.0")?;
//! assert_eq!(engine.validate_string("Red, Blue", false)?, "");
//!
//! let annotations = [Some("Red, Blue"), Some("Red")];
//! let queries = QueryInput::List(vec!["Red".into(), "Blue and Red".into()]);
//! let (matrix, _issues) = engine.search(&annotations, &queries)?;
//! assert_eq!(matrix.row(1), Some(&[1, 0][..]));
//! # let _ = AnnotateOptions::default();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod hed;
pub mod issues;
pub mod query;
pub mod schema;
pub mod sidecar;
pub mod tabular;

pub use config::{ConfigError, EngineConfig};
pub use engine::{AnnotateOptions, EngineError, HedEngine, QueryInput, SchemaSpec};
pub use issues::{has_errors, render, Issue, IssueCode, IssueList, Locator, Severity};
