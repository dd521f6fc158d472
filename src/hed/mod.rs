// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Annotation strings: parsing, schema resolution and validation.

mod node;
mod parser;
mod resolve;
mod validator;

pub use node::{DefRef, HedGroup, HedNode, HedString, HedTag, Reserved, ResolvedTag, Span};
pub use parser::{parse, ParseError};
pub use resolve::{resolve, resolve_tag};
pub use validator::{validate, validate_str, ValidationOptions};
