// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use smol_str::SmolStr;

/// Release identity of one vocabulary: optional library name plus `MAJOR.MINOR.PATCH`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaVersion {
    library: Option<SmolStr>,
    version: SmolStr,
}

impl SchemaVersion {
    pub fn new(library: Option<&str>, version: &str) -> Self {
        Self {
            library: library.map(SmolStr::new),
            version: SmolStr::new(version),
        }
    }

    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_standard(&self) -> bool {
        self.library.is_none()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.library {
            Some(library) => write!(f, "{library}_{}", self.version),
            None => f.write_str(&self.version),
        }
    }
}

/// One entry of a version spec, e.g. `sc:score_1.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    prefix: Option<SmolStr>,
    version: SchemaVersion,
}

impl VersionSpec {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn schema_version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn parse(input: &str) -> Result<Self, VersionSpecError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionSpecError::Empty);
        }
        let caps = version_regex()
            .captures(trimmed)
            .ok_or_else(|| VersionSpecError::Malformed {
                input: trimmed.to_owned(),
            })?;

        let prefix = caps.name("prefix").map(|m| SmolStr::new(m.as_str().to_ascii_lowercase()));
        let library = caps.name("library").map(|m| m.as_str().to_ascii_lowercase());
        let version = caps.name("version").map(|m| m.as_str()).unwrap_or_default();

        Ok(Self {
            prefix,
            version: SchemaVersion::new(library.as_deref(), version),
        })
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        write!(f, "{}", self.version)
    }
}

impl FromStr for VersionSpec {
    type Err = VersionSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpecError {
    Empty,
    Malformed { input: String },
}

impl fmt::Display for VersionSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("schema version must not be empty"),
            Self::Malformed { input } => write!(
                f,
                "malformed schema version '{input}' (expected '[prefix:][library_]X.Y.Z')"
            ),
        }
    }
}

impl std::error::Error for VersionSpecError {}

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<prefix>[A-Za-z]+):)?(?:(?P<library>[A-Za-z][A-Za-z0-9]*)_)?(?P<version>\d+\.\d+\.\d+)$",
        )
        .expect("version regex is valid")
    })
}
