// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Unit classes, SI unit modifiers and value-class checks.

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub(crate) name: SmolStr,
    pub(crate) si_unit: bool,
    pub(crate) symbol: bool,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_symbol(&self) -> bool {
        self.symbol
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitClass {
    pub(crate) name: SmolStr,
    pub(crate) default_units: Option<SmolStr>,
    pub(crate) units: Vec<Unit>,
}

impl UnitClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_units(&self) -> Option<&str> {
        self.default_units.as_deref()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Symbols (`s`, `Hz`) match case-sensitively, unit names (`second`) case-insensitively
    /// and in plural form. SI units also accept their modifiers (`ms`, `milliseconds`).
    pub fn accepts(&self, candidate: &str, modifiers: &[UnitModifier]) -> bool {
        self.units.iter().any(|unit| unit_matches(unit, candidate, modifiers))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitModifier {
    pub(crate) name: SmolStr,
    /// `true` for symbol modifiers (`m`, `k`), `false` for name modifiers (`milli`).
    pub(crate) symbol: bool,
}

fn unit_matches(unit: &Unit, candidate: &str, modifiers: &[UnitModifier]) -> bool {
    if unit.symbol {
        if candidate == unit.name.as_str() {
            return true;
        }
        return unit.si_unit
            && modifiers.iter().filter(|m| m.symbol).any(|m| {
                candidate
                    .strip_prefix(m.name.as_str())
                    .is_some_and(|rest| rest == unit.name.as_str())
            });
    }

    let lowered = candidate.to_ascii_lowercase();
    let name = unit.name.to_ascii_lowercase();
    let plain_match = |value: &str| value == name || value.strip_suffix('s') == Some(name.as_str());
    if plain_match(lowered.as_str()) {
        return true;
    }
    unit.si_unit
        && modifiers.iter().filter(|m| !m.symbol).any(|m| {
            lowered
                .strip_prefix(m.name.to_ascii_lowercase().as_str())
                .is_some_and(plain_match)
        })
}

pub const NUMERIC_CLASS: &str = "numericClass";
pub const NAME_CLASS: &str = "nameClass";
pub const TEXT_CLASS: &str = "textClass";

/// Checks `value` against a named value class. Classes without a built-in rule accept
/// every value.
pub fn value_class_accepts(class: &str, value: &str) -> bool {
    if class.eq_ignore_ascii_case(NUMERIC_CLASS) {
        return value.parse::<f64>().is_ok_and(f64::is_finite);
    }
    if class.eq_ignore_ascii_case(NAME_CLASS) {
        return !value.is_empty()
            && value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    }
    if class.eq_ignore_ascii_case(TEXT_CLASS) {
        return !value.is_empty() && !value.chars().any(|c| c.is_control());
    }
    true
}

/// Splits `"2.5 ms"` into `("2.5", Some("ms"))`. The unit is the last whitespace-separated word.
pub fn split_value_unit(value: &str) -> (&str, Option<&str>) {
    let trimmed = value.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((number, unit)) if !unit.is_empty() => (number.trim_end(), Some(unit)),
        _ => (trimmed, None),
    }
}
