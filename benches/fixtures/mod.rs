// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Deterministic event tables (no RNG).

use std::sync::Arc;

use hedkit::sidecar::Sidecar;
use hedkit::tabular::TabularInput;

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::Medium, Case::Large];

    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    pub fn rows(self) -> usize {
        match self {
            Self::Small => 64,
            Self::Medium => 1_000,
            Self::Large => 20_000,
        }
    }
}

const TRIAL_TYPES: [&str; 5] = ["go", "stop", "go", "n/a", "cue_on"];

pub fn sidecar() -> Arc<Sidecar> {
    let (sidecar, _) = Sidecar::from_json_str(
        r#"{
            "trial_type": {
                "HED": {
                    "go": "Label/Go-trial, (Red, Def/Target), Task/Flanker",
                    "stop": "Label/Stop-trial, (Blue, Square), Condition-variable/Hard",
                    "cue_on": "(Def/Cue, Onset)",
                    "cue_off": "(Def/Cue, Offset)"
                }
            },
            "response_time": {"HED": "Time-value/# s"},
            "count": {"HED": "Def/Acc/#"},
            "defs": {
                "HED": {
                    "cue": "(Definition/Cue, (Green, Label/Fixation))",
                    "target": "(Definition/Target, (Experimental-stimulus, Circle))",
                    "acc": "(Definition/Acc/#, (Item-count/#))"
                }
            }
        }"#,
    )
    .expect("bench sidecar");
    Arc::new(sidecar)
}

/// `onset, trial_type, response_time, count` with a Cue scope closed every 50 rows.
pub fn table(case: Case) -> TabularInput {
    let columns = ["onset", "trial_type", "response_time", "count"];
    let mut table = TabularInput::new(&columns).expect("columns").with_sidecar(sidecar());
    for idx in 0..case.rows() {
        let onset = format!("{:.2}", idx as f64 * 0.75);
        let trial = if idx % 50 == 49 {
            "cue_off"
        } else {
            TRIAL_TYPES[idx % TRIAL_TYPES.len()]
        };
        let rt = if idx % 7 == 0 {
            "n/a".to_owned()
        } else {
            format!("0.{}", 300 + idx % 400)
        };
        let count = (idx % 11).to_string();
        table
            .push_row([onset.as_str(), trial, rt.as_str(), count.as_str()])
            .expect("row");
    }
    table
}

pub const QUERIES: [&str; 6] = [
    "Red",
    "Blue and Square",
    "[Red, Def/Target]",
    "{Onset, @def(Cue)}",
    "Label/Go* and not Condition-variable",
    "@attr(unitClass) or Item-count",
];
