// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Forward scan that carries ongoing-event content into later rows.
//!
//! `(Def/X, Onset, ...)` opens a scope keyed by the anchor `X`, `(Def/X, Offset)` closes it.
//! `(Duration/d, ...)` opens a scope that lasts `d` seconds from the row onset (shifted by an
//! optional `Delay`). A row receives an `(Event-context, ...)` group with the de-duplicated
//! contents of every scope that was open on entry to the row, in opening order.

use std::collections::HashSet;

use super::TabularInput;
use crate::hed::{resolve_tag, HedGroup, HedNode, HedString, HedTag, Reserved};
use crate::schema::{split_value_unit, SchemaGroup};

const EVENT_CONTEXT: &str = "Event-context";

/// Converts a time value (`2 s`, `300 ms`, `1.5 minutes`, bare `0.5`) to seconds.
pub fn duration_seconds(value: &str) -> Option<f64> {
    let (number, unit) = split_value_unit(value);
    let number = number.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let scale = match unit {
        None => 1.0,
        Some(unit) => unit_scale(unit)?,
    };
    Some(number * scale)
}

fn unit_scale(unit: &str) -> Option<f64> {
    // Symbols are case-sensitive, names are not.
    let scale = match unit {
        "s" => 1.0,
        "ms" => 1e-3,
        "us" => 1e-6,
        _ => match unit.to_ascii_lowercase().trim_end_matches('s') {
            "second" => 1.0,
            "millisecond" => 1e-3,
            "microsecond" => 1e-6,
            "minute" => 60.0,
            "hour" => 3600.0,
            "day" => 86_400.0,
            _ => return None,
        },
    };
    Some(scale)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScopeEvent {
    Open {
        anchor: String,
        contents: Vec<HedNode>,
    },
    Close {
        anchor: String,
    },
    Inset {
        anchor: String,
    },
    Timed {
        start: f64,
        end: f64,
        contents: Vec<HedNode>,
    },
}

/// Scope changes announced by the top-level groups of one row.
pub(crate) fn scope_events(hed: &HedString, onset: Option<f64>) -> Vec<ScopeEvent> {
    hed.children()
        .iter()
        .filter_map(HedNode::as_group)
        .filter_map(|group| group_event(group, onset))
        .collect()
}

fn group_event(group: &HedGroup, onset: Option<f64>) -> Option<ScopeEvent> {
    let mut marker = None;
    let mut duration = None;
    let mut delay = 0.0;
    for tag in group.direct_tags() {
        match tag.reserved() {
            Some(kind @ (Reserved::Onset | Reserved::Offset | Reserved::Inset)) => {
                marker = Some(kind);
            }
            Some(Reserved::Duration) => duration = tag_seconds(tag),
            Some(Reserved::Delay) => delay = tag_seconds(tag).unwrap_or(0.0),
            _ => {}
        }
    }

    match marker {
        Some(Reserved::Onset) => Some(ScopeEvent::Open {
            anchor: anchor_key(group)?,
            contents: scope_contents(group),
        }),
        Some(Reserved::Offset) => Some(ScopeEvent::Close {
            anchor: anchor_key(group)?,
        }),
        Some(_) => Some(ScopeEvent::Inset {
            anchor: anchor_key(group)?,
        }),
        None => {
            let start = onset? + delay;
            Some(ScopeEvent::Timed {
                start,
                end: start + duration?,
                contents: scope_contents(group),
            })
        }
    }
}

fn tag_seconds(tag: &HedTag) -> Option<f64> {
    let value = match tag.resolved() {
        Some(resolved) => resolved.value()?,
        None => tag.body().split_once('/')?.1,
    };
    duration_seconds(value)
}

/// The group's children without its temporal tags.
fn scope_contents(group: &HedGroup) -> Vec<HedNode> {
    group
        .children()
        .iter()
        .filter(|node| {
            !matches!(
                node.as_tag().and_then(HedTag::reserved),
                Some(
                    Reserved::Onset
                        | Reserved::Offset
                        | Reserved::Inset
                        | Reserved::Duration
                        | Reserved::Delay
                )
            )
        })
        .cloned()
        .collect()
}

/// Key of the group's `Def/X[/v]` or `(Def-expand/X[/v], ...)` anchor.
pub(crate) fn anchor_key(group: &HedGroup) -> Option<String> {
    group.children().iter().find_map(|node| match node {
        HedNode::Def(def) => Some(def.anchor_key()),
        HedNode::Group(inner) => inner.direct_tags().find_map(|tag| {
            let (name, value) = tag.def_target(Reserved::DefExpand)?;
            Some(match value {
                Some(value) => format!("{name}/{value}").to_ascii_lowercase(),
                None => name.to_ascii_lowercase(),
            })
        }),
        HedNode::Tag(_) => None,
    })
}

#[derive(Debug)]
enum ScopeKey {
    Anchor(String),
    Timed { start: f64, end: f64 },
}

#[derive(Debug)]
struct Scope {
    key: ScopeKey,
    contents: Vec<HedNode>,
}

impl Scope {
    fn covers(&self, onset: Option<f64>) -> bool {
        match self.key {
            ScopeKey::Anchor(_) => true,
            ScopeKey::Timed { start, end } => onset.is_some_and(|t| start <= t && t < end),
        }
    }

    fn is_anchor(&self, anchor: &str) -> bool {
        matches!(&self.key, ScopeKey::Anchor(key) if key == anchor)
    }
}

/// Gives every row that starts inside an open scope an `(Event-context, ...)` group.
/// Returns the number of rows that received one.
pub(crate) fn expand_context(
    rows: &mut [Option<HedString>],
    table: &TabularInput,
    schemas: &SchemaGroup,
) -> usize {
    let mut active = Vec::<Scope>::new();
    let mut augmented = 0;
    for (index, row) in rows.iter_mut().enumerate() {
        let onset = table.onset(index);
        active.retain(|scope| match scope.key {
            ScopeKey::Anchor(_) => true,
            ScopeKey::Timed { end, .. } => onset.map_or(true, |t| t < end),
        });
        let Some(hed) = row else {
            continue;
        };

        let events = scope_events(hed, onset);
        let inherited = inherited_nodes(&active, onset);
        if !inherited.is_empty() {
            add_context(hed, inherited, schemas);
            augmented += 1;
        }
        for event in events {
            apply(&mut active, event);
        }
    }
    augmented
}

fn inherited_nodes(active: &[Scope], onset: Option<f64>) -> Vec<HedNode> {
    let mut seen = HashSet::new();
    active
        .iter()
        .filter(|scope| scope.covers(onset))
        .flat_map(|scope| scope.contents.iter())
        .filter(|node| seen.insert(node.identity()))
        .cloned()
        .collect()
}

/// Merges into the row's own `(Event-context, ...)` group when it has one, so the row keeps a
/// single `Event-context`.
fn add_context(hed: &mut HedString, inherited: Vec<HedNode>, schemas: &SchemaGroup) {
    let existing = hed.children().iter().position(|node| {
        node.as_group()
            .is_some_and(|group| group.has_reserved(Reserved::EventContext))
    });
    let Some(index) = existing else {
        hed.extend([context_group(inherited, schemas)]);
        return;
    };
    if let HedNode::Group(group) = &mut hed.children_mut()[index] {
        let present = group
            .children()
            .iter()
            .map(HedNode::identity)
            .collect::<HashSet<_>>();
        group.children_mut().extend(
            inherited
                .into_iter()
                .filter(|node| !present.contains(&node.identity())),
        );
    }
    hed.refresh_source();
}

fn context_group(nodes: Vec<HedNode>, schemas: &SchemaGroup) -> HedNode {
    let mut tag = HedTag::new(EVENT_CONTEXT);
    resolve_tag(&mut tag, schemas);
    let mut children = Vec::with_capacity(nodes.len() + 1);
    children.push(HedNode::Tag(tag));
    children.extend(nodes);
    HedNode::Group(HedGroup::new(children))
}

fn apply(active: &mut Vec<Scope>, event: ScopeEvent) {
    match event {
        ScopeEvent::Open { anchor, contents } => {
            active.retain(|scope| !scope.is_anchor(&anchor));
            active.push(Scope {
                key: ScopeKey::Anchor(anchor),
                contents,
            });
        }
        ScopeEvent::Close { anchor } => active.retain(|scope| !scope.is_anchor(&anchor)),
        ScopeEvent::Inset { .. } => {}
        ScopeEvent::Timed {
            start,
            end,
            contents,
        } => active.push(Scope {
            key: ScopeKey::Timed { start, end },
            contents,
        }),
    }
}

/// Rows whose Offset or Inset names an anchor that no earlier Onset opened.
pub(crate) fn unmatched_anchors(rows: &[Option<HedString>]) -> Vec<(usize, String)> {
    let mut open = HashSet::new();
    let mut unmatched = Vec::new();
    for (index, hed) in rows.iter().enumerate() {
        let Some(hed) = hed else {
            continue;
        };
        for event in scope_events(hed, None) {
            match event {
                ScopeEvent::Open { anchor, .. } => {
                    open.insert(anchor);
                }
                ScopeEvent::Close { anchor } => {
                    if !open.remove(&anchor) {
                        unmatched.push((index, anchor));
                    }
                }
                ScopeEvent::Inset { anchor } => {
                    if !open.contains(&anchor) {
                        unmatched.push((index, anchor));
                    }
                }
                ScopeEvent::Timed { .. } => {}
            }
        }
    }
    unmatched
}
