// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Loader for the HED MediaWiki schema format.
//!
//! Supported layout:
//! - header line `HED version="8.2.0"` with an optional `library="score"`
//! - free text until `!# start schema`
//! - tag tree: `'''Root'''` lines start a root, `*`-prefixed lines nest by star count
//! - `!# end schema`, then `'''Unit classes'''`, `'''Unit modifiers'''`, `'''Value classes'''`
//! - `!# end hed`
//!
//! Every node line may carry `<nowiki>{attr, attr=value}[description]</nowiki>`.

use std::sync::OnceLock;

use regex::Regex;
use smol_str::SmolStr;

use super::store::{Schema, SchemaBuilder, SchemaLoadError};
use super::tag_def::{Attributes, TagId};
use super::units::{Unit, UnitClass, UnitModifier};
use super::version::SchemaVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Prologue,
    Tags,
    AfterTags,
    UnitClasses,
    UnitModifiers,
    ValueClasses,
    Other,
    End,
}

struct NodeLine {
    depth: usize,
    name: String,
    attributes: Attributes,
    description: Option<String>,
}

pub(crate) fn parse_wiki_schema(text: &str) -> Result<Schema, SchemaLoadError> {
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line.trim_end()));

    let (header_line_no, header) = lines
        .by_ref()
        .find(|(_, line)| !line.trim().is_empty())
        .ok_or_else(|| SchemaLoadError::Syntax {
            line_no: 1,
            reason: "schema text is empty".to_owned(),
        })?;
    let version = parse_header(header_line_no, header)?;

    let mut builder = SchemaBuilder::new(version);
    let mut section = Section::Prologue;
    let mut stack: Vec<TagId> = Vec::new();
    let mut current_unit_class: Option<String> = None;

    for (line_no, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed {
            "!# start schema" => {
                section = Section::Tags;
                continue;
            }
            "!# end schema" => {
                section = Section::AfterTags;
                continue;
            }
            "!# end hed" => {
                section = Section::End;
                continue;
            }
            _ => {}
        }

        if section == Section::Tags {
            let node = parse_node_line(line_no, trimmed)?;
            let parent = if node.depth == 0 {
                stack.clear();
                None
            } else {
                if node.depth > stack.len() {
                    return Err(SchemaLoadError::MissingParent {
                        line_no,
                        name: node.name,
                    });
                }
                stack.truncate(node.depth);
                stack.last().copied()
            };
            let id = builder.add_tag(parent, &node.name, node.attributes, node.description)?;
            stack.push(id);
            continue;
        }

        if section == Section::Prologue || section == Section::End {
            continue;
        }

        if let Some(title) = section_title(trimmed) {
            section = match title.to_ascii_lowercase().as_str() {
                "unit classes" => Section::UnitClasses,
                "unit modifiers" => Section::UnitModifiers,
                "value classes" => Section::ValueClasses,
                _ => Section::Other,
            };
            current_unit_class = None;
            continue;
        }

        match section {
            Section::UnitClasses => {
                let node = parse_node_line(line_no, trimmed)?;
                match node.depth {
                    1 => {
                        builder.add_unit_class(UnitClass {
                            name: SmolStr::new(&node.name),
                            default_units: node.attributes.value("defaultUnits").map(SmolStr::new),
                            units: Vec::new(),
                        });
                        current_unit_class = Some(node.name);
                    }
                    2 => {
                        let class = current_unit_class
                            .as_deref()
                            .and_then(|name| builder.unit_class_mut(name))
                            .ok_or_else(|| SchemaLoadError::MissingParent {
                                line_no,
                                name: node.name.clone(),
                            })?;
                        class.units.push(Unit {
                            si_unit: node.attributes.has("SIUnit"),
                            symbol: node.attributes.has("unitSymbol"),
                            name: SmolStr::new(&node.name),
                        });
                    }
                    _ => return Err(syntax(line_no, "unit classes nest at most two levels")),
                }
            }
            Section::UnitModifiers => {
                let node = parse_node_line(line_no, trimmed)?;
                builder.add_unit_modifier(UnitModifier {
                    symbol: node.attributes.has("SIUnitSymbolModifier"),
                    name: SmolStr::new(&node.name),
                });
            }
            Section::ValueClasses => {
                let node = parse_node_line(line_no, trimmed)?;
                builder.add_value_class(&node.name);
            }
            _ => {}
        }
    }

    if section != Section::End {
        return Err(syntax(text.lines().count(), "missing '!# end hed' terminator"));
    }

    Ok(builder.build())
}

fn syntax(line_no: usize, reason: &str) -> SchemaLoadError {
    SchemaLoadError::Syntax {
        line_no,
        reason: reason.to_owned(),
    }
}

fn header_regex() -> &'static Regex {
    static HEADER_RE: OnceLock<Regex> = OnceLock::new();
    HEADER_RE.get_or_init(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("header regex is valid"))
}

fn parse_header(line_no: usize, line: &str) -> Result<SchemaVersion, SchemaLoadError> {
    let rest = line
        .trim()
        .strip_prefix("HED ")
        .ok_or_else(|| syntax(line_no, "expected a 'HED version=\"...\"' header"))?;

    let mut version = None;
    let mut library = None;
    for caps in header_regex().captures_iter(rest) {
        match &caps[1] {
            "version" => version = Some(caps[2].to_owned()),
            "library" => library = Some(caps[2].to_ascii_lowercase()),
            _ => {}
        }
    }
    let version = version.ok_or_else(|| syntax(line_no, "header has no version attribute"))?;
    Ok(SchemaVersion::new(library.as_deref(), &version))
}

fn section_title(line: &str) -> Option<&str> {
    line.strip_prefix("'''")?.strip_suffix("'''").map(str::trim)
}

fn parse_node_line(line_no: usize, line: &str) -> Result<NodeLine, SchemaLoadError> {
    let (head, nowiki) = match line.find("<nowiki>") {
        Some(idx) => {
            let inner = line[idx + "<nowiki>".len()..]
                .strip_suffix("</nowiki>")
                .ok_or_else(|| syntax(line_no, "unterminated <nowiki> block"))?;
            (line[..idx].trim(), Some(inner))
        }
        None => (line.trim(), None),
    };

    let (depth, name) = if let Some(stars) = head.strip_prefix('*') {
        let extra = stars.chars().take_while(|c| *c == '*').count();
        (1 + extra, stars[extra..].trim())
    } else if let Some(root) = section_title(head) {
        (0, root)
    } else {
        return Err(syntax(line_no, "expected a '*' node or a '''Root''' line"));
    };

    if name.is_empty() {
        return Err(syntax(line_no, "node name is empty"));
    }
    if name != "#" && name.chars().any(|c| c.is_whitespace() || c == '/' || c == ',') {
        return Err(syntax(line_no, "node names must not contain whitespace, '/' or ','"));
    }

    let mut attributes = Attributes::default();
    let mut description = None;
    if let Some(mut rest) = nowiki.map(str::trim) {
        if let Some(body) = rest.strip_prefix('{') {
            let end = body.find('}').ok_or_else(|| syntax(line_no, "unterminated attribute list"))?;
            for item in body[..end].split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match item.split_once('=') {
                    Some((key, value)) => attributes.insert_value(key.trim(), value.trim()),
                    None => attributes.insert_flag(item),
                }
            }
            rest = body[end + 1..].trim();
        }
        if let Some(body) = rest.strip_prefix('[') {
            let body = body
                .strip_suffix(']')
                .ok_or_else(|| syntax(line_no, "unterminated description"))?;
            description = Some(body.trim().to_owned());
        }
    }

    Ok(NodeLine {
        depth,
        name: name.to_owned(),
        attributes,
        description,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::parse_wiki_schema;
    use crate::schema::store::SchemaLoadError;

    const MINI: &str = r#"HED version="1.0.0" library="mini"
'''Prologue'''
Tiny.
!# start schema
'''Thing''' <nowiki>{extensionAllowed}[A thing.]</nowiki>
* Shape
** Circle
* Size <nowiki>{requireChild}</nowiki>
** # <nowiki>{takesValue, valueClass=numericClass, unitClass=lengthUnits}</nowiki>
!# end schema
'''Unit classes'''
* lengthUnits <nowiki>{defaultUnits=m}</nowiki>
** m <nowiki>{SIUnit, unitSymbol}</nowiki>
'''Unit modifiers'''
* k <nowiki>{SIUnitSymbolModifier}</nowiki>
'''Value classes'''
* numericClass
!# end hed
"#;

    #[test]
    fn parses_tree_units_and_classes() {
        let schema = parse_wiki_schema(MINI).expect("parse");
        assert_eq!(schema.version().to_string(), "mini_1.0.0");
        assert_eq!(schema.len(), 5);

        let circle = schema.find_short("circle").expect("circle");
        assert_eq!(schema.tag(circle).long_form(), "Thing/Shape/Circle");
        assert!(schema.extension_allowed(circle));

        let size = schema.find_short("Size").expect("size");
        let value = schema.value_child(size).expect("value node");
        assert_eq!(schema.tag(value).attributes().value("unitClass"), Some("lengthUnits"));
        assert_eq!(schema.tag(schema.roots()[0]).description(), Some("A thing."));

        let units = schema.unit_class("lengthunits").expect("unit class");
        assert!(units.accepts("km", schema.unit_modifiers()));
        assert_eq!(schema.value_classes().len(), 1);
    }

    #[test]
    fn rejects_skipped_nesting_levels() {
        let text = "HED version=\"1.0.0\"\n!# start schema\n'''A'''\n** B\n!# end schema\n!# end hed\n";
        assert!(matches!(
            parse_wiki_schema(text),
            Err(SchemaLoadError::MissingParent { line_no: 4, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_terms() {
        let text = "HED version=\"1.0.0\"\n!# start schema\n'''A'''\n* B\n'''C'''\n* b\n!# end schema\n!# end hed\n";
        assert!(matches!(parse_wiki_schema(text), Err(SchemaLoadError::DuplicateTag { .. })));
    }

    #[test]
    fn requires_header_and_terminator() {
        assert!(matches!(parse_wiki_schema("Nope"), Err(SchemaLoadError::Syntax { .. })));
        let text = "HED version=\"1.0.0\"\n!# start schema\n'''A'''\n!# end schema\n";
        assert!(matches!(parse_wiki_schema(text), Err(SchemaLoadError::Syntax { .. })));
    }

    #[rstest]
    #[case("")]
    #[case("  \n\n\t\n")]
    fn blank_text_is_an_empty_schema_error(#[case] text: &str) {
        let err = parse_wiki_schema(text).expect_err("blank schema");
        assert!(matches!(err, SchemaLoadError::Syntax { line_no: 1, .. }), "{err:?}");
        assert!(err.to_string().contains("schema text is empty"), "{err}");
    }
}
