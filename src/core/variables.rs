//! `{name}` placeholder templates.
//!
//! `{{` and `}}` stand for literal braces and are never placeholders. Every
//! text of a flow is parsed once, checked against the supplied variables as a
//! whole, then rendered.

use std::collections::{BTreeSet, HashMap};

use crate::core::error::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Template<'a> {
    pub fn parse(text: &'a str) -> Result<Self, FlowError> {
        let bytes = text.as_bytes();
        let mut segments = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    push_literal(&mut segments, &text[start..i]);
                    segments.push(Segment::Literal("{"));
                    i += 2;
                    start = i;
                }
                b'{' => {
                    let rest = &text[i + 1..];
                    let close = rest.find(['{', '}']);
                    match close {
                        Some(0) if rest.starts_with('}') => {
                            return Err(FlowError::MalformedTemplate {
                                position: i,
                                reason: "empty placeholder",
                            });
                        }
                        Some(end) if rest[end..].starts_with('}') => {
                            push_literal(&mut segments, &text[start..i]);
                            segments.push(Segment::Placeholder(&rest[..end]));
                            i += end + 2;
                            start = i;
                        }
                        _ => {
                            return Err(FlowError::MalformedTemplate {
                                position: i,
                                reason: "unclosed '{'",
                            });
                        }
                    }
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    push_literal(&mut segments, &text[start..i]);
                    segments.push(Segment::Literal("}"));
                    i += 2;
                    start = i;
                }
                b'}' => {
                    return Err(FlowError::MalformedTemplate {
                        position: i,
                        reason: "single '}' must be written as '}}'",
                    });
                }
                _ => i += 1,
            }
        }
        push_literal(&mut segments, &text[start..]);

        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance (may repeat).
    pub fn placeholders(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(*name),
            Segment::Literal(_) => None,
        })
    }

    /// Renders the template. Values are inserted verbatim; a placeholder
    /// without a value is left as written.
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match variables.get(*name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Checks that `variables` supplies exactly the placeholders `templates`
/// reference. Surplus keys are reported before missing ones.
pub fn validate(
    templates: &[Template<'_>],
    variables: &HashMap<String, String>,
) -> Result<(), FlowError> {
    let referenced: BTreeSet<&str> = templates.iter().flat_map(|t| t.placeholders()).collect();

    let extra: Vec<String> = variables
        .keys()
        .filter(|k| !referenced.contains(k.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !extra.is_empty() {
        return Err(FlowError::ExtraVariables(extra));
    }

    let missing: Vec<String> = referenced
        .iter()
        .filter(|name| !variables.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FlowError::MissingVariables(missing));
    }

    Ok(())
}

/// Validates and renders every text in one pass over the whole set.
pub fn substitute_all(
    texts: &[&str],
    variables: &HashMap<String, String>,
) -> Result<Vec<String>, FlowError> {
    let templates = texts
        .iter()
        .map(|t| Template::parse(t))
        .collect::<Result<Vec<_>, _>>()?;
    validate(&templates, variables)?;
    Ok(templates.iter().map(|t| t.render(variables)).collect())
}
