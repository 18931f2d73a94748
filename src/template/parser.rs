// Template Parser
// Parses the nested single-key YAML outline into a flat ProtocolTemplate

use crate::template::error::ParseError;
use crate::template::models::{Blueprint, ProtocolStep, ProtocolTemplate};

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parser for protocol template YAML documents.
///
/// The document has two top-level collections:
/// - `steps`: ordered list where each entry nests
///   `Step N` label -> step name -> process type -> attribute map
///   (the attribute map must carry `has_input` and `has_output` lists)
/// - `processedsamples`: list of single-key placeholder -> blueprint maps,
///   where the blueprint again single-key-wraps a record type label.
pub struct TemplateParser;

impl TemplateParser {
    /// Parse a template from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ProtocolTemplate, ParseError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a template from a YAML string.
    pub fn parse(content: &str) -> Result<ProtocolTemplate, ParseError> {
        let doc: Value = serde_yaml::from_str(content)?;
        let root = doc
            .as_object()
            .ok_or_else(|| ParseError::invalid_structure("document", "root must be a mapping"))?;

        let steps = Self::parse_steps(root)?;
        let blueprints = Self::parse_blueprints(root)?;

        let template = ProtocolTemplate { steps, blueprints };
        Self::validate(&template)?;
        Ok(template)
    }

    fn parse_steps(root: &Map<String, Value>) -> Result<Vec<ProtocolStep>, ParseError> {
        let entries = root
            .get("steps")
            .and_then(Value::as_array)
            .ok_or_else(|| ParseError::invalid_structure("document", "'steps' must be a list"))?;

        let mut steps = Vec::with_capacity(entries.len());
        for entry in entries {
            let (label, named) = single_entry(entry, "steps")?;
            let sequence = parse_sequence(label)?;
            let (name, typed) = single_entry(named, label)?;
            let (process_type, attrs) = single_entry(typed, name)?;

            let attrs = attrs.as_object().ok_or_else(|| {
                ParseError::invalid_structure(name, "step attributes must be a mapping")
            })?;

            let has_input = placeholder_list(attrs, "has_input")
                .ok_or_else(|| ParseError::MissingField {
                    step: name.to_string(),
                    field: "has_input",
                })?;
            let has_output = placeholder_list(attrs, "has_output")
                .ok_or_else(|| ParseError::MissingField {
                    step: name.to_string(),
                    field: "has_output",
                })?;

            let attributes: BTreeMap<String, Value> = attrs
                .iter()
                .filter(|(k, _)| k.as_str() != "has_input" && k.as_str() != "has_output")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            steps.push(ProtocolStep {
                sequence,
                name: name.to_string(),
                process_type: process_type.to_string(),
                has_input,
                has_output,
                attributes,
            });
        }

        Ok(steps)
    }

    fn parse_blueprints(root: &Map<String, Value>) -> Result<Vec<Blueprint>, ParseError> {
        let entries = root
            .get("processedsamples")
            .and_then(Value::as_array)
            .map(|v| v.as_slice())
            .unwrap_or_default();

        let mut blueprints: Vec<Blueprint> = Vec::with_capacity(entries.len());
        for entry in entries {
            let (placeholder, wrapped) = single_entry(entry, "processedsamples")?;
            let (type_label, attrs) = single_entry(wrapped, placeholder)?;

            let attributes: BTreeMap<String, Value> = attrs
                .as_object()
                .ok_or_else(|| {
                    ParseError::invalid_structure(placeholder, "blueprint must be a mapping")
                })?
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            if blueprints.iter().any(|b| b.placeholder == placeholder) {
                return Err(ParseError::DuplicateBlueprint {
                    placeholder: placeholder.to_string(),
                });
            }

            blueprints.push(Blueprint {
                placeholder: placeholder.to_string(),
                type_label: type_label.to_string(),
                attributes,
            });
        }

        Ok(blueprints)
    }

    /// Every output placeholder must have a blueprint to materialize from.
    fn validate(template: &ProtocolTemplate) -> Result<(), ParseError> {
        for step in &template.steps {
            for placeholder in &step.has_output {
                if template.blueprint(placeholder).is_none() {
                    return Err(ParseError::MissingBlueprint {
                        placeholder: placeholder.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Unwrap a single-key mapping, returning the key and its value.
fn single_entry<'a>(value: &'a Value, context: &str) -> Result<(&'a str, &'a Value), ParseError> {
    let map = value.as_object().ok_or_else(|| {
        ParseError::invalid_structure(context, "expected a single-key mapping")
    })?;
    if map.len() != 1 {
        return Err(ParseError::invalid_structure(
            context,
            format!("expected exactly one key, found {}", map.len()),
        ));
    }
    let (key, inner) = map.iter().next().expect("len checked above");
    Ok((key.as_str(), inner))
}

/// Parse the trailing number out of a `Step N` label.
fn parse_sequence(label: &str) -> Result<u32, ParseError> {
    label
        .split_whitespace()
        .last()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| ParseError::BadSequenceLabel {
            label: label.to_string(),
        })
}

/// Read a list-of-strings slot, tolerating an empty list.
fn placeholder_list(attrs: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = attrs.get(key)?.as_array()?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
