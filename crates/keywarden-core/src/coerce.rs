//! YAML to JSON value coercion
//!
//! YAML mappings may be keyed by non-string scalars (numbers, booleans),
//! which cannot be represented in a JSON object and fail serialization at
//! write time. Every free-form block is pushed through this module before
//! being sent to the server, stringifying scalar keys recursively.

use crate::error::{Error, Result};
use serde_json::{Map, Value as JsonValue};
use serde_yaml_ng::{Mapping, Value as YamlValue};

/// Convert a YAML mapping into a string-keyed JSON object.
pub fn mapping_to_json(mapping: &Mapping) -> Result<Map<String, JsonValue>> {
    let mut object = Map::new();
    for (key, value) in mapping {
        object.insert(key_to_string(key)?, value_to_json(value)?);
    }
    Ok(object)
}

/// Convert a YAML value into a JSON value, coercing nested mapping keys.
pub fn value_to_json(value: &YamlValue) -> Result<JsonValue> {
    Ok(match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::Number(n) => JsonValue::Number(number_to_json(n)?),
        YamlValue::String(s) => JsonValue::String(s.clone()),
        YamlValue::Sequence(seq) => {
            JsonValue::Array(seq.iter().map(value_to_json).collect::<Result<_>>()?)
        }
        YamlValue::Mapping(mapping) => JsonValue::Object(mapping_to_json(mapping)?),
        YamlValue::Tagged(tagged) => value_to_json(&tagged.value)?,
    })
}

fn number_to_json(n: &serde_yaml_ng::Number) -> Result<serde_json::Number> {
    if let Some(i) = n.as_i64() {
        Ok(i.into())
    } else if let Some(u) = n.as_u64() {
        Ok(u.into())
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| Error::invalid_config(format!("number '{n}' has no JSON representation")))
    }
}

fn key_to_string(key: &YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        other => Err(Error::invalid_config(format!(
            "mapping key {other:?} cannot be converted to a string"
        ))),
    }
}
