//! Decoders from text to generic values. Every format lands in a
//! `serde_json::Value` so callers only deal with one value type.

use serde_json::{Map, Value};

use crate::error::{DatasourceError, Result};

/// Parse a JSON object
pub fn json(input: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(input).map_err(|e| DatasourceError::parse("json", e))
}

/// Parse a JSON array
pub fn json_array(input: &str) -> Result<Vec<Value>> {
    serde_json::from_str(input).map_err(|e| DatasourceError::parse("json", e))
}

/// Parse a YAML mapping. An empty document is an empty map.
pub fn yaml(input: &str) -> Result<Map<String, Value>> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| DatasourceError::parse("yaml", e))?;
    match yaml_to_json(doc) {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(DatasourceError::parse(
            "yaml",
            format!("expected a mapping, found {}", kind(&other)),
        )),
    }
}

/// Parse a YAML sequence
pub fn yaml_array(input: &str) -> Result<Vec<Value>> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| DatasourceError::parse("yaml", e))?;
    match yaml_to_json(doc) {
        Value::Array(items) => Ok(items),
        other => Err(DatasourceError::parse(
            "yaml",
            format!("expected a sequence, found {}", kind(&other)),
        )),
    }
}

/// Parse a TOML document
pub fn toml(input: &str) -> Result<Map<String, Value>> {
    let table: toml::Table =
        toml::from_str(input).map_err(|e| DatasourceError::parse("toml", e))?;
    Ok(table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect())
}

/// Parse CSV into rows of cells. The first row is returned like any other.
pub fn csv(input: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(input.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(String::from).collect())
                .map_err(|e| DatasourceError::parse("csv", e))
        })
        .collect()
}

/// Parse a dotenv file into a string-keyed map of strings
pub fn dotenv(input: &str) -> Result<Map<String, Value>> {
    dotenvy::from_read_iter(input.as_bytes())
        .map(|item| {
            item.map(|(k, v)| (k, Value::String(v)))
                .map_err(|e| DatasourceError::parse("dotenv", e))
        })
        .collect()
}

/// Short name of a value's type, for error messages
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
