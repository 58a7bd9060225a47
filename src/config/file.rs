//! Reading the daemon configuration file.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use super::option::OptionId;
use super::ConfigError;

/// Decoded file contents, before any schema checks.
///
/// Recognised keys are stored by [`OptionId`]; anything else is listed in
/// `unrecognized` so callers can warn about it or reject it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFileConfig {
    pub values: BTreeMap<OptionId, Value>,
    pub unrecognized: Vec<String>,
}

impl RawFileConfig {
    pub fn get(&self, id: OptionId) -> Option<&Value> {
        self.values.get(&id)
    }

    fn from_object(object: Map<String, Value>) -> Self {
        let mut values = BTreeMap::new();
        let mut unrecognized = Vec::new();

        for (key, value) in object {
            match OptionId::from_file_key(&key) {
                Some(id) => {
                    values.insert(id, value);
                }
                None => unrecognized.push(key),
            }
        }
        unrecognized.sort();

        Self {
            values,
            unrecognized,
        }
    }
}

/// Loads and decodes a configuration file.
///
/// The file is read as JSON, or as TOML when its extension is `.toml`.
/// The top level must be an object.
pub fn load(path: impl AsRef<Path>) -> Result<RawFileConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let parse_error = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let value = if is_toml(path) {
        let table: toml::Table = toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;
        toml_to_json(toml::Value::Table(table))
    } else {
        serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
    };

    match value {
        Value::Object(object) => Ok(RawFileConfig::from_object(object)),
        other => Err(parse_error(format!(
            "expected an object at the top level, found {}",
            type_name(&other)
        ))),
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
