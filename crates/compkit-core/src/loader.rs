//! YAML loading for module and component configs.
//!
//! Configs are converted to `serde_json::Value` on load since every consumer
//! ends up serializing them into the JSON schema artifact. Non-string mapping
//! keys are stringified the way a JavaScript YAML loader would.

use crate::error::{CompkitError, Result};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Read and parse a YAML file. Returns `Ok(None)` when the file is absent.
pub fn load_yaml(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    parse_yaml(path, &text).map(Some)
}

/// Async variant of [`load_yaml`] used by the schema pipeline.
pub async fn load_yaml_async(path: &Path) -> Result<Option<Value>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    let text = tokio::fs::read_to_string(path).await?;
    parse_yaml(path, &text).map(Some)
}

/// Parse YAML text. An empty or null document yields an empty mapping.
pub fn parse_yaml(path: &Path, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let raw: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|source| CompkitError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(match yaml_to_json(raw) {
        Value::Null => Value::Object(Map::new()),
        other => other,
    })
}

pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => number_to_json(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                out.insert(key_to_string(&key), yaml_to_json(value));
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn number_to_json(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Tagged(tagged) => key_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
