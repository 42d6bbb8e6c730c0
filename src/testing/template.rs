//! Placeholder interpolation
//!
//! Two placeholder forms are recognised inside paths, query values and
//! JSON string values:
//!
//! - `{uuid.<name>}`: a random UUID v4, minted the first time the name is
//!   used in a scenario run and reused for the rest of that run. Every
//!   environment receives the same value.
//! - `{capture.<name>}`: a value an environment returned in an earlier
//!   step. Each environment receives only its own value.
//!
//! Any other text in braces is left untouched.

use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::common::{Error, Result};

const UUID_PREFIX: &str = "uuid.";
const CAPTURE_PREFIX: &str = "capture.";

/// Values bound during one scenario run
#[derive(Debug, Default)]
pub struct Bindings {
    uuids: HashMap<String, String>,
    captures: HashMap<String, HashMap<String, String>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// UUID bound to `name`, minting one on first use
    pub fn uuid(&mut self, name: &str) -> &str {
        self.uuids
            .entry(name.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
    }

    /// Record a value captured from one environment
    pub fn capture(&mut self, environment: &str, name: &str, value: String) {
        self.captures
            .entry(environment.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Value captured from one environment
    pub fn captured(&self, environment: &str, name: &str) -> Option<&str> {
        self.captures
            .get(environment)
            .and_then(|m| m.get(name))
            .map(String::as_str)
    }

    /// Resolve every placeholder in `text` for the given environment
    pub fn resolve_str(&mut self, environment: &str, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return Ok(out);
            };

            let inner = &after[..close];
            if let Some(name) = inner.strip_prefix(UUID_PREFIX) {
                if name.is_empty() {
                    return Err(Error::UnknownPlaceholder(inner.to_string()));
                }
                out.push_str(self.uuid(name));
            } else if let Some(name) = inner.strip_prefix(CAPTURE_PREFIX) {
                let value = self
                    .captured(environment, name)
                    .ok_or_else(|| Error::UnknownPlaceholder(inner.to_string()))?;
                out.push_str(value);
            } else {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Resolve placeholders in every string of a JSON value
    pub fn resolve_value(&mut self, environment: &str, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.resolve_str(environment, s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.resolve_value(environment, v))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    resolved.insert(k.clone(), self.resolve_value(environment, v)?);
                }
                Value::Object(resolved)
            }
            other => other.clone(),
        })
    }
}

/// Names referenced as `{capture.<name>}` in a piece of text
pub fn capture_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        if let Some(name) = after[..close].strip_prefix(CAPTURE_PREFIX) {
            names.push(name);
        }
        rest = &after[close + 1..];
    }
    names
}

/// Names referenced as `{capture.<name>}` anywhere in a JSON value
pub fn value_capture_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => capture_names(s),
        Value::Array(items) => items.iter().flat_map(value_capture_names).collect(),
        Value::Object(map) => map.values().flat_map(value_capture_names).collect(),
        _ => Vec::new(),
    }
}

/// Render a captured JSON value as plain text for interpolation
pub fn capture_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
