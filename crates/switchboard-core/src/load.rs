//! Loading server group configuration from files and strings
//!
//! Accepts either the bare mapping of server name to record, or a document
//! with the mapping under a top-level `servers` or `mcpServers` key. String
//! values may reference environment variables as `${VAR}`.

use crate::config::ServerConfigMap;
use crate::error::{Result, SwitchboardError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

const WRAPPER_KEYS: [&str; 2] = ["servers", "mcpServers"];

impl ServerConfigMap {
    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_document(value)
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let value = serde_json::to_value(table)?;
        Self::from_document(value)
    }

    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let map = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") | None => Self::from_json_str(&content)?,
            Some(other) => {
                return Err(SwitchboardError::Config(format!(
                    "unsupported config file extension '.{}' (expected .json or .toml)",
                    other
                )))
            }
        };
        debug!(path = %path.display(), servers = map.len(), "loaded server config");
        Ok(map)
    }

    /// Build from an already parsed document
    pub fn from_document(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(SwitchboardError::Config(
                "server config must be a table/object".to_string(),
            ));
        };

        let entries = match wrapped_entries(&mut root) {
            Some(inner) => inner,
            None => root,
        };

        let entries: Map<String, Value> = entries
            .into_iter()
            .map(|(name, record)| (name, expand_env(record)))
            .collect();
        Ok(Self::from_entries(entries))
    }
}

/// The inner mapping when `root` is a wrapper document
///
/// A wrapper has the wrapper key as its only top-level key, mapping names to
/// records. Anything else is a bare mapping, which may well contain a server
/// called `servers`.
fn wrapped_entries(root: &mut Map<String, Value>) -> Option<Map<String, Value>> {
    if root.len() != 1 {
        return None;
    }
    let key = WRAPPER_KEYS.iter().find(|k| root.contains_key(**k))?;
    match root.get(*key) {
        Some(Value::Object(inner)) if inner.values().all(Value::is_object) => {}
        _ => return None,
    }
    match root.remove(*key) {
        Some(Value::Object(inner)) => Some(inner),
        _ => None,
    }
}

/// Replace `${VAR}` placeholders in every string of `value`
///
/// Unset variables expand to an empty string.
pub fn expand_env(value: Value) -> Value {
    expand_with(value, &|name| std::env::var(name).ok())
}

fn expand_with(value: Value, lookup: &dyn Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(s) => Value::String(expand_str(&s, lookup)),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| expand_with(v, lookup)).collect())
        }
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k, expand_with(v, lookup)))
                .collect(),
        ),
        other => other,
    }
}

fn expand_str(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    ENV_PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| {
                warn!(variable = %name, "environment variable not set, expanding to empty string");
                String::new()
            })
        })
        .into_owned()
}
