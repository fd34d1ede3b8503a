use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{PacklingoError, Result};

/// A content file value, classified once at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Non-empty string value, eligible for translation
    Text(String),
    /// Anything else (numbers, arrays, objects, empty strings), copied
    /// through to the output verbatim
    Passthrough(Value),
}

/// An ordered key/value unit of translatable material.
///
/// Key order is load-bearing: downstream packaging relies on the output
/// file having the same key order as the input file.
#[derive(Debug, Clone)]
pub struct ContentFile {
    entries: Vec<(String, Entry)>,
}

impl ContentFile {
    /// Classify a parsed JSON document. Returns `None` for anything that
    /// is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        let map = match value {
            Value::Object(map) => map,
            _ => return None,
        };

        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let entry = match value {
                    Value::String(s) if !s.trim().is_empty() => Entry::Text(s),
                    other => Entry::Passthrough(other),
                };
                (key, entry)
            })
            .collect();

        Some(Self { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PacklingoError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Ok(Self::from_value(value))
    }

    /// The translatable subset, in file order.
    pub fn translatable(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(key, entry)| match entry {
                Entry::Text(text) => Some((key.clone(), text.clone())),
                Entry::Passthrough(_) => None,
            })
            .collect()
    }

    pub fn entries(&self) -> &[(String, Entry)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the full document as an ordered JSON object, with every
    /// value passed through `resolve`. Passthrough values are returned
    /// unchanged regardless of what `resolve` would say.
    pub fn to_output<F>(&self, mut resolve: F) -> Map<String, Value>
    where
        F: FnMut(&str, &str) -> String,
    {
        let mut output = Map::with_capacity(self.entries.len());
        for (key, entry) in &self.entries {
            let value = match entry {
                Entry::Text(text) => Value::String(resolve(key, text)),
                Entry::Passthrough(value) => value.clone(),
            };
            output.insert(key.clone(), value);
        }
        output
    }
}
