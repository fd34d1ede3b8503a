//! Resumption and persistence protocol.
//!
//! There is no separate state store: the output file written after each
//! content file *is* the checkpoint. Its presence and content together
//! encode how far a previous run got.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::content::ContentFile;
use crate::error::Result;

/// True when an output file already exists and contains every translatable
/// key, meaning the whole file can be skipped.
///
/// Note: this checks key *presence* only. A key whose value still equals
/// the source text counts as present, because some content legitimately
/// translates to itself (numbers, proper names). The flip side is that a
/// file whose LLM phase failed on every key is also treated as complete on
/// rerun; reruns only pick up keys via the reuse rule below.
pub fn is_fully_translated(output_path: &Path, entries: &[(String, String)]) -> bool {
    let existing = match load_partial(output_path) {
        Some(map) => map,
        None => return false,
    };

    entries.iter().all(|(key, _)| existing.contains_key(key))
}

/// Load the current output file as an ordered object, if it exists and
/// parses. Anything else means there is no usable checkpoint.
pub fn load_partial(output_path: &Path) -> Option<Map<String, Value>> {
    if !output_path.exists() {
        return None;
    }
    let content = std::fs::read_to_string(output_path).ok()?;
    match serde_json::from_str::<Value>(&content).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Partition the dictionary misses into entries already translated by a
/// prior run and entries that still need the LLM.
///
/// A stored value equal to the current source text was never actually
/// translated, only carried through as a fallback, so it is retried.
pub fn split_reusable(
    remaining: &[(String, String)],
    partial: &Map<String, Value>,
) -> (HashMap<String, String>, Vec<(String, String)>) {
    let mut reused = HashMap::new();
    let mut still_remaining = Vec::new();

    for (key, text) in remaining {
        match partial.get(key).and_then(Value::as_str) {
            Some(stored) if stored != text => {
                reused.insert(key.clone(), stored.to_string());
            }
            _ => still_remaining.push((key.clone(), text.clone())),
        }
    }

    (reused, still_remaining)
}

/// Assemble the final output document in the content file's key order.
/// Value priority per key: dictionary match, then reused prior
/// translation, then fresh LLM translation, then the original text.
pub fn merge(
    file: &ContentFile,
    dict_hits: &HashMap<String, String>,
    reused: &HashMap<String, String>,
    llm: &HashMap<String, String>,
) -> Map<String, Value> {
    file.to_output(|key, text| {
        dict_hits
            .get(key)
            .or_else(|| reused.get(key))
            .or_else(|| llm.get(key))
            .cloned()
            .unwrap_or_else(|| text.to_string())
    })
}

/// Write the full output document atomically: temp file in the target
/// directory, then rename over the destination.
pub fn persist(output_path: &Path, merged: &Map<String, Value>) -> Result<()> {
    let parent = output_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut content = serde_json::to_string_pretty(&Value::Object(merged.clone()))?;
    content.push('\n');

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.persist(output_path).map_err(|e| e.error)?;

    debug!("Checkpoint written: {}", output_path.display());
    Ok(())
}
