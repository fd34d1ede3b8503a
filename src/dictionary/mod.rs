// Dictionary-backed translation support
//
// The dictionary is a static community corpus mapping exact source strings
// to candidate translations, ordered by observed frequency. It is fetched
// once, cached on disk, and read-only for the duration of a run.

pub mod cache;
pub mod context;
pub mod matcher;

pub use cache::DictionaryCache;
pub use context::build_context;
pub use matcher::split_by_dictionary;

use serde_json::Value;
use std::collections::HashMap;

/// An immutable source -> candidate translations corpus.
///
/// Iteration follows the corpus file order, so context selection is
/// deterministic across runs. Lookups are exact, case-sensitive,
/// whole-string matches.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dictionary from a parsed JSON document. Entries whose value
    /// is not an array of strings are dropped. Returns `None` if the
    /// document is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        let map = match value {
            Value::Object(map) => map,
            _ => return None,
        };

        let mut dict = Self::default();
        for (source, candidates) in map {
            let candidates: Vec<String> = match candidates {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
                _ => continue,
            };
            dict.insert(source, candidates);
        }
        Some(dict)
    }

    pub fn insert(&mut self, source: String, candidates: Vec<String>) {
        match self.index.get(&source) {
            Some(&pos) => self.entries[pos].1 = candidates,
            None => {
                self.index.insert(source.clone(), self.entries.len());
                self.entries.push((source, candidates));
            }
        }
    }

    /// The highest-frequency candidate for an exact source match, if any.
    pub fn first_candidate(&self, source: &str) -> Option<&str> {
        self.index
            .get(source)
            .and_then(|&pos| self.entries[pos].1.first())
            .map(String::as_str)
    }

    /// Entries in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(source, candidates)| (source.as_str(), candidates.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
