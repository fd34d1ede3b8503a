use std::collections::HashSet;

use super::Dictionary;

/// Sentinel used when no dictionary is loaded, so the prompt template
/// never interpolates an empty string.
pub const NO_DICTIONARY: &str = "(no dictionary entries available)";
/// Sentinel used when the dictionary has nothing relevant to this batch.
pub const NO_MATCHES: &str = "(no matching dictionary entries)";

/// Build a bounded dictionary excerpt that grounds the LLM prompt in
/// community-accepted terminology.
///
/// An entry qualifies when its source text contains any alphabetic token
/// (length >= 2) drawn from the values being translated, in any of three
/// case variants: as written, lowercased, capitalized. Entries are taken
/// in corpus order up to `limit`.
pub fn build_context(entries: &[(String, String)], dict: &Dictionary, limit: usize) -> String {
    if dict.is_empty() {
        return NO_DICTIONARY.to_string();
    }

    let mut words: HashSet<String> = HashSet::new();
    for (_, text) in entries {
        for word in text.split(|c: char| !c.is_ascii_alphabetic()) {
            if word.len() >= 2 {
                words.insert(word.to_string());
                words.insert(word.to_lowercase());
                words.insert(capitalize(word));
            }
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for (source, candidates) in dict.iter() {
        if lines.len() >= limit {
            break;
        }
        if words.iter().any(|w| source.contains(w.as_str())) {
            let target = candidates.first().map(String::as_str).unwrap_or("?");
            lines.push(format!("- {} → {}", source, target));
        }
    }

    if lines.is_empty() {
        return NO_MATCHES.to_string();
    }

    lines.join("\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
