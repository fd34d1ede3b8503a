use tracing::info;

use super::Dictionary;

/// Split entries into dictionary hits and the untranslated remainder.
///
/// Matching is exact and whole-string; a hit takes the first (highest
/// frequency) candidate. No fuzzy matching: anything this reports as
/// translated must be a certain hit, because later phases trust the split.
pub fn split_by_dictionary(
    entries: &[(String, String)],
    dict: &Dictionary,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut translated = Vec::new();
    let mut remaining = Vec::new();

    for (key, text) in entries {
        match dict.first_candidate(text) {
            Some(candidate) => translated.push((key.clone(), candidate.to_string())),
            None => remaining.push((key.clone(), text.clone())),
        }
    }

    info!(
        "Dictionary matching: {} translated, {} remaining",
        translated.len(),
        remaining.len()
    );
    (translated, remaining)
}
