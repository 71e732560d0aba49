//! # Identifier Normalization
//!
//! Turns free-form category and attribute names into column identifiers.
//! Only column naming goes through here; partition assignment always hashes
//! the raw key.

/// Normalize a raw key into a lowercase, underscore-separated identifier.
///
/// `"Active Life (Sports)"` becomes `"active_life_sports"` and
/// `"Bars & Pubs"` becomes `"bars_and_pubs"`. Applying it twice is a no-op.
pub fn normalize(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for ch in key.trim().chars().flat_map(char::to_lowercase) {
        match ch {
            '(' | '-' | '/' => spaced.push(' '),
            ')' | '\'' | ',' => {}
            '&' => spaced.push_str(" and "),
            other => spaced.push(other),
        }
    }
    spaced.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Column name for a key, or `None` when nothing survives normalization.
pub fn column_name(key: &str) -> Option<String> {
    let name = normalize(key);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
