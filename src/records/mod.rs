//! Record types flowing through resolution
//!
//! Candidates come from sources, canonical records come out of the resolver.

mod candidate;
mod canonical;
mod filters;

pub use candidate::*;
pub use canonical::*;
pub use filters::*;

use std::collections::BTreeMap;

/// Identifier namespace → identifier. At most one id per namespace.
pub type SourceIds = BTreeMap<String, String>;

/// Rating namespace → score on a 0–10 scale.
pub type Ratings = BTreeMap<String, f64>;

/// Well-known identifier and rating namespaces.
pub mod keys {
    pub const BANGUMI: &str = "bangumi";
    pub const ANILIST: &str = "anilist";
    pub const MAL: &str = "mal";
    pub const FILMARKS: &str = "filmarks";
}

/// Maximum summary length, in characters.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Trim `value` and return `None` when nothing is left.
pub(crate) fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  "), None);
        assert_eq!(non_blank(" MAPPA "), Some("MAPPA".to_string()));
        assert_eq!(non_blank("Madhouse"), Some("Madhouse".to_string()));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let text = "葬送のフリーレン";
        assert_eq!(truncate_chars(text, 2), "葬送");
        assert_eq!(truncate_chars(text, 50), text);
    }
}
