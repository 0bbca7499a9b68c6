//! Metadata source module
//!
//! Defines the SourceSearcher trait, a registry of configured sources and
//! the Bangumi, AniList and Jikan adapters.

mod loader;
mod registry;
mod traits;

pub mod anilist;
pub mod bangumi;
pub mod jikan;

pub use anilist::AniList;
pub use bangumi::Bangumi;
pub use jikan::Jikan;
pub use loader::SourceLoader;
pub use registry::{RegisteredSource, SourceRegistry};
pub use traits::*;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})(?:-(\d{2}))?").expect("valid year-month regex"));

/// Year and month from an ISO-like date prefix (`2023-09-29`, `2023-09-29T00:00:00Z`, `2023`).
pub(crate) fn parse_year_month(date: &str) -> (Option<i32>, Option<u32>) {
    match YEAR_MONTH.captures(date) {
        Some(caps) => (
            caps.get(1).and_then(|y| y.as_str().parse().ok()),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    }
}

/// String field of a JSON object, empty when absent or not a string
pub(crate) fn value_str(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Common label for an upstream "original work" enum value
pub(crate) fn source_type_label(raw: &str) -> String {
    match raw.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
        "MANGA" => "manga".to_string(),
        "LIGHT_NOVEL" => "light novel".to_string(),
        "ORIGINAL" => "original".to_string(),
        "GAME" | "VIDEO_GAME" => "game".to_string(),
        "NOVEL" => "novel".to_string(),
        "VISUAL_NOVEL" => "visual novel".to_string(),
        "WEB_MANGA" => "web manga".to_string(),
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_month() {
        assert_eq!(parse_year_month("2023-09-29"), (Some(2023), Some(9)));
        assert_eq!(parse_year_month("2023-09-29T00:00:00+00:00"), (Some(2023), Some(9)));
        assert_eq!(parse_year_month("2023"), (Some(2023), None));
        assert_eq!(parse_year_month(""), (None, None));
    }

    #[test]
    fn test_source_type_label() {
        assert_eq!(source_type_label("MANGA"), "manga");
        assert_eq!(source_type_label("Light novel"), "light novel");
        assert_eq!(source_type_label("Visual novel"), "visual novel");
        assert_eq!(source_type_label("4-koma manga"), "4-koma manga");
    }
}
