//! Candidate record: one source's answer for one query

use super::{non_blank, truncate_chars, Ratings, SourceIds, SUMMARY_MAX_CHARS};
use serde::{Deserialize, Serialize};

/// A single result returned by one source for one query.
///
/// Candidates are never mutated after a source produces them; the resolver
/// only reads them while building canonical records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Source that produced this record
    pub origin: String,
    /// Identifiers, keyed by namespace
    #[serde(default)]
    pub source_ids: SourceIds,
    /// Primary (usually romanized) title
    pub name: Option<String>,
    /// Localized title, e.g. Chinese or English
    pub name_localized_a: Option<String>,
    /// Native title, e.g. Japanese
    pub name_localized_b: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub studio: Option<String>,
    pub director: Option<String>,
    /// Original work type (manga, light novel, original, ...)
    pub source_type: Option<String>,
    /// Ratings normalized to 0–10
    #[serde(default)]
    pub ratings: Ratings,
    pub summary: Option<String>,
    /// Match quality against the query keyword, in [0,1]
    pub confidence: f64,
}

impl CandidateRecord {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, key: impl Into<String>, id: impl Into<String>) -> Self {
        if let Some(id) = non_blank(id) {
            self.source_ids.insert(key.into(), id);
        }
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_localized_a(mut self, name: impl Into<String>) -> Self {
        self.name_localized_a = non_blank(name);
        self
    }

    pub fn with_localized_b(mut self, name: impl Into<String>) -> Self {
        self.name_localized_b = non_blank(name);
        self
    }

    pub fn with_date(mut self, year: Option<i32>, month: Option<u32>) -> Self {
        self.year = year;
        self.month = month.filter(|m| (1..=12).contains(m));
        self
    }

    pub fn with_year(self, year: i32) -> Self {
        let month = self.month;
        self.with_date(Some(year), month)
    }

    pub fn with_studio(mut self, studio: impl Into<String>) -> Self {
        self.studio = non_blank(studio);
        self
    }

    pub fn with_director(mut self, director: impl Into<String>) -> Self {
        self.director = non_blank(director);
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = non_blank(source_type);
        self
    }

    /// Add a rating; values outside 0–10 or not finite are ignored.
    pub fn with_rating(mut self, key: impl Into<String>, score: f64) -> Self {
        if score.is_finite() && (0.0..=10.0).contains(&score) {
            self.ratings.insert(key.into(), score);
        }
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = non_blank(truncate_chars(summary.trim(), SUMMARY_MAX_CHARS));
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// All non-empty title fields: name, localized A, localized B.
    pub fn names(&self) -> Vec<&str> {
        [&self.name, &self.name_localized_a, &self.name_localized_b]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .collect()
    }

    /// Whether at least one title field is populated.
    pub fn has_title(&self) -> bool {
        !self.names().is_empty()
    }

    pub fn id_for(&self, key: &str) -> Option<&str> {
        self.source_ids.get(key).map(|s| s.as_str())
    }

    /// True when both records carry the same id in some namespace.
    pub fn shares_id_with(&self, other: &CandidateRecord) -> bool {
        self.source_ids
            .iter()
            .any(|(key, id)| other.source_ids.get(key) == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_drops_blank_values() {
        let record = CandidateRecord::new("bangumi")
            .with_id("bangumi", " ")
            .with_name("Frieren")
            .with_localized_a("")
            .with_studio("  Madhouse ");

        assert!(record.source_ids.is_empty());
        assert_eq!(record.names(), vec!["Frieren"]);
        assert_eq!(record.studio.as_deref(), Some("Madhouse"));
    }

    #[test]
    fn test_rating_range_enforced() {
        let record = CandidateRecord::new("jikan")
            .with_rating("mal", 9.1)
            .with_rating("anilist", 91.0)
            .with_rating("bangumi", f64::NAN);
        assert_eq!(record.ratings.len(), 1);
        assert_eq!(record.ratings.get("mal"), Some(&9.1));
    }

    #[test]
    fn test_summary_truncated() {
        let long = "あ".repeat(300);
        let record = CandidateRecord::new("anilist").with_summary(&long);
        assert_eq!(record.summary.unwrap().chars().count(), 200);
    }

    #[test]
    fn test_shares_id_with() {
        let a = CandidateRecord::new("bangumi").with_id("bangumi", "100");
        let b = CandidateRecord::new("jikan")
            .with_id("bangumi", "100")
            .with_id("mal", "5");
        let c = CandidateRecord::new("jikan").with_id("mal", "100");

        assert!(a.shares_id_with(&b));
        assert!(b.shares_id_with(&a));
        assert!(!a.shares_id_with(&c));
    }

    #[test]
    fn test_month_out_of_range_dropped() {
        let record = CandidateRecord::new("anilist").with_date(Some(2023), Some(13));
        assert_eq!(record.year, Some(2023));
        assert_eq!(record.month, None);
    }
}
