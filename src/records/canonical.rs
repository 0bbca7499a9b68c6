//! Canonical record: merged view of one real-world title

use super::{CandidateRecord, Ratings, SourceIds};
use serde::{Deserialize, Serialize};

/// Merge output of one equivalence group.
///
/// Built from the group's base candidate and filled from the remaining
/// members. Later stages (identifier mapping, enrichment, soft boosts and
/// the local score fallback) only ever fill empty fields or adjust
/// `confidence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(default)]
    pub source_ids: SourceIds,
    pub name: Option<String>,
    pub name_localized_a: Option<String>,
    pub name_localized_b: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub studio: Option<String>,
    pub director: Option<String>,
    pub source_type: Option<String>,
    #[serde(default)]
    pub ratings: Ratings,
    pub summary: Option<String>,
    pub confidence: f64,
    /// Sources that contributed at least one group member
    #[serde(default)]
    pub sources: Vec<String>,
    /// Number of candidates merged into this record
    pub group_size: usize,
}

fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

impl CanonicalRecord {
    /// Start a canonical record from a single candidate.
    pub fn from_candidate(base: &CandidateRecord) -> Self {
        Self {
            source_ids: base.source_ids.clone(),
            name: base.name.clone(),
            name_localized_a: base.name_localized_a.clone(),
            name_localized_b: base.name_localized_b.clone(),
            year: base.year,
            month: base.month,
            studio: base.studio.clone(),
            director: base.director.clone(),
            source_type: base.source_type.clone(),
            ratings: base.ratings.clone(),
            summary: base.summary.clone(),
            confidence: base.confidence,
            sources: vec![base.origin.clone()],
            group_size: 1,
        }
    }

    /// Fill every still-empty field from `other`. Never overwrites.
    pub fn absorb(&mut self, other: &CandidateRecord) {
        self.fill_ids(&other.source_ids);
        self.fill_ratings(&other.ratings);
        fill(&mut self.name, &other.name);
        fill(&mut self.name_localized_a, &other.name_localized_a);
        fill(&mut self.name_localized_b, &other.name_localized_b);
        fill(&mut self.year, &other.year);
        fill(&mut self.month, &other.month);
        fill(&mut self.studio, &other.studio);
        fill(&mut self.director, &other.director);
        fill(&mut self.source_type, &other.source_type);
        fill(&mut self.summary, &other.summary);
        if !self.sources.contains(&other.origin) {
            self.sources.push(other.origin.clone());
        }
    }

    /// Add ids for namespaces that are still missing. Returns how many were added.
    pub fn fill_ids(&mut self, ids: &SourceIds) -> usize {
        let mut added = 0;
        for (key, id) in ids {
            if !self.source_ids.contains_key(key) {
                self.source_ids.insert(key.clone(), id.clone());
                added += 1;
            }
        }
        added
    }

    /// Add ratings for namespaces that are still missing.
    pub fn fill_ratings(&mut self, ratings: &Ratings) {
        for (key, score) in ratings {
            self.ratings.entry(key.clone()).or_insert(*score);
        }
    }

    /// Fill only the title fields from `other`.
    pub fn fill_names(&mut self, other: &CandidateRecord) {
        fill(&mut self.name, &other.name);
        fill(&mut self.name_localized_a, &other.name_localized_a);
        fill(&mut self.name_localized_b, &other.name_localized_b);
    }

    /// All non-empty title fields: name, localized A, localized B.
    pub fn names(&self) -> Vec<&str> {
        [&self.name, &self.name_localized_a, &self.name_localized_b]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .collect()
    }

    pub fn id_for(&self, key: &str) -> Option<&str> {
        self.source_ids.get(key).map(|s| s.as_str())
    }

    /// Field-map view handed to callers.
    pub fn to_field_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}
