//! Local score index fallback

use super::{ScoreIndex, SupplementaryScores};
use crate::records::{keys, CanonicalRecord, Ratings};
use crate::text::normalize;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

#[derive(Debug, Default)]
struct Index {
    entries: Vec<Ratings>,
    by_bangumi: HashMap<String, usize>,
    by_mal: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

/// Scores from JSON files of the form
/// `{"<title>": {"bgm_id": .., "ids": {"mal_id": ..}, "name": .., "fm_score": "4.1"}, ...}`.
///
/// Files are read on the first lookup, once. Unreadable files are skipped.
#[derive(Debug)]
pub struct JsonScoreIndex {
    paths: Vec<PathBuf>,
    index: OnceCell<Index>,
}

impl JsonScoreIndex {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            index: OnceCell::new(),
        }
    }

    /// Build an index directly from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let data: Map<String, Value> = serde_json::from_str(content)?;
        let mut index = Index::default();
        index.add_all(&data);
        let cell = OnceCell::new();
        let _ = cell.set(index);
        Ok(Self {
            paths: Vec::new(),
            index: cell,
        })
    }

    fn index(&self) -> &Index {
        self.index.get_or_init(|| {
            let mut index = Index::default();
            for path in &self.paths {
                match read_object(path) {
                    Ok(data) => {
                        index.add_all(&data);
                        info!("Loaded score index {}", path.display());
                    }
                    Err(e) => warn!("Skipping score index {}: {}", path.display(), e),
                }
            }
            index
        })
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.index().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_object(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First number in `value` when it lies on the 0–10 scale
fn numeric_score(value: Option<&Value>) -> Option<f64> {
    let score = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => NUMBER.find(s)?.as_str().parse().ok()?,
        _ => return None,
    };
    (0.0..=10.0).contains(&score).then_some(score)
}

impl Index {
    fn add_all(&mut self, data: &Map<String, Value>) {
        for (key, entry) in data {
            if key == "total" {
                continue;
            }
            let Some(entry) = entry.as_object() else {
                continue;
            };

            let mut ratings = Ratings::new();
            if let Some(score) = numeric_score(entry.get("fm_score")) {
                ratings.insert(keys::FILMARKS.to_string(), score);
            }

            let row = self.entries.len();
            self.entries.push(ratings);

            let ids = entry.get("ids");
            let bangumi = id_text(entry.get("bgm_id"))
                .or_else(|| id_text(ids.and_then(|i| i.get("bgm_id"))));
            if let Some(id) = bangumi {
                self.by_bangumi.insert(id, row);
            }
            if let Some(id) = id_text(ids.and_then(|i| i.get("mal_id"))) {
                self.by_mal.insert(id, row);
            }

            let titles = std::iter::once(key.as_str()).chain(
                ["name", "name_cn", "name_jp"]
                    .iter()
                    .filter_map(|field| entry.get(*field).and_then(|t| t.as_str())),
            );
            for title in titles {
                let norm = normalize(title);
                if !norm.is_empty() {
                    self.by_title.entry(norm).or_insert(row);
                }
            }
        }
    }

    fn find(&self, record: &CanonicalRecord) -> Option<usize> {
        if let Some(row) = record
            .id_for(keys::BANGUMI)
            .and_then(|id| self.by_bangumi.get(id))
        {
            return Some(*row);
        }
        if let Some(row) = record.id_for(keys::MAL).and_then(|id| self.by_mal.get(id)) {
            return Some(*row);
        }
        [
            &record.name_localized_b,
            &record.name,
            &record.name_localized_a,
        ]
        .into_iter()
        .flatten()
        .find_map(|title| self.by_title.get(&normalize(title)).copied())
    }
}

impl ScoreIndex for JsonScoreIndex {
    fn lookup(&self, record: &CanonicalRecord) -> Option<SupplementaryScores> {
        let index = self.index();
        let row = index.find(record)?;
        let ratings = index.entries.get(row)?.clone();
        if ratings.is_empty() {
            debug!("score index matched without usable scores");
            return None;
        }
        Some(SupplementaryScores { ratings })
    }
}
