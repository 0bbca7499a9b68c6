//! AniList source implementation
//!
//! Uses the public GraphQL API.

use super::traits::*;
use super::source_type_label;
use crate::error::SourceError;
use crate::records::{keys, CandidateRecord};
use crate::similarity::SimilarityScorer;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

const SEARCH_QUERY: &str = r#"
query ($search: String, $type: MediaType, $year: Int, $season: MediaSeason) {
    Page(page: 1, perPage: 20) {
        media(search: $search, type: $type, seasonYear: $year, season: $season) {
            id
            title { romaji, english, native }
            startDate { year, month }
            studios { nodes { name } }
            staff { edges { node { name { full } } role } }
            source
            description
            meanScore
        }
    }
}
"#;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid html tag regex"));

/// AniList media search
pub struct AniList {
    api_url: String,
    scorer: Arc<SimilarityScorer>,
}

impl AniList {
    pub fn new(scorer: Arc<SimilarityScorer>) -> Self {
        Self {
            api_url: "https://graphql.anilist.co".to_string(),
            scorer,
        }
    }

    /// Point the source at another endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn parse_item(&self, item: &Value, keyword: &str) -> Option<CandidateRecord> {
        let id = item.get("id").and_then(|i| i.as_i64())?;
        let title = |kind: &str| {
            item.pointer(&format!("/title/{}", kind))
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let mut record = CandidateRecord::new(self.name())
            .with_id(keys::ANILIST, id.to_string())
            .with_name(title("romaji"))
            .with_localized_a(title("english"))
            .with_localized_b(title("native"));

        if !record.has_title() {
            return None;
        }

        let year = item
            .pointer("/startDate/year")
            .and_then(|y| y.as_i64())
            .and_then(|y| i32::try_from(y).ok());
        let month = item
            .pointer("/startDate/month")
            .and_then(|m| m.as_u64())
            .and_then(|m| u32::try_from(m).ok());
        record = record.with_date(year, month);

        if let Some(studio) = item
            .pointer("/studios/nodes/0/name")
            .and_then(|n| n.as_str())
        {
            record = record.with_studio(studio);
        }

        let director = item
            .pointer("/staff/edges")
            .and_then(|e| e.as_array())
            .and_then(|edges| {
                edges
                    .iter()
                    .find(|e| e.get("role").and_then(|r| r.as_str()) == Some("Director"))
            })
            .and_then(|e| e.pointer("/node/name/full"))
            .and_then(|n| n.as_str());
        if let Some(director) = director {
            record = record.with_director(director);
        }

        if let Some(source) = item.get("source").and_then(|s| s.as_str()) {
            record = record.with_source_type(source_type_label(source));
        }

        if let Some(score) = item.get("meanScore").and_then(|s| s.as_f64()) {
            if score > 0.0 {
                record = record.with_rating(keys::ANILIST, score / 10.0);
            }
        }

        if let Some(description) = item.get("description").and_then(|d| d.as_str()) {
            record = record.with_summary(&HTML_TAG.replace_all(description, ""));
        }

        let confidence = self.scorer.keyword_confidence(keyword, &record.names());
        Some(record.with_confidence(confidence))
    }
}

/// Broadcast season for a start month
fn season_for_month(month: u32) -> Option<&'static str> {
    match month {
        12 | 1 | 2 => Some("WINTER"),
        3..=5 => Some("SPRING"),
        6..=8 => Some("SUMMER"),
        9..=11 => Some("FALL"),
        _ => None,
    }
}

/// AniList files December premieres under the following year's winter.
fn season_year(year: i32, month: Option<u32>) -> i32 {
    if month == Some(12) {
        year + 1
    } else {
        year
    }
}

#[async_trait::async_trait]
impl SourceSearcher for AniList {
    fn name(&self) -> &str {
        "anilist"
    }

    fn id_key(&self) -> &str {
        keys::ANILIST
    }

    fn request(&self, query: &SourceQuery) -> Result<SourceRequest, SourceError> {
        let mut variables = Map::new();
        variables.insert("search".to_string(), json!(query.keyword));
        variables.insert("type".to_string(), json!("ANIME"));
        let season = query.filters.month.and_then(season_for_month);
        if let Some(year) = query.filters.year {
            variables.insert("year".to_string(), json!(season_year(year, query.filters.month)));
        }
        if let Some(season) = season {
            variables.insert("season".to_string(), json!(season));
        }

        Ok(SourceRequest::post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(json!({
                "query": SEARCH_QUERY,
                "variables": Value::Object(variables),
            })))
    }

    fn response(
        &self,
        response: SourceResponse,
        query: &SourceQuery,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let json = response.json()?;

        if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
            if json.pointer("/data/Page").map_or(true, Value::is_null) {
                let message = errors
                    .first()
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("graphql error");
                return Err(SourceError::Parse(message.to_string()));
            }
        }

        let media = json
            .pointer("/data/Page/media")
            .and_then(|m| m.as_array())
            .cloned()
            .unwrap_or_default();

        let results: Vec<CandidateRecord> = media
            .iter()
            .filter_map(|item| self.parse_item(item, &query.keyword))
            .collect();

        debug!("anilist returned {} candidates for '{}'", results.len(), query.keyword);
        Ok(results)
    }
}
