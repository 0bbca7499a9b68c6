//! Jikan source implementation
//!
//! Unofficial MyAnimeList REST API. Records carry MAL ids.

use super::traits::*;
use super::{parse_year_month, source_type_label, value_str};
use crate::error::SourceError;
use crate::records::{keys, CandidateRecord};
use crate::similarity::SimilarityScorer;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Entry types kept; music videos, specials and the like are dropped
const ALLOWED_TYPES: &[&str] = &["TV", "Movie", "OVA", "ONA"];

/// Jikan anime search
pub struct Jikan {
    api_url: String,
    scorer: Arc<SimilarityScorer>,
}

impl Jikan {
    pub fn new(scorer: Arc<SimilarityScorer>) -> Self {
        Self {
            api_url: "https://api.jikan.moe/v4".to_string(),
            scorer,
        }
    }

    /// Point the source at another API root
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_item(&self, item: &Value, keyword: &str) -> Option<CandidateRecord> {
        let id = item.get("mal_id").and_then(|i| i.as_i64())?;
        let titles = item
            .get("titles")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        let primary = titles
            .first()
            .map(|t| value_str(t, "title"))
            .unwrap_or_else(|| value_str(item, "title"));

        let mut record = CandidateRecord::new(self.name())
            .with_id(keys::MAL, id.to_string())
            .with_name(primary);

        for title in &titles {
            match title.get("type").and_then(|t| t.as_str()) {
                Some("Japanese") => record = record.with_localized_b(value_str(title, "title")),
                Some("English") => record = record.with_localized_a(value_str(title, "title")),
                _ => {}
            }
        }

        if !record.has_title() {
            return None;
        }

        let aired_from = item
            .pointer("/aired/from")
            .and_then(|f| f.as_str())
            .unwrap_or_default();
        let (year, month) = parse_year_month(aired_from);
        record = record.with_date(year, month);

        if let Some(studio) = item.pointer("/studios/0/name").and_then(|n| n.as_str()) {
            record = record.with_studio(studio);
        }

        if let Some(source) = item.get("source").and_then(|s| s.as_str()) {
            record = record.with_source_type(source_type_label(source));
        }

        if let Some(score) = item.get("score").and_then(|s| s.as_f64()) {
            record = record.with_rating(keys::MAL, score);
        }

        record = record.with_summary(&value_str(item, "synopsis"));

        let confidence = self.scorer.keyword_confidence(keyword, &record.names());
        Some(record.with_confidence(confidence))
    }
}

/// Whether the entry's type is one of the kept kinds. Untyped entries pass.
fn is_allowed_type(item: &Value) -> bool {
    match item.get("type").and_then(|t| t.as_str()).map(str::trim) {
        None | Some("") => true,
        Some(kind) => ALLOWED_TYPES.contains(&kind),
    }
}

/// Jikan's own date filters are too strict; drop entries more than a year off instead.
fn within_year(item: &Value, year: Option<i32>) -> bool {
    let Some(year) = year else {
        return true;
    };
    let aired_from = item
        .pointer("/aired/from")
        .and_then(|f| f.as_str())
        .unwrap_or_default();
    match parse_year_month(aired_from).0 {
        Some(item_year) => (item_year - year).abs() <= 1,
        None => true,
    }
}

#[async_trait::async_trait]
impl SourceSearcher for Jikan {
    fn name(&self) -> &str {
        "jikan"
    }

    fn id_key(&self) -> &str {
        keys::MAL
    }

    fn request(&self, query: &SourceQuery) -> Result<SourceRequest, SourceError> {
        Ok(SourceRequest::get(format!("{}/anime", self.api_url))
            .param("q", query.keyword.clone())
            .param("sfw", "true")
            .param("limit", "25")
            .param("order_by", "popularity")
            .param("sort", "desc"))
    }

    fn response(
        &self,
        response: SourceResponse,
        query: &SourceQuery,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let json = response.json()?;

        let items = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| SourceError::Parse("missing data array".to_string()))?;

        let results: Vec<CandidateRecord> = items
            .iter()
            .filter(|item| is_allowed_type(item))
            .filter(|item| within_year(item, query.filters.year))
            .filter_map(|item| self.parse_item(item, &query.keyword))
            .collect();

        debug!("jikan returned {} candidates for '{}'", results.len(), query.keyword);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::QueryFilters;
    use serde_json::json;

    fn source() -> Jikan {
        Jikan::new(Arc::new(SimilarityScorer::default()))
    }

    fn ok(body: Value) -> SourceResponse {
        SourceResponse {
            status: 200,
            text: body.to_string(),
            url: String::new(),
        }
    }

    fn entry(id: i64, kind: &str, aired: &str, title: &str) -> Value {
        json!({
            "mal_id": id,
            "type": kind,
            "titles": [{"type": "Default", "title": title}],
            "aired": {"from": aired},
        })
    }

    #[test]
    fn test_request_params() {
        let request = source().request(&SourceQuery::simple("Frieren")).unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.url.ends_with("/v4/anime"));
        assert!(request.params.contains(&("q".to_string(), "Frieren".to_string())));
        assert!(request.params.contains(&("limit".to_string(), "25".to_string())));
    }

    #[test]
    fn test_parse_response() {
        let body = json!({"data": [{
            "mal_id": 52991,
            "type": "TV",
            "titles": [
                {"type": "Default", "title": "Sousou no Frieren"},
                {"type": "Japanese", "title": "葬送のフリーレン"},
                {"type": "English", "title": "Frieren: Beyond Journey's End"}
            ],
            "aired": {"from": "2023-09-29T00:00:00+00:00"},
            "studios": [{"name": "Madhouse"}],
            "source": "Manga",
            "score": 9.31,
            "synopsis": "During their decade-long quest to defeat the Demon King..."
        }]});
        let records = source()
            .response(ok(body), &SourceQuery::simple("Sousou no Frieren"))
            .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.origin, "jikan");
        assert_eq!(r.id_for(keys::MAL), Some("52991"));
        assert_eq!(r.name.as_deref(), Some("Sousou no Frieren"));
        assert_eq!(r.name_localized_a.as_deref(), Some("Frieren: Beyond Journey's End"));
        assert_eq!(r.name_localized_b.as_deref(), Some("葬送のフリーレン"));
        assert_eq!((r.year, r.month), (Some(2023), Some(9)));
        assert_eq!(r.studio.as_deref(), Some("Madhouse"));
        assert_eq!(r.source_type.as_deref(), Some("manga"));
        assert_eq!(r.ratings.get(keys::MAL), Some(&9.31));
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn test_type_and_year_filtering() {
        let body = json!({"data": [
            entry(1, "TV", "2023-10-01T00:00:00+00:00", "Keep"),
            entry(2, "Music", "2023-10-01T00:00:00+00:00", "Music video"),
            entry(3, "Movie", "2020-01-01T00:00:00+00:00", "Too old"),
            entry(4, "ONA", "2024-01-01T00:00:00+00:00", "Next year"),
        ]});
        let query = SourceQuery::new("Keep", QueryFilters::new().with_year(2023));
        let records = source().response(ok(body), &query).unwrap();

        let ids: Vec<_> = records.iter().filter_map(|r| r.id_for(keys::MAL)).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_missing_data_is_parse_error() {
        let err = source()
            .response(ok(json!({"status": 500})), &SourceQuery::simple("x"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
