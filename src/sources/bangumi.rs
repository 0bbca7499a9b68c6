//! Bangumi source implementation
//!
//! Uses the bgm.tv v0 subject search API, restricted to anime subjects.

use super::traits::*;
use super::{parse_year_month, value_str};
use crate::error::SourceError;
use crate::records::{keys, CandidateRecord};
use crate::similarity::SimilarityScorer;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const MAX_ITEMS: usize = 20;
/// Bangumi subject type for anime
const SUBJECT_TYPE_ANIME: u8 = 2;

/// Bangumi subject search
pub struct Bangumi {
    api_url: String,
    scorer: Arc<SimilarityScorer>,
}

impl Bangumi {
    pub fn new(scorer: Arc<SimilarityScorer>) -> Self {
        Self {
            api_url: "https://api.bgm.tv".to_string(),
            scorer,
        }
    }

    /// Point the source at another API root
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_item(&self, item: &Value, keyword: &str) -> Option<CandidateRecord> {
        let id = match item.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => return None,
        };

        let mut record = CandidateRecord::new(self.name())
            .with_id(keys::BANGUMI, id)
            .with_name(value_str(item, "name"))
            .with_localized_a(value_str(item, "name_cn"));

        if !record.has_title() {
            return None;
        }

        if let Some(score) = item.pointer("/rating/score").and_then(|s| s.as_f64()) {
            // Unrated subjects report 0
            if score > 0.0 {
                record = record.with_rating(keys::BANGUMI, score);
            }
        }

        let (year, month) = parse_year_month(&value_str(item, "date"));
        record = record.with_date(year, month);

        if let Some(infobox) = item.get("infobox").and_then(|i| i.as_array()) {
            for entry in infobox {
                let value = infobox_value(entry.get("value"));
                match entry.get("key").and_then(|k| k.as_str()) {
                    Some("动画制作") => record = record.with_studio(value),
                    Some("监督") => record = record.with_director(value),
                    Some("原作") => record = record.with_source_type(value),
                    _ => {}
                }
            }
        }

        record = record.with_summary(&value_str(item, "summary"));

        let confidence = self.scorer.keyword_confidence(keyword, &record.names());
        Some(record.with_confidence(confidence))
    }
}

/// Infobox values are either a string or a list of `{v: ...}` objects
fn infobox_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.get("v").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

#[async_trait::async_trait]
impl SourceSearcher for Bangumi {
    fn name(&self) -> &str {
        "bangumi"
    }

    fn id_key(&self) -> &str {
        keys::BANGUMI
    }

    fn request(&self, query: &SourceQuery) -> Result<SourceRequest, SourceError> {
        let mut filter = json!({ "type": [SUBJECT_TYPE_ANIME] });
        if let Some(year) = query.filters.year {
            filter["year"] = json!([year]);
        }
        if let Some(month) = query.filters.month {
            filter["month"] = json!([[format!("{}月", month)]]);
        }

        let body = json!({
            "keyword": query.keyword,
            "sort": "match",
            "filter": filter,
        });

        Ok(SourceRequest::post(format!("{}/v0/search/subjects", self.api_url)).json(body))
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
            .take(MAX_ITEMS)
            .filter_map(|item| {
                let record = self.parse_item(item, &query.keyword);
                if record.is_none() {
                    debug!("bangumi: skipping item without id or title");
                }
                record
            })
            .collect();

        debug!("bangumi returned {} candidates for '{}'", results.len(), query.keyword);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::QueryFilters;

    fn source() -> Bangumi {
        Bangumi::new(Arc::new(SimilarityScorer::default()))
    }

    fn ok(body: Value) -> SourceResponse {
        SourceResponse {
            status: 200,
            text: body.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn test_request_body() {
        let query = SourceQuery::new(
            "葬送のフリーレン",
            QueryFilters::new().with_year(2023).with_month(10),
        );
        let request = source().request(&query).unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("/v0/search/subjects"));
        let body = request.json.unwrap();
        assert_eq!(body["keyword"], "葬送のフリーレン");
        assert_eq!(body["sort"], "match");
        assert_eq!(body["filter"]["type"], json!([2]));
        assert_eq!(body["filter"]["year"], json!([2023]));
        assert_eq!(body["filter"]["month"], json!([["10月"]]));
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "data": [{
                "id": 400602,
                "name": "葬送のフリーレン",
                "name_cn": "葬送的芙莉莲",
                "date": "2023-09-29",
                "rating": {"score": 9.1},
                "summary": "勇者一行打倒魔王之后",
                "infobox": [
                    {"key": "动画制作", "value": "MADHOUSE"},
                    {"key": "监督", "value": "斎藤圭一郎"},
                    {"key": "原作", "value": [{"v": "山田鐘人"}, {"v": "アベツカサ"}]}
                ]
            }, {
                "id": 1,
                "name": "",
                "name_cn": ""
            }]
        });
        let query = SourceQuery::simple("葬送のフリーレン");
        let records = source().response(ok(body), &query).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.origin, "bangumi");
        assert_eq!(r.id_for(keys::BANGUMI), Some("400602"));
        assert_eq!(r.name.as_deref(), Some("葬送のフリーレン"));
        assert_eq!(r.name_localized_a.as_deref(), Some("葬送的芙莉莲"));
        assert_eq!((r.year, r.month), (Some(2023), Some(9)));
        assert_eq!(r.studio.as_deref(), Some("MADHOUSE"));
        assert_eq!(r.director.as_deref(), Some("斎藤圭一郎"));
        assert_eq!(r.source_type.as_deref(), Some("山田鐘人, アベツカサ"));
        assert_eq!(r.ratings.get(keys::BANGUMI), Some(&9.1));
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn test_parse_limits_items() {
        let items: Vec<Value> = (0..30)
            .map(|i| json!({"id": i, "name": format!("Title {}", i)}))
            .collect();
        let records = source()
            .response(ok(json!({ "data": items })), &SourceQuery::simple("Title"))
            .unwrap();
        assert_eq!(records.len(), MAX_ITEMS);
    }

    #[test]
    fn test_http_error() {
        let response = SourceResponse {
            status: 503,
            text: String::new(),
            url: String::new(),
        };
        let err = source().response(response, &SourceQuery::simple("x")).unwrap_err();
        assert_eq!(err, SourceError::HttpStatus(503));
    }
}
