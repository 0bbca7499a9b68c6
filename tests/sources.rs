//! Source adapters against a local mock HTTP server

use anime_resolve::error::SourceError;
use anime_resolve::network::HttpClient;
use anime_resolve::records::keys;
use anime_resolve::similarity::SimilarityScorer;
use anime_resolve::sources::{AniList, Bangumi, Jikan, SourceQuery, SourceSearcher};
use anime_resolve::QueryFilters;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scorer() -> Arc<SimilarityScorer> {
    Arc::new(SimilarityScorer::default())
}

#[tokio::test]
async fn test_bangumi_search_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/search/subjects"))
        .and(body_partial_json(json!({
            "keyword": "葬送のフリーレン",
            "filter": {"type": [2], "year": [2023]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": 400602,
                "name": "葬送のフリーレン",
                "name_cn": "葬送的芙莉莲",
                "date": "2023-09-29",
                "rating": {"score": 9.1},
                "infobox": [{"key": "动画制作", "value": "MADHOUSE"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = Bangumi::new(scorer()).with_base_url(server.uri());
    let client = HttpClient::new().unwrap();
    let query = SourceQuery::new("葬送のフリーレン", QueryFilters::new().with_year(2023));

    let records = source.search(&client, &query).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id_for(keys::BANGUMI), Some("400602"));
    assert_eq!(records[0].name_localized_a.as_deref(), Some("葬送的芙莉莲"));
    assert_eq!(records[0].studio.as_deref(), Some("MADHOUSE"));
    assert_eq!(records[0].month, Some(9));
    assert_eq!(records[0].confidence, 1.0);
}

#[tokio::test]
async fn test_anilist_search_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"search": "Frieren", "type": "ANIME"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"Page": {"media": [{
                "id": 154587,
                "title": {"romaji": "Sousou no Frieren", "english": "Frieren: Beyond Journey's End", "native": "葬送のフリーレン"},
                "startDate": {"year": 2023, "month": 9},
                "studios": {"nodes": [{"name": "MADHOUSE"}]},
                "staff": {"edges": []},
                "source": "MANGA",
                "meanScore": 91
            }]}}
        })))
        .mount(&server)
        .await;

    let source = AniList::new(scorer()).with_base_url(server.uri());
    let client = HttpClient::new().unwrap();

    let records = source
        .search(&client, &SourceQuery::simple("Frieren"))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id_for(keys::ANILIST), Some("154587"));
    assert_eq!(records[0].ratings.get(keys::ANILIST), Some(&9.1));
    assert_eq!(records[0].source_type.as_deref(), Some("manga"));
}

#[tokio::test]
async fn test_jikan_search_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/anime"))
        .and(query_param("q", "Sousou no Frieren"))
        .and(query_param("sfw", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "mal_id": 52991,
                    "type": "TV",
                    "titles": [
                        {"type": "Default", "title": "Sousou no Frieren"},
                        {"type": "Japanese", "title": "葬送のフリーレン"}
                    ],
                    "aired": {"from": "2023-09-29T00:00:00+00:00"},
                    "score": 9.31
                },
                {
                    "mal_id": 56885,
                    "type": "Music",
                    "titles": [{"type": "Default", "title": "Sousou no Frieren MV"}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let source = Jikan::new(scorer()).with_base_url(server.uri());
    let client = HttpClient::new().unwrap();

    let records = source
        .search(&client, &SourceQuery::simple("Sousou no Frieren"))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id_for(keys::MAL), Some("52991"));
    assert_eq!(records[0].ratings.get(keys::MAL), Some(&9.31));
    assert_eq!(source.id_key(), keys::MAL);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = Jikan::new(scorer()).with_base_url(server.uri());
    let client = HttpClient::new().unwrap();

    let err = source
        .search(&client, &SourceQuery::simple("Frieren"))
        .await
        .unwrap_err();

    assert_eq!(err, SourceError::HttpStatus(429));
}
