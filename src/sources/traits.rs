//! Source traits and types

use crate::error::SourceError;
use crate::network::HttpClient;
use crate::records::{CandidateRecord, QueryFilters};
use async_trait::async_trait;
use std::collections::HashMap;

/// One search against one source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    /// Title to search for
    pub keyword: String,
    /// Filters the source may forward to its API
    pub filters: QueryFilters,
}

impl SourceQuery {
    pub fn new(keyword: impl Into<String>, filters: QueryFilters) -> Self {
        Self {
            keyword: keyword.into(),
            filters,
        }
    }

    /// Query without filters
    pub fn simple(keyword: impl Into<String>) -> Self {
        Self::new(keyword, QueryFilters::default())
    }
}

/// HTTP request to be made by a source
#[derive(Debug, Clone)]
pub struct SourceRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters, in order
    pub params: Vec<(String, String)>,
    /// JSON body
    pub json: Option<serde_json::Value>,
}

impl SourceRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            params: Vec::new(),
            json: None,
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add JSON body
    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.json = Some(data);
        self
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP response from a source request
#[derive(Debug)]
pub struct SourceResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
    /// Response URL (after redirects)
    pub url: String,
}

impl SourceResponse {
    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse a successful response as JSON
    pub fn json(&self) -> Result<serde_json::Value, SourceError> {
        if !self.is_success() {
            return Err(SourceError::HttpStatus(self.status));
        }
        Ok(serde_json::from_str(&self.text)?)
    }
}

/// A searchable external metadata catalog.
///
/// HTTP adapters only build a request and parse a response; the provided
/// [`search`](SourceSearcher::search) runs the round trip. Implementations
/// with no HTTP step override `search` directly.
#[async_trait]
pub trait SourceSearcher: Send + Sync {
    /// Source name, used as record origin and in logs
    fn name(&self) -> &str;

    /// Identifier namespace this source fills in `source_ids`
    fn id_key(&self) -> &str {
        self.name()
    }

    /// Build the HTTP request for a search
    fn request(&self, query: &SourceQuery) -> Result<SourceRequest, SourceError>;

    /// Parse the HTTP response into candidates, best match first
    fn response(
        &self,
        response: SourceResponse,
        query: &SourceQuery,
    ) -> Result<Vec<CandidateRecord>, SourceError>;

    /// Search the source
    async fn search(
        &self,
        client: &HttpClient,
        query: &SourceQuery,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let request = self.request(query)?;
        let response = client.execute(request).await?;
        self.response(response, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = SourceRequest::post("https://example.org/graphql")
            .header("Content-Type", "application/json")
            .param("a", "1")
            .param("b", "2")
            .json(serde_json::json!({"q": 1}));

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.params[0], ("a".to_string(), "1".to_string()));
        assert_eq!(request.params.len(), 2);
        assert!(request.json.is_some());
    }

    #[test]
    fn test_response_json_checks_status() {
        let ok = SourceResponse {
            status: 200,
            text: "{\"data\": []}".to_string(),
            url: String::new(),
        };
        assert!(ok.json().is_ok());

        let limited = SourceResponse {
            status: 429,
            text: String::new(),
            url: String::new(),
        };
        assert_eq!(limited.json().unwrap_err(), SourceError::HttpStatus(429));

        let garbage = SourceResponse {
            status: 200,
            text: "<html>".to_string(),
            url: String::new(),
        };
        assert!(matches!(garbage.json(), Err(SourceError::Parse(_))));
    }
}
