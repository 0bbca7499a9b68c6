//! Pooled HTTP client for source calls

use crate::config::{timeout_duration, OutgoingSettings, ProxySettings};
use crate::error::SourceError;
use crate::sources::{HttpMethod, SourceRequest, SourceResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::warn;

/// Connection-pooled client created once per resolve call.
///
/// Default headers (user agent, `Accept: application/json` and any
/// configured extras) are installed on the underlying client, so every
/// source request carries them.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
    user_agent: String,
}

fn proxies(settings: &ProxySettings) -> reqwest::Result<Vec<Proxy>> {
    if let Some(all) = &settings.all {
        return Ok(vec![Proxy::all(all)?]);
    }
    let mut proxies = Vec::new();
    if let Some(http) = &settings.http {
        proxies.push(Proxy::http(http)?);
    }
    if let Some(https) = &settings.https {
        proxies.push(Proxy::https(https)?);
    }
    Ok(proxies)
}

fn default_headers(settings: &OutgoingSettings) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&settings.user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (name, value) in &settings.extra_headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Ignoring invalid extra header '{}'", name),
        }
    }
    Ok(headers)
}

impl HttpClient {
    /// Client with default outgoing settings
    pub fn new() -> anyhow::Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    pub fn with_settings(settings: &OutgoingSettings) -> anyhow::Result<Self> {
        let timeout = timeout_duration(settings.request_timeout)?;
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .default_headers(default_headers(settings)?)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .gzip(true)
            .brotli(true);
        for proxy in proxies(&settings.proxies)? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            inner: builder.build()?,
            timeout,
            user_agent: settings.user_agent.clone(),
        })
    }

    /// Send a source request under the client's default timeout
    pub async fn execute(&self, request: SourceRequest) -> Result<SourceResponse, SourceError> {
        self.execute_with_timeout(request, self.timeout).await
    }

    /// Send a source request. Non-success statuses are returned, not raised;
    /// callers decide through [`SourceResponse::json`].
    pub async fn execute_with_timeout(
        &self,
        request: SourceRequest,
        timeout: Duration,
    ) -> Result<SourceResponse, SourceError> {
        let SourceRequest {
            url,
            method,
            headers,
            params,
            json,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => self.inner.get(&url),
            HttpMethod::Post => self.inner.post(&url),
        }
        .timeout(timeout);
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        if !params.is_empty() {
            builder = builder.query(&params);
        }
        if let Some(body) = &json {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        Ok(SourceResponse {
            status,
            text: response.text().await?,
            url: final_url,
        })
    }

    pub async fn get(&self, url: &str) -> Result<SourceResponse, SourceError> {
        self.execute(SourceRequest::get(url)).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<SourceResponse, SourceError> {
        self.execute(SourceRequest::post(url).json(body)).await
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
