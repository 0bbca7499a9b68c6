//! Source fan-out and query expansion

use super::expansion::expansion_queries;
use super::models::{CallDiagnostics, ExecutionMode, Timing};
use crate::config::{timeout_duration, ExpansionSettings, Settings};
use crate::error::SourceError;
use crate::metrics::SourceMetrics;
use crate::network::HttpClient;
use crate::records::{CandidateRecord, QueryFilters};
use crate::sources::{RegisteredSource, SourceQuery, SourceRegistry};
use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run futures one after another or all at once, keeping submission order.
pub(crate) async fn run_all<F, T>(mode: ExecutionMode, futures: Vec<F>) -> Vec<T>
where
    F: Future<Output = T>,
{
    match mode {
        ExecutionMode::Concurrent => join_all(futures).await,
        ExecutionMode::Sequential => {
            let mut out = Vec::with_capacity(futures.len());
            for fut in futures {
                out.push(fut.await);
            }
            out
        }
    }
}

/// Fans a query out to every enabled source and pools the candidates.
///
/// Every source call holds a permit of the shared semaphore, runs under a
/// timeout and has panics caught. A failing call contributes nothing and is
/// recorded as unresponsive; it never cancels or fails its siblings.
#[derive(Clone)]
pub struct QueryOrchestrator {
    registry: Arc<SourceRegistry>,
    permits: Arc<Semaphore>,
    metrics: Arc<SourceMetrics>,
    default_timeout: Duration,
    round_deadline: Option<Duration>,
    expansion: ExpansionSettings,
}

impl QueryOrchestrator {
    pub fn new(registry: Arc<SourceRegistry>, permits: Arc<Semaphore>) -> Self {
        Self {
            registry,
            permits,
            metrics: Arc::new(SourceMetrics::new()),
            default_timeout: DEFAULT_TIMEOUT,
            round_deadline: None,
            expansion: ExpansionSettings::default(),
        }
    }

    /// Build from settings, sharing `permits` and `metrics` with the caller
    pub fn from_settings(
        settings: &Settings,
        registry: Arc<SourceRegistry>,
        permits: Arc<Semaphore>,
        metrics: Arc<SourceMetrics>,
    ) -> Self {
        let mut orchestrator = Self {
            registry,
            permits,
            metrics,
            default_timeout: DEFAULT_TIMEOUT,
            round_deadline: None,
            expansion: settings.expansion.clone(),
        };
        match timeout_duration(settings.outgoing.request_timeout) {
            Ok(timeout) => orchestrator = orchestrator.with_timeout(timeout),
            Err(e) => warn!("Using default request timeout: {}", e),
        }
        if let Some(secs) = settings.concurrency.round_deadline_secs {
            match timeout_duration(secs) {
                Ok(deadline) => orchestrator = orchestrator.with_round_deadline(deadline),
                Err(e) => warn!("Ignoring round deadline: {}", e),
            }
        }
        orchestrator
    }

    /// Set default per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the deadline for one fan-out round
    pub fn with_round_deadline(mut self, deadline: Duration) -> Self {
        self.round_deadline = Some(deadline);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }

    /// Primary fan-out plus expansion. Primary results come first in the
    /// pool, then expansion results; each source's order is preserved.
    pub async fn gather(
        &self,
        client: &HttpClient,
        keyword: &str,
        filters: &QueryFilters,
        mode: ExecutionMode,
        diagnostics: &CallDiagnostics,
    ) -> Vec<CandidateRecord> {
        let sources = self.registry.enabled();
        info!(
            "Fanning out '{}' to {} sources ({:?})",
            keyword,
            sources.len(),
            mode
        );

        let deadline = self.round_deadline.map(|d| Instant::now() + d);
        let primary_calls: Vec<_> = sources
            .iter()
            .map(|source| {
                let query = SourceQuery::new(keyword, filters.clone());
                self.call(client, source, query, deadline, diagnostics)
            })
            .collect();
        let mut pool: Vec<CandidateRecord> = run_all(mode, primary_calls)
            .await
            .into_iter()
            .flatten()
            .collect();

        if !self.expansion.enabled || self.expansion.max_queries == 0 {
            return pool;
        }

        let alternates = expansion_queries(keyword, &pool, self.expansion.max_queries);
        if alternates.is_empty() {
            return pool;
        }
        debug!("Expansion titles for '{}': {:?}", keyword, alternates);

        let deadline = self.round_deadline.map(|d| Instant::now() + d);
        let expansion_calls: Vec<_> = sources
            .iter()
            .flat_map(|source| {
                alternates
                    .iter()
                    .take(source.config.expansion_queries)
                    .map(move |alt| (*source, SourceQuery::new(alt.as_str(), filters.clone())))
            })
            .map(|(source, query)| self.call(client, source, query, deadline, diagnostics))
            .collect();

        pool.extend(run_all(mode, expansion_calls).await.into_iter().flatten());
        pool
    }

    /// Query one source through the shared permit, timeout and panic guard.
    pub async fn query_source(
        &self,
        client: &HttpClient,
        source: &RegisteredSource,
        query: SourceQuery,
        diagnostics: &CallDiagnostics,
    ) -> Vec<CandidateRecord> {
        self.call(client, source, query, None, diagnostics).await
    }

    async fn call(
        &self,
        client: &HttpClient,
        source: &RegisteredSource,
        query: SourceQuery,
        deadline: Option<Instant>,
        diagnostics: &CallDiagnostics,
    ) -> Vec<CandidateRecord> {
        let source_name = source.name().to_string();

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Semaphore closed, skipping {}", source_name);
                return Vec::new();
            }
        };

        let start = Instant::now();
        let mut limit = source.timeout(self.default_timeout);
        if let Some(deadline) = deadline {
            limit = limit.min(deadline.saturating_duration_since(start));
        }

        debug!(
            "Querying {} for '{}' with timeout {:?}",
            source_name, query.keyword, limit
        );

        let call = AssertUnwindSafe(source.searcher.search(client, &query)).catch_unwind();
        let result = match timeout(limit, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SourceError::Panicked),
            Err(_) => Err(SourceError::Timeout),
        };
        let elapsed = start.elapsed();

        match result {
            Ok(records) => {
                let records: Vec<CandidateRecord> =
                    records.into_iter().filter(|r| r.has_title()).collect();
                let time_ms = elapsed.as_millis() as u64;
                self.metrics.record_success(&source_name, time_ms);
                diagnostics.add_timing(Timing {
                    source: source_name.clone(),
                    query: query.keyword.clone(),
                    time_ms,
                    result_count: records.len(),
                });
                debug!(
                    "Source {} returned {} candidates in {:?}",
                    source_name,
                    records.len(),
                    elapsed
                );
                records
            }
            Err(e) => {
                warn!("Source {} failed for '{}': {}", source_name, query.keyword, e);
                self.metrics.record_error(&source_name, &e);
                diagnostics.add_unresponsive(source_name, query.keyword, e);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("registry", &self.registry)
            .field("available_permits", &self.permits.available_permits())
            .field("default_timeout", &self.default_timeout)
            .field("round_deadline", &self.round_deadline)
            .finish()
    }
}
