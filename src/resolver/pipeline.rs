//! Resolver entry point

use super::alias::AliasTable;
use super::cluster::cluster_and_merge;
use super::enrich::Enricher;
use super::filter::filter_and_boost;
use super::matcher::TitleMatcher;
use crate::config::Settings;
use crate::error::ResolveError;
use crate::lookup::{
    apply_id_mapping, apply_score_fallback, IdMapper, JsonIdMapper, JsonScoreIndex, ScoreIndex,
};
use crate::metrics::SourceMetrics;
use crate::network::HttpClient;
use crate::records::{CanonicalRecord, MatchMode, QueryFilters};
use crate::search::{CallDiagnostics, ExecutionMode, QueryOrchestrator, Timing, UnresponsiveSource};
use crate::similarity::{Embedder, EmbeddingService, SimilarityScorer};
use crate::sources::{SourceLoader, SourceRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// One resolution request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub keyword: String,
    #[serde(default)]
    pub filters: QueryFilters,
    /// Falls back to the configured default mode
    pub mode: Option<MatchMode>,
    /// Falls back to the configured default limit
    pub top_n: Option<usize>,
}

impl ResolveRequest {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }
}

/// Ranked records plus what happened to each source call
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveOutcome {
    pub records: Vec<CanonicalRecord>,
    pub timings: Vec<Timing>,
    pub unresponsive: Vec<UnresponsiveSource>,
}

impl ResolveOutcome {
    /// Records as field maps, in rank order
    pub fn field_maps(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.records.iter().map(CanonicalRecord::to_field_map).collect()
    }
}

/// Resolves free-text anime titles across the configured sources.
///
/// Cheap to clone; clones share the concurrency permits, metrics,
/// similarity caches and lookups.
#[derive(Clone)]
pub struct Resolver {
    settings: Arc<Settings>,
    orchestrator: QueryOrchestrator,
    scorer: Arc<SimilarityScorer>,
    matcher: TitleMatcher,
    id_mapper: Option<Arc<dyn IdMapper>>,
    score_index: Option<Arc<dyn ScoreIndex>>,
    execution: ExecutionMode,
}

impl Resolver {
    /// Build everything from settings: sources, aliases, local lookups and
    /// the configured embedding model.
    pub fn from_settings(settings: Settings) -> Self {
        let scorer = SimilarityScorer::new(&settings.similarity);
        Self::with_scorer(settings, scorer)
    }

    /// Like [`from_settings`](Self::from_settings), with `embedder` used for
    /// embedding similarity instead of the configured model.
    pub fn from_settings_with_embedder(settings: Settings, embedder: Arc<dyn Embedder>) -> Self {
        let scorer = SimilarityScorer::new(&settings.similarity)
            .with_embeddings(EmbeddingService::with_model(embedder));
        Self::with_scorer(settings, scorer)
    }

    fn with_scorer(settings: Settings, scorer: SimilarityScorer) -> Self {
        let scorer = Arc::new(scorer);
        let registry = SourceLoader::load(&settings, scorer.clone());

        let id_mapper = settings.lookup.id_map_path.as_ref().and_then(|path| {
            match JsonIdMapper::from_file(path) {
                Ok(mapper) => Some(Arc::new(mapper) as Arc<dyn IdMapper>),
                Err(e) => {
                    warn!("Id mapping unavailable: {}", e);
                    None
                }
            }
        });
        let score_index = settings
            .lookup
            .score_index_path
            .as_ref()
            .map(|path| Arc::new(JsonScoreIndex::new([path.clone()])) as Arc<dyn ScoreIndex>);
        let aliases = AliasTable::from_settings(&settings.aliases);

        let mut resolver = Self::with_registry(settings, registry, scorer).with_aliases(aliases);
        resolver.id_mapper = id_mapper;
        resolver.score_index = score_index;
        resolver
    }

    /// Build around an existing registry and scorer. No aliases or lookups
    /// are attached.
    pub fn with_registry(
        settings: Settings,
        registry: SourceRegistry,
        scorer: Arc<SimilarityScorer>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.concurrency.max_in_flight.max(1)));
        let metrics = Arc::new(SourceMetrics::new());
        let orchestrator =
            QueryOrchestrator::from_settings(&settings, Arc::new(registry), permits, metrics);
        let matcher = TitleMatcher::new(scorer.clone(), Arc::new(AliasTable::empty()));
        let execution = settings.concurrency.mode;

        Self {
            settings: Arc::new(settings),
            orchestrator,
            scorer,
            matcher,
            id_mapper: None,
            score_index: None,
            execution,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.matcher = TitleMatcher::new(self.scorer.clone(), Arc::new(aliases));
        self
    }

    pub fn with_id_mapper(mut self, mapper: Arc<dyn IdMapper>) -> Self {
        self.id_mapper = Some(mapper);
        self
    }

    pub fn with_score_index(mut self, index: Arc<dyn ScoreIndex>) -> Self {
        self.score_index = Some(index);
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.orchestrator.registry()
    }

    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        self.orchestrator.metrics()
    }

    /// Resolve a query, driving source calls in the configured mode.
    pub async fn resolve(&self, request: ResolveRequest) -> Result<ResolveOutcome, ResolveError> {
        self.run(request, self.execution).await
    }

    /// Resolve on a private current-thread runtime, one source call at a
    /// time. Must not be called from inside an async runtime.
    pub fn resolve_blocking(&self, request: ResolveRequest) -> Result<ResolveOutcome, ResolveError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ResolveError::Runtime(
                "resolve_blocking called inside an async runtime".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ResolveError::Runtime(e.to_string()))?;
        runtime.block_on(self.run(request, ExecutionMode::Sequential))
    }

    async fn run(
        &self,
        request: ResolveRequest,
        execution: ExecutionMode,
    ) -> Result<ResolveOutcome, ResolveError> {
        let keyword = request.keyword.trim();
        if keyword.is_empty() {
            return Err(ResolveError::InvalidInput(
                "keyword must not be empty".to_string(),
            ));
        }
        let filters = request.filters.sanitized();
        let mode = request.mode.unwrap_or(self.settings.resolver.default_mode);
        let top_n = request.top_n.unwrap_or(self.settings.resolver.default_top_n);

        let client = HttpClient::with_settings(&self.settings.outgoing)
            .map_err(|e| ResolveError::Client(e.to_string()))?;
        let diagnostics = CallDiagnostics::new();
        let start = Instant::now();
        self.metrics().inc_resolve();
        info!("Resolving '{}' (mode: {}, {:?})", keyword, mode, execution);

        let pool = self
            .orchestrator
            .gather(&client, keyword, &filters, execution, &diagnostics)
            .await;
        let mut records = cluster_and_merge(
            &pool,
            &self.matcher,
            mode,
            self.settings.resolver.merge_bonus,
        );
        debug!("{} candidates merged into {} records", pool.len(), records.len());

        if let Some(mapper) = &self.id_mapper {
            apply_id_mapping(mapper.as_ref(), &mut records);
        }

        let enricher = Enricher::new(
            &self.orchestrator,
            &self.scorer,
            &self.settings.enrichment,
            &client,
            &diagnostics,
            &filters,
        );
        let enriched = enricher.enrich(&mut records, execution).await;
        if enriched > 0 {
            debug!("Enriched {} records", enriched);
            if let Some(mapper) = &self.id_mapper {
                apply_id_mapping(mapper.as_ref(), &mut records);
            }
        }

        let mut records = filter_and_boost(records, &filters);
        records.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        records.truncate(top_n);

        if let Some(index) = &self.score_index {
            apply_score_fallback(index.as_ref(), &mut records);
        }

        info!(
            "Resolved '{}' to {} records in {:?} ({} calls, {} unresponsive)",
            keyword,
            records.len(),
            start.elapsed(),
            diagnostics.call_count(),
            diagnostics.unresponsive().len()
        );

        Ok(ResolveOutcome {
            records,
            timings: diagnostics.timings(),
            unresponsive: diagnostics.unresponsive(),
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("orchestrator", &self.orchestrator)
            .field("has_id_mapper", &self.id_mapper.is_some())
            .field("has_score_index", &self.score_index.is_some())
            .field("execution", &self.execution)
            .finish()
    }
}
