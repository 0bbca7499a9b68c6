//! Backfill of missing source ids by targeted title queries

use crate::config::EnrichmentSettings;
use crate::network::HttpClient;
use crate::records::{CandidateRecord, CanonicalRecord, MatchMode, QueryFilters};
use crate::search::{run_all, CallDiagnostics, ExecutionMode, QueryOrchestrator};
use crate::similarity::SimilarityScorer;
use crate::sources::{RegisteredSource, SourceQuery};
use crate::text::normalize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// An accepted enrichment candidate for one record.
struct Accepted {
    record: usize,
    candidate: CandidateRecord,
    similarity: f64,
}

/// Runs enrichment for one resolve call. Query results are cached for the
/// lifetime of the value.
pub(crate) struct Enricher<'a> {
    orchestrator: &'a QueryOrchestrator,
    scorer: &'a SimilarityScorer,
    settings: &'a EnrichmentSettings,
    client: &'a HttpClient,
    diagnostics: &'a CallDiagnostics,
    filters: QueryFilters,
    cache: Mutex<HashMap<(String, String), Vec<CandidateRecord>>>,
}

impl<'a> Enricher<'a> {
    pub(crate) fn new(
        orchestrator: &'a QueryOrchestrator,
        scorer: &'a SimilarityScorer,
        settings: &'a EnrichmentSettings,
        client: &'a HttpClient,
        diagnostics: &'a CallDiagnostics,
        filters: &QueryFilters,
    ) -> Self {
        Self {
            orchestrator,
            scorer,
            settings,
            client,
            diagnostics,
            filters: filters.without_year(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Enrich every record from every enrichment source. Returns the number
    /// of records that gained an id.
    pub(crate) async fn enrich(&self, records: &mut [CanonicalRecord], mode: ExecutionMode) -> usize {
        if !self.settings.enabled || self.settings.max_queries == 0 {
            return 0;
        }

        let mut enriched = 0;
        for source in self.orchestrator.registry().enrichers() {
            let id_key = source.searcher.id_key().to_string();

            let lookups: Vec<_> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.id_for(&id_key).is_none())
                .map(|(i, r)| {
                    let queries = enrichment_queries(r, self.settings.max_queries);
                    let names: Vec<String> = r.names().into_iter().map(str::to_string).collect();
                    self.find_match(source, &id_key, i, queries, names)
                })
                .collect();
            if lookups.is_empty() {
                continue;
            }

            for accepted in run_all(mode, lookups).await.into_iter().flatten() {
                if let Some(record) = records.get_mut(accepted.record) {
                    apply(record, source.name(), &id_key, &accepted);
                    enriched += 1;
                }
            }
        }
        enriched
    }

    async fn find_match(
        &self,
        source: &RegisteredSource,
        id_key: &str,
        record: usize,
        queries: Vec<String>,
        names: Vec<String>,
    ) -> Option<Accepted> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        for query in &queries {
            let results = self.cached_query(source, query).await;
            if let Some((candidate, similarity)) = self.accept(&results, &names, id_key) {
                debug!(
                    "Enrichment via {} accepted '{}' ({:.2}) for query '{}'",
                    source.name(),
                    candidate.names().first().copied().unwrap_or_default(),
                    similarity,
                    query
                );
                return Some(Accepted {
                    record,
                    candidate: candidate.clone(),
                    similarity,
                });
            }
        }
        debug!("No enrichment from {} for {:?}", source.name(), names);
        None
    }

    /// Rank 0 at the first-rank threshold, any rank at the stricter one.
    fn accept<'r>(
        &self,
        results: &'r [CandidateRecord],
        names: &[&str],
        id_key: &str,
    ) -> Option<(&'r CandidateRecord, f64)> {
        results.iter().enumerate().find_map(|(rank, candidate)| {
            candidate.id_for(id_key)?;
            let sim = self
                .scorer
                .best_title_similarity(names, &candidate.names(), MatchMode::Normal);
            let accepted = (rank == 0 && sim >= self.settings.first_rank_threshold)
                || sim >= self.settings.any_rank_threshold;
            accepted.then_some((candidate, sim))
        })
    }

    async fn cached_query(&self, source: &RegisteredSource, query: &str) -> Vec<CandidateRecord> {
        let key = (source.name().to_string(), normalize(query));
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let results = self
            .orchestrator
            .query_source(
                self.client,
                source,
                SourceQuery::new(query, self.filters.clone()),
                self.diagnostics,
            )
            .await;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, results.clone());
        results
    }
}

/// Native title first, then primary, then localized; deduplicated by
/// normalized form.
fn enrichment_queries(record: &CanonicalRecord, max: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut queries = Vec::new();
    for title in [
        &record.name_localized_b,
        &record.name,
        &record.name_localized_a,
    ]
    .into_iter()
    .flatten()
    {
        let norm = normalize(title);
        if norm.is_empty() || seen.contains(&norm) {
            continue;
        }
        seen.push(norm);
        queries.push(title.clone());
        if queries.len() >= max {
            break;
        }
    }
    queries
}

fn apply(record: &mut CanonicalRecord, source: &str, id_key: &str, accepted: &Accepted) {
    let candidate = &accepted.candidate;
    record.fill_ids(&candidate.source_ids);
    if let Some(score) = candidate.ratings.get(id_key) {
        record.ratings.entry(id_key.to_string()).or_insert(*score);
    }
    record.fill_names(candidate);
    if !record.sources.iter().any(|s| s == source) {
        record.sources.push(source.to_string());
    }
    record.confidence = record.confidence.max(accepted.similarity).min(1.0);
}
