//! Metrics collection module
//!
//! Tracks source response times, failure rates and resolve counts across
//! every call made through one resolver.

use crate::error::SourceError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Response times kept per source
const RESPONSE_WINDOW: usize = 100;

/// Process-wide source metrics
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Total resolve count
    total_resolves: AtomicU64,
    /// Calls per source
    calls: RwLock<HashMap<String, u64>>,
    /// Recent response times per source, in ms
    response_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Failure counts per source and kind
    errors: RwLock<HashMap<String, HashMap<&'static str, u64>>>,
    /// Success counts per source
    successes: RwLock<HashMap<String, u64>>,
}

impl SourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment total resolve count
    pub fn inc_resolve(&self) {
        self.total_resolves.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed source call
    pub fn record_success(&self, source: &str, time_ms: u64) {
        self.record_call(source);
        {
            let mut times = self
                .response_times
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let entry = times.entry(source.to_string()).or_default();
            if entry.len() >= RESPONSE_WINDOW {
                entry.remove(0);
            }
            entry.push(time_ms);
        }
        let mut successes = self.successes.write().unwrap_or_else(PoisonError::into_inner);
        *successes.entry(source.to_string()).or_insert(0) += 1;
    }

    /// Record a failed source call
    pub fn record_error(&self, source: &str, error: &SourceError) {
        self.record_call(source);
        let mut errors = self.errors.write().unwrap_or_else(PoisonError::into_inner);
        *errors
            .entry(source.to_string())
            .or_default()
            .entry(error_kind(error))
            .or_insert(0) += 1;
    }

    fn record_call(&self, source: &str) {
        let mut calls = self.calls.write().unwrap_or_else(PoisonError::into_inner);
        *calls.entry(source.to_string()).or_insert(0) += 1;
    }

    pub fn total_resolves(&self) -> u64 {
        self.total_resolves.load(Ordering::Relaxed)
    }

    /// Average response time for a source
    pub fn avg_response_time(&self, source: &str) -> Option<u64> {
        let times = self.response_times.read().unwrap_or_else(PoisonError::into_inner);
        times.get(source).and_then(|t| {
            if t.is_empty() {
                None
            } else {
                Some(t.iter().sum::<u64>() / t.len() as u64)
            }
        })
    }

    /// Share of successful calls, in percent
    pub fn reliability(&self, source: &str) -> f64 {
        let successes = self.successes.read().unwrap_or_else(PoisonError::into_inner);
        let calls = self.calls.read().unwrap_or_else(PoisonError::into_inner);

        let success_count = *successes.get(source).unwrap_or(&0);
        let total = *calls.get(source).unwrap_or(&0);
        if total == 0 {
            100.0
        } else {
            (success_count as f64 / total as f64) * 100.0
        }
    }

    /// Snapshot of every source seen so far
    pub fn source_stats(&self) -> HashMap<String, SourceStats> {
        let calls = self.calls.read().unwrap_or_else(PoisonError::into_inner).clone();
        let errors = self.errors.read().unwrap_or_else(PoisonError::into_inner).clone();

        calls
            .into_iter()
            .map(|(source, count)| {
                let stats = SourceStats {
                    calls: count,
                    avg_response_time: self.avg_response_time(&source),
                    reliability: self.reliability(&source),
                    errors: errors.get(&source).cloned().unwrap_or_default(),
                };
                (source, stats)
            })
            .collect()
    }
}

fn error_kind(error: &SourceError) -> &'static str {
    match error {
        SourceError::Timeout => "timeout",
        SourceError::Network(_) => "network",
        SourceError::HttpStatus(_) => "http_status",
        SourceError::Parse(_) => "parse",
        SourceError::Panicked => "panicked",
    }
}

/// Statistics for a single source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub calls: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
    pub errors: HashMap<&'static str, u64>,
}
