//! In-process memoization for similarity scoring
//!
//! Both caches are keyed by normalized text, so they never change what a
//! caller observes; they only avoid recomputation.

use crate::records::MatchMode;
use moka::sync::Cache;
use std::sync::Arc;

/// Memoized blended similarity scores.
///
/// Keys hold the two normalized titles in sorted order, so `(a, b)` and
/// `(b, a)` share an entry and can never disagree.
#[derive(Clone, Debug)]
pub struct SimilarityCache {
    cache: Cache<(MatchMode, String, String), f64>,
}

impl SimilarityCache {
    /// Create a new cache holding at most `max_capacity` scores
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Return the cached score for the pair or compute and store it.
    pub fn get_or_compute(
        &self,
        mode: MatchMode,
        a: &str,
        b: &str,
        compute: impl FnOnce() -> f64,
    ) -> f64 {
        self.cache.get_with(pair_key(mode, a, b), compute)
    }
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// Memoized embedding vectors keyed by normalized text.
#[derive(Clone, Debug)]
pub struct EmbeddingCache {
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn get(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        self.cache.get(text)
    }

    pub fn set(&self, text: String, vector: Arc<Vec<f32>>) {
        self.cache.insert(text, vector);
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(2048)
    }
}

fn pair_key(mode: MatchMode, a: &str, b: &str) -> (MatchMode, String, String) {
    if a <= b {
        (mode, a.to_string(), b.to_string())
    } else {
        (mode, b.to_string(), a.to_string())
    }
}
