//! Source registry for managing configured metadata sources

use super::traits::SourceSearcher;
use crate::config::{timeout_duration, SourceConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A registered source with its configuration
#[derive(Clone)]
pub struct RegisteredSource {
    pub searcher: Arc<dyn SourceSearcher>,
    pub config: SourceConfig,
}

impl RegisteredSource {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Effective timeout: the source's own, else `default`
    pub fn timeout(&self, default: Duration) -> Duration {
        self.config
            .timeout
            .and_then(|t| timeout_duration(t).ok())
            .unwrap_or(default)
    }
}

/// Registry of sources, in registration order
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<RegisteredSource>,
    /// Source name -> position in `sources`
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. A source registered under an existing name replaces it.
    pub fn register(&mut self, searcher: Arc<dyn SourceSearcher>, config: SourceConfig) {
        let mut config = config;
        if config.name.is_empty() {
            config.name = searcher.name().to_string();
        }
        let entry = RegisteredSource { searcher, config };

        match self.index.get(&entry.config.name) {
            Some(&pos) => self.sources[pos] = entry,
            None => {
                self.index.insert(entry.config.name.clone(), self.sources.len());
                self.sources.push(entry);
            }
        }
    }

    /// Register a source with default configuration
    pub fn register_default(&mut self, searcher: Arc<dyn SourceSearcher>) {
        let config = SourceConfig {
            name: searcher.name().to_string(),
            engine: searcher.name().to_string(),
            ..Default::default()
        };
        self.register(searcher, config);
    }

    /// Get a source by name
    pub fn get(&self, name: &str) -> Option<&RegisteredSource> {
        self.index.get(name).map(|&pos| &self.sources[pos])
    }

    /// All enabled sources, in registration order
    pub fn enabled(&self) -> Vec<&RegisteredSource> {
        self.sources.iter().filter(|s| !s.config.disabled).collect()
    }

    /// Enabled sources configured for enrichment
    pub fn enrichers(&self) -> Vec<&RegisteredSource> {
        self.enabled().into_iter().filter(|s| s.config.enrich).collect()
    }

    /// Get all source names
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Check if a source exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
