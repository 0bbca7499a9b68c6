//! Source loader for initializing sources from configuration

use super::registry::SourceRegistry;
use super::traits::SourceSearcher;
use super::{anilist, bangumi, jikan};
use crate::config::{Settings, SourceConfig};
use crate::similarity::SimilarityScorer;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing sources from configuration
pub struct SourceLoader;

impl SourceLoader {
    /// Load all configured sources. Unknown adapters are skipped with a warning.
    pub fn load(settings: &Settings, scorer: Arc<SimilarityScorer>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();

        for config in &settings.sources {
            if config.disabled {
                info!("Skipping disabled source: {}", config.name);
                continue;
            }

            match Self::create_source(config, scorer.clone()) {
                Ok(source) => {
                    info!("Loaded source: {} ({})", config.name, config.engine);
                    registry.register(source, config.clone());
                }
                Err(e) => {
                    warn!("Failed to load source {}: {}", config.name, e);
                }
            }
        }

        info!("Loaded {} sources", registry.len());
        registry
    }

    /// Create a source instance by adapter name
    fn create_source(
        config: &SourceConfig,
        scorer: Arc<SimilarityScorer>,
    ) -> Result<Arc<dyn SourceSearcher>> {
        let base_url = config.base_url.as_deref();
        let source: Arc<dyn SourceSearcher> = match config.engine.as_str() {
            "bangumi" => {
                let source = bangumi::Bangumi::new(scorer);
                Arc::new(match base_url {
                    Some(url) => source.with_base_url(url),
                    None => source,
                })
            }
            "anilist" => {
                let source = anilist::AniList::new(scorer);
                Arc::new(match base_url {
                    Some(url) => source.with_base_url(url),
                    None => source,
                })
            }
            "jikan" => {
                let source = jikan::Jikan::new(scorer);
                Arc::new(match base_url {
                    Some(url) => source.with_base_url(url),
                    None => source,
                })
            }
            other => {
                return Err(anyhow::anyhow!("Unknown source type: {}", other));
            }
        };

        Ok(source)
    }

    /// Get list of available source adapters
    pub fn available_sources() -> Vec<&'static str> {
        vec!["bangumi", "anilist", "jikan"]
    }
}
