//! Optional semantic embedding similarity
//!
//! The model is an injected service: it is loaded at most once, on first
//! use, and is read-only afterwards. A missing or failing model disables
//! the feature instead of failing a query.

use super::metrics::cosine;
use super::vectors::VectorFileEmbedder;
use crate::cache::EmbeddingCache;
use crate::config::EmbeddingSettings;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, warn};

/// A text embedding model.
pub trait Embedder: Send + Sync {
    /// Short model name for logs
    fn name(&self) -> &str;

    /// Embed a single (already normalized) text.
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

type EmbedderLoader = Box<dyn Fn() -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync>;

/// Lazily initialized embedding model plus a vector cache.
pub struct EmbeddingService {
    loader: Option<EmbedderLoader>,
    model: OnceCell<Option<Arc<dyn Embedder>>>,
    cache: EmbeddingCache,
}

impl EmbeddingService {
    /// Service with no model; similarity always returns `None`.
    pub fn disabled() -> Self {
        Self {
            loader: None,
            model: OnceCell::new(),
            cache: EmbeddingCache::default(),
        }
    }

    /// Service whose model is built by `loader` on first use.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            loader: Some(Box::new(loader)),
            model: OnceCell::new(),
            cache: EmbeddingCache::default(),
        }
    }

    /// Service described by settings. The vector file is read on first use.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }
        match &settings.vectors_path {
            Some(path) => {
                let path = path.clone();
                Self::lazy(move || {
                    Ok(Arc::new(VectorFileEmbedder::from_file(&path)?) as Arc<dyn Embedder>)
                })
            }
            None => {
                warn!("embedding enabled without a vectors_path, continuing without it");
                Self::disabled()
            }
        }
    }

    /// Service wrapping an already constructed model.
    pub fn with_model(model: Arc<dyn Embedder>) -> Self {
        let service = Self::disabled();
        // A fresh cell cannot be occupied yet
        let _ = service.model.set(Some(model));
        service
    }

    fn model(&self) -> Option<&Arc<dyn Embedder>> {
        self.model
            .get_or_init(|| {
                let loader = self.loader.as_ref()?;
                match loader() {
                    Ok(model) => {
                        debug!(model = model.name(), "embedding model loaded");
                        Some(model)
                    }
                    Err(e) => {
                        warn!("embedding model unavailable, continuing without it: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether a model is (or can be) loaded.
    pub fn is_available(&self) -> bool {
        self.model().is_some()
    }

    fn vector(&self, model: &Arc<dyn Embedder>, text: &str) -> Option<Arc<Vec<f32>>> {
        if let Some(vector) = self.cache.get(text) {
            return Some(vector);
        }
        match model.embed(text) {
            Ok(vector) => {
                let vector = Arc::new(vector);
                self.cache.set(text.to_string(), vector.clone());
                Some(vector)
            }
            Err(e) => {
                debug!(model = model.name(), "embedding failed: {}", e);
                None
            }
        }
    }

    /// Cosine similarity of two normalized titles, if computable.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let model = self.model()?;
        let va = self.vector(model, a)?;
        let vb = self.vector(model, b)?;
        cosine(&va, &vb)
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("has_loader", &self.loader.is_some())
            .field("initialized", &self.model.get().is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// Embedder backed by a fixed lookup table; unknown text fails.
    pub struct TableEmbedder {
        pub vectors: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    impl Embedder for TableEmbedder {
        fn name(&self) -> &str {
            "table"
        }

        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no vector for {}", text))
        }
    }
}
