//! Embedder backed by a file of precomputed title vectors

use super::embedding::Embedder;
use crate::error::ConfigError;
use crate::text::normalize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Looks titles up in a JSON object of `title -> [f32, ...]`.
///
/// Keys are normalized on load, so lookups use the same form the scorer
/// passes in. Titles missing from the file fail to embed.
#[derive(Debug, Default)]
pub struct VectorFileEmbedder {
    name: String,
    vectors: HashMap<String, Vec<f32>>,
}

impl VectorFileEmbedder {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut embedder = Self::from_json_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(stem) = path.file_stem() {
            embedder.name = stem.to_string_lossy().into_owned();
        }
        info!("Loaded {} title vectors from {}", embedder.len(), path.display());
        Ok(embedder)
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Vec<f32>> = serde_json::from_str(content)?;
        let mut vectors = HashMap::with_capacity(raw.len());
        for (title, vector) in raw {
            let key = normalize(&title);
            if key.is_empty() || vector.is_empty() {
                continue;
            }
            vectors.entry(key).or_insert(vector);
        }
        Ok(Self {
            name: "vectors".to_string(),
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Embedder for VectorFileEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no vector for '{}'", text))
    }
}
