//! Title similarity scoring
//!
//! Lexical metrics, the mode-dependent blend, and the optional embedding
//! service that can raise (never lower) a blended score.

mod embedding;
pub mod metrics;
mod scorer;
mod vectors;

pub use embedding::{Embedder, EmbeddingService};
pub use scorer::SimilarityScorer;
pub use vectors::VectorFileEmbedder;

#[cfg(test)]
pub(crate) use embedding::test_support;
