//! Blended title similarity

use super::embedding::EmbeddingService;
use super::metrics::{bigram_jaccard, edit_ratio, token_set_ratio};
use crate::cache::SimilarityCache;
use crate::config::SimilaritySettings;
use crate::records::MatchMode;
use crate::text::{normalize, token_jaccard, tokenize_normalized};

/// Scores how likely two raw titles name the same work.
///
/// Four lexical metrics are computed on normalized forms, sorted, and the
/// top ones blended according to the [`MatchMode`]. An optional embedding
/// similarity can only raise the result. Scores are symmetric and cached
/// per normalized pair.
#[derive(Debug)]
pub struct SimilarityScorer {
    fuzzy_token_set: bool,
    embeddings: EmbeddingService,
    cache: SimilarityCache,
}

impl SimilarityScorer {
    pub fn new(settings: &SimilaritySettings) -> Self {
        Self {
            fuzzy_token_set: settings.fuzzy_token_set,
            embeddings: EmbeddingService::from_settings(&settings.embedding),
            cache: SimilarityCache::new(settings.cache_capacity),
        }
    }

    /// Replace the embedding service built from settings.
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = embeddings;
        self
    }

    /// Similarity of two raw titles in [0,1].
    pub fn score(&self, a: &str, b: &str, mode: MatchMode) -> f64 {
        let na = normalize(a);
        let nb = normalize(b);
        self.score_normalized(&na, &nb, mode)
    }

    /// [`score`](Self::score) for titles that are already normalized.
    pub fn score_normalized(&self, na: &str, nb: &str, mode: MatchMode) -> f64 {
        if na.is_empty() || nb.is_empty() {
            return 0.0;
        }
        if na == nb {
            return 1.0;
        }
        self.cache
            .get_or_compute(mode, na, nb, || self.compute(na, nb, mode))
    }

    fn compute(&self, na: &str, nb: &str, mode: MatchMode) -> f64 {
        let fuzzy = if self.fuzzy_token_set {
            token_set_ratio(na, nb)
        } else {
            0.0
        };
        let mut scores = [
            edit_ratio(na, nb),
            bigram_jaccard(na, nb),
            token_jaccard(&tokenize_normalized(na), &tokenize_normalized(nb)),
            fuzzy,
        ];
        scores.sort_by(|x, y| x.total_cmp(y));
        let [_, third, second, top] = scores;

        let blended = match mode {
            MatchMode::Strict => top * 0.6 + second * 0.3 + third * 0.1,
            MatchMode::Recall => top * 0.55 + second * 0.45,
            MatchMode::Normal => top * 0.65 + second * 0.35,
        };

        let score = match self.embeddings.similarity(na, nb) {
            Some(semantic) => blended.max(semantic),
            None => blended,
        };
        score.clamp(0.0, 1.0)
    }

    /// Best score over the cross product of two sets of titles.
    pub fn best_title_similarity(&self, a: &[&str], b: &[&str], mode: MatchMode) -> f64 {
        let nb: Vec<String> = b.iter().map(|t| normalize(t)).collect();
        a.iter()
            .map(|t| normalize(t))
            .flat_map(|na| {
                nb.iter()
                    .map(|nb| self.score_normalized(&na, nb, mode))
                    .collect::<Vec<_>>()
            })
            .fold(0.0, f64::max)
    }

    /// Source-local confidence of a record's titles against the query keyword.
    pub fn keyword_confidence(&self, keyword: &str, names: &[&str]) -> f64 {
        self.best_title_similarity(&[keyword], names, MatchMode::Normal)
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&SimilaritySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::embedding::test_support::TableEmbedder;
    use super::*;
    use std::sync::Arc;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_and_empty() {
        let scorer = SimilarityScorer::default();
        for title in ["Frieren", "葬送のフリーレン", "Steins;Gate 0"] {
            for mode in [MatchMode::Strict, MatchMode::Normal, MatchMode::Recall] {
                assert_eq!(scorer.score(title, title, mode), 1.0);
                assert_eq!(scorer.score(title, "", mode), 0.0);
                assert_eq!(scorer.score("", title, mode), 0.0);
            }
        }
    }

    #[test]
    fn test_normalization_applied_before_scoring() {
        let scorer = SimilarityScorer::default();
        assert_eq!(
            scorer.score("[Sub] Shingeki no Kyojin (TV)", "shingeki no kyojin season 2", MatchMode::Normal),
            1.0
        );
        assert_eq!(scorer.score("Re:Zero Ⅱ", "Re:Zero II", MatchMode::Strict), 1.0);
    }

    #[test]
    fn test_mode_blending() {
        let scorer = SimilarityScorer::default();
        // Metrics: edit 0.9, bigram 0.6, token 0, fuzzy 0.9
        assert!(approx(scorer.score("Steinsgate", "Steinsgote", MatchMode::Normal), 0.9));
        assert!(approx(scorer.score("Steinsgate", "Steinsgote", MatchMode::Recall), 0.9));
        assert!(approx(
            scorer.score("Steinsgate", "Steinsgote", MatchMode::Strict),
            0.9 * 0.6 + 0.9 * 0.3 + 0.6 * 0.1
        ));
    }

    #[test]
    fn test_fuzzy_disabled_blends_over_fewer_metrics() {
        let settings = SimilaritySettings {
            fuzzy_token_set: false,
            ..Default::default()
        };
        let scorer = SimilarityScorer::new(&settings);
        // Without the token-set ratio the second metric is the bigram index
        assert!(approx(
            scorer.score("Steinsgate", "Steinsgote", MatchMode::Normal),
            0.9 * 0.65 + 0.6 * 0.35
        ));
    }

    #[test]
    fn test_score_symmetric() {
        let scorer = SimilarityScorer::default();
        let titles = [
            "Frieren",
            "Sousou no Frieren",
            "葬送のフリーレン",
            "Shingeki no Kyojin: The Final Season",
            "Attack on Titan",
            "進撃の巨人",
            "Kaguya-sama wa Kokurasetai",
            "かぐや様は告らせたい",
            "One Piece Film: Red",
            "ONE PIECE",
            "K-On!!",
            "Re:Zero Ⅱ",
            "x",
        ];
        for a in titles {
            for b in titles {
                for mode in [MatchMode::Strict, MatchMode::Normal, MatchMode::Recall] {
                    let ab = scorer.score(a, b, mode);
                    let ba = scorer.score(b, a, mode);
                    assert_eq!(ab, ba, "asymmetric for {:?} / {:?} in {}", a, b, mode);
                    assert!((0.0..=1.0).contains(&ab));
                }
            }
        }
    }

    #[test]
    fn test_score_symmetric_with_fresh_caches() {
        // Each direction computed by its own scorer: symmetry must not rely on the cache
        let pairs = [
            ("Sousou no Frieren", "Frieren Beyond Journey's End"),
            ("鬼滅の刃", "鬼滅の刃 遊郭編"),
            ("Clannad After Story", "Clannad"),
        ];
        for (a, b) in pairs {
            let forward = SimilarityScorer::default().score(a, b, MatchMode::Strict);
            let backward = SimilarityScorer::default().score(b, a, MatchMode::Strict);
            assert_eq!(forward, backward);
        }
    }

    #[test]
    fn test_embedding_can_only_raise() {
        let embedder = TableEmbedder::new(&[
            ("frieren", vec![1.0, 0.0]),
            ("葬送のフリーレン", vec![0.96, 0.28]),
            ("steinsgate", vec![1.0, 0.0]),
            ("steinsgote", vec![0.0, 1.0]),
        ]);
        let scorer = SimilarityScorer::default()
            .with_embeddings(EmbeddingService::with_model(Arc::new(embedder)));

        let cross = scorer.score("Frieren", "葬送のフリーレン", MatchMode::Normal);
        assert!((cross - 0.96).abs() < 1e-6);

        // Orthogonal embeddings never pull a lexical match down
        assert!(approx(scorer.score("Steinsgate", "Steinsgote", MatchMode::Normal), 0.9));
    }

    #[test]
    fn test_best_title_similarity() {
        let scorer = SimilarityScorer::default();
        let best = scorer.best_title_similarity(
            &["Sousou no Frieren", "葬送のフリーレン"],
            &["Frieren: Beyond Journey's End", "葬送のフリーレン"],
            MatchMode::Normal,
        );
        assert_eq!(best, 1.0);
        assert_eq!(scorer.best_title_similarity(&[], &["Frieren"], MatchMode::Normal), 0.0);
    }
}
