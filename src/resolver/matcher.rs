//! Pairwise "same work" decision

use super::alias::AliasTable;
use crate::records::{CandidateRecord, MatchMode};
use crate::similarity::SimilarityScorer;
use crate::text::{contains_all_tokens, has_cjk, normalize, token_overlap};
use std::sync::Arc;

/// Decides whether two candidates describe the same work.
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    scorer: Arc<SimilarityScorer>,
    aliases: Arc<AliasTable>,
}

impl TitleMatcher {
    pub fn new(scorer: Arc<SimilarityScorer>, aliases: Arc<AliasTable>) -> Self {
        Self { scorer, aliases }
    }

    /// Shared id, then year gate, then pairwise titles, then aliases.
    pub fn same(&self, a: &CandidateRecord, b: &CandidateRecord, mode: MatchMode) -> bool {
        if a.shares_id_with(b) {
            return true;
        }

        let year_delta = match (a.year, b.year) {
            (Some(ya), Some(yb)) => Some(ya.abs_diff(yb)),
            _ => None,
        };
        if year_delta.is_some_and(|d| d > 1) {
            return false;
        }

        let a_names = a.names();
        let b_names = b.names();
        for ta in &a_names {
            for tb in &b_names {
                if self.titles_match(ta, tb, year_delta, mode) {
                    return true;
                }
            }
        }

        self.aliases.matches(&a_names, &b_names)
    }

    /// Threshold test for one title pair.
    pub fn titles_match(
        &self,
        t1: &str,
        t2: &str,
        year_delta: Option<u32>,
        mode: MatchMode,
    ) -> bool {
        let n1 = normalize(t1);
        let n2 = normalize(t2);
        if n1.is_empty() || n2.is_empty() {
            return false;
        }
        if n1 == n2 {
            return true;
        }

        let score = self.scorer.score_normalized(&n1, &n2, mode);
        if score >= match_threshold(t1, t2, &n1, &n2, year_delta, mode) {
            return true;
        }

        if token_overlap(&n1, &n2) >= 0.85 {
            return true;
        }

        if n1.chars().count() > 6 && n2.chars().count() > 6 {
            if n1.contains(&n2) || n2.contains(&n1) {
                return true;
            }
            if contains_all_tokens(&n1, &n2) || contains_all_tokens(&n2, &n1) {
                return true;
            }
        }
        false
    }
}

/// Effective similarity threshold for one title pair
pub(crate) fn match_threshold(
    t1: &str,
    t2: &str,
    n1: &str,
    n2: &str,
    year_delta: Option<u32>,
    mode: MatchMode,
) -> f64 {
    let mut threshold = if has_cjk(t1) && has_cjk(t2) { 0.80 } else { 0.86 };
    match year_delta {
        Some(0) => threshold -= 0.03,
        Some(1) => threshold -= 0.01,
        _ => {}
    }
    match mode {
        MatchMode::Strict => threshold += 0.03,
        MatchMode::Recall => threshold -= 0.03,
        MatchMode::Normal => {}
    }
    if n1.chars().count().min(n2.chars().count()) <= 4 {
        threshold += 0.06;
    }
    threshold
}
