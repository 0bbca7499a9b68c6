//! Alternate-title query expansion

use crate::records::CandidateRecord;
use crate::text::{has_cjk, normalize};
use std::collections::HashSet;

/// Alternate titles worth re-querying, taken from primary-round candidates.
///
/// Titles are deduplicated by normalized form; the keyword itself and
/// titles shorter than two characters after normalization are skipped.
/// Titles written in a different script than the keyword come first.
pub fn expansion_queries(keyword: &str, candidates: &[CandidateRecord], max: usize) -> Vec<String> {
    let keyword_norm = normalize(keyword);
    let keyword_cjk = has_cjk(keyword);

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(keyword_norm);

    let mut cross_script = Vec::new();
    let mut same_script = Vec::new();

    for title in candidates.iter().flat_map(|c| c.names()) {
        let norm = normalize(title);
        if norm.chars().count() < 2 || !seen.insert(norm) {
            continue;
        }
        if has_cjk(title) != keyword_cjk {
            cross_script.push(title.to_string());
        } else {
            same_script.push(title.to_string());
        }
    }

    cross_script
        .into_iter()
        .chain(same_script)
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(names: &[&str]) -> CandidateRecord {
        let mut record = CandidateRecord::new("test");
        if let Some(n) = names.first() {
            record = record.with_name(*n);
        }
        if let Some(n) = names.get(1) {
            record = record.with_localized_a(*n);
        }
        if let Some(n) = names.get(2) {
            record = record.with_localized_b(*n);
        }
        record
    }

    #[test]
    fn test_cross_script_titles_first() {
        let candidates = vec![
            candidate(&["Sousou no Frieren", "Frieren: Beyond Journey's End", "葬送のフリーレン"]),
            candidate(&["Frieren", "葬送的芙莉莲"]),
        ];
        let queries = expansion_queries("Frieren", &candidates, 6);

        assert_eq!(
            queries,
            vec![
                "葬送のフリーレン",
                "葬送的芙莉莲",
                "Sousou no Frieren",
                "Frieren: Beyond Journey's End",
            ]
        );
    }

    #[test]
    fn test_dedup_skip_keyword_and_cap() {
        let candidates = vec![
            candidate(&["Frieren (TV)", "FRIEREN", "x"]),
            candidate(&["A1", "B2", "C3"]),
            candidate(&["D4", "E5", "F6"]),
            candidate(&["G7"]),
        ];
        let queries = expansion_queries("frieren", &candidates, 6);

        assert_eq!(queries, vec!["A1", "B2", "C3", "D4", "E5", "F6"]);
        assert!(expansion_queries("frieren", &candidates, 0).is_empty());
    }

    #[test]
    fn test_cjk_keyword_prefers_latin_titles() {
        let candidates = vec![candidate(&["進撃の巨人", "Attack on Titan"])];
        let queries = expansion_queries("进击的巨人", &candidates, 6);
        assert_eq!(queries, vec!["Attack on Titan", "進撃の巨人"]);
    }
}
