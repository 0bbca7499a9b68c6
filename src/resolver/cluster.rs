//! Equivalence grouping and canonical merge

use super::matcher::TitleMatcher;
use crate::records::{CandidateRecord, CanonicalRecord, MatchMode};
use std::cmp::Ordering;
use tracing::debug;

/// Greedy single pass in arrival order. Each unassigned record seeds a
/// group and pulls in every later unassigned record that matches the seed.
///
/// Returns groups of indices into `pool`, seed first.
pub fn cluster(pool: &[CandidateRecord], matcher: &TitleMatcher, mode: MatchMode) -> Vec<Vec<usize>> {
    let mut used = vec![false; pool.len()];
    let mut groups = Vec::new();

    for i in 0..pool.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..pool.len() {
            if !used[j] && matcher.same(&pool[i], &pool[j], mode) {
                used[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }
    groups
}

fn completeness(record: &CandidateRecord) -> (usize, usize, f64) {
    (record.source_ids.len(), record.names().len(), record.confidence)
}

/// Merge one group into a canonical record.
///
/// The most complete member is the base; the others only fill what the
/// base lacks. Each extra member adds `bonus` to the best confidence.
pub fn merge(group: &[&CandidateRecord], bonus: f64) -> Option<CanonicalRecord> {
    let (first, rest) = group.split_first()?;

    let mut base = *first;
    for candidate in rest {
        let (ids, names, conf) = completeness(candidate);
        let (base_ids, base_names, base_conf) = completeness(base);
        let better = (ids, names)
            .cmp(&(base_ids, base_names))
            .then(conf.partial_cmp(&base_conf).unwrap_or(Ordering::Equal));
        if better == Ordering::Greater {
            base = candidate;
        }
    }

    let mut record = CanonicalRecord::from_candidate(base);
    for member in group {
        if !std::ptr::eq(*member, base) {
            record.absorb(member);
        }
    }

    let mut sources: Vec<String> = Vec::new();
    for member in group {
        if !sources.contains(&member.origin) {
            sources.push(member.origin.clone());
        }
    }
    record.sources = sources;

    let best = group.iter().map(|m| m.confidence).fold(0.0, f64::max);
    record.confidence = (best + bonus * (group.len() - 1) as f64).min(1.0);
    record.group_size = group.len();

    debug!(
        "Merged {} candidates into '{}' from {:?}",
        group.len(),
        record.names().first().copied().unwrap_or_default(),
        record.sources
    );
    Some(record)
}

/// Cluster the pool and merge every group, preserving group order.
pub fn cluster_and_merge(
    pool: &[CandidateRecord],
    matcher: &TitleMatcher,
    mode: MatchMode,
    bonus: f64,
) -> Vec<CanonicalRecord> {
    cluster(pool, matcher, mode)
        .iter()
        .filter_map(|group| {
            let members: Vec<&CandidateRecord> = group.iter().map(|i| &pool[*i]).collect();
            merge(&members, bonus)
        })
        .collect()
}
