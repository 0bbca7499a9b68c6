//! Optional local lookups applied to canonical records
//!
//! Both collaborators only ever fill missing data. A missing or unreadable
//! data file makes the lookup absent, never an error for the caller.

mod id_map;
mod score_index;

pub use id_map::JsonIdMapper;
pub use score_index::JsonScoreIndex;

use crate::records::{CanonicalRecord, Ratings, SourceIds};

/// Cross-site identifier mapping.
pub trait IdMapper: Send + Sync {
    /// All known ids for the work identified by any of `ids`.
    fn lookup_external_ids(&self, ids: &SourceIds) -> Option<SourceIds>;
}

/// Ratings found in a local score index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplementaryScores {
    pub ratings: Ratings,
}

/// Locally collected scores for works the sources do not rate.
pub trait ScoreIndex: Send + Sync {
    fn lookup(&self, record: &CanonicalRecord) -> Option<SupplementaryScores>;
}

/// Fill missing ids on every record. Returns how many ids were added.
pub fn apply_id_mapping(mapper: &dyn IdMapper, records: &mut [CanonicalRecord]) -> usize {
    records
        .iter_mut()
        .map(|record| match mapper.lookup_external_ids(&record.source_ids) {
            Some(ids) => record.fill_ids(&ids),
            None => 0,
        })
        .sum()
}

/// Fill missing ratings on every record from the index.
pub fn apply_score_fallback(index: &dyn ScoreIndex, records: &mut [CanonicalRecord]) -> usize {
    let mut filled = 0;
    for record in records.iter_mut() {
        if let Some(scores) = index.lookup(record) {
            let before = record.ratings.len();
            record.fill_ratings(&scores.ratings);
            filled += record.ratings.len() - before;
        }
    }
    filled
}

/// Map an id column name (`bgm_id`, `mal_id`, ...) to its namespace
pub(crate) fn namespace_for_column(column: &str) -> Option<&str> {
    let ns = column.strip_suffix("_id")?;
    Some(match ns {
        "bgm" | "bangumi" => crate::records::keys::BANGUMI,
        "" => return None,
        other => other,
    })
}
