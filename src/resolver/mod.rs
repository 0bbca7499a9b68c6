//! Entity resolution
//!
//! Turns the pooled candidates of a fan-out into ranked canonical records:
//! cluster, merge, map ids, enrich, filter, rank.

mod alias;
mod cluster;
mod enrich;
mod filter;
mod matcher;
mod pipeline;

pub use alias::AliasTable;
pub use cluster::{cluster, cluster_and_merge, merge};
pub use filter::{boost, filter_and_boost, passes};
pub use matcher::TitleMatcher;
pub use pipeline::{ResolveOutcome, ResolveRequest, Resolver};
