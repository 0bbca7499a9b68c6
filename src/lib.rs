//! anime-resolve: cross-source anime title resolution
//!
//! Queries several metadata sources for a free-text title, clusters the
//! answers that describe the same work and merges each cluster into one
//! canonical record, ranked by confidence.

pub mod cache;
pub mod config;
pub mod error;
pub mod lookup;
pub mod metrics;
pub mod network;
pub mod records;
pub mod resolver;
pub mod search;
pub mod similarity;
pub mod sources;
pub mod text;

pub use config::Settings;
pub use error::{ConfigError, ResolveError, SourceError};
pub use records::{CandidateRecord, CanonicalRecord, MatchMode, QueryFilters};
pub use resolver::{ResolveOutcome, ResolveRequest, Resolver};
pub use search::ExecutionMode;
pub use sources::SourceSearcher;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
