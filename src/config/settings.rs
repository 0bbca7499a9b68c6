//! Settings structures for anime-resolve configuration

use crate::error::ConfigError;
use crate::records::MatchMode;
use crate::search::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Longest accepted timeout or round deadline, in seconds
pub const MAX_TIMEOUT_SECS: f64 = 3600.0;

/// Convert a configured number of seconds into a [`Duration`].
///
/// Accepts finite values in `(0, MAX_TIMEOUT_SECS]`; NaN and infinity are
/// rejected.
pub fn timeout_duration(secs: f64) -> Result<Duration, ConfigError> {
    if !(secs > 0.0 && secs <= MAX_TIMEOUT_SECS) {
        return Err(ConfigError::Invalid(format!(
            "timeout must be between 0 and {} seconds, got {}",
            MAX_TIMEOUT_SECS, secs
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Main settings structure, read from settings.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub outgoing: OutgoingSettings,
    pub concurrency: ConcurrencySettings,
    pub sources: Vec<SourceConfig>,
    pub similarity: SimilaritySettings,
    pub resolver: ResolverSettings,
    pub expansion: ExpansionSettings,
    pub enrichment: EnrichmentSettings,
    pub aliases: AliasSettings,
    pub lookup: LookupSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outgoing: OutgoingSettings::default(),
            concurrency: ConcurrencySettings::default(),
            sources: default_sources(),
            similarity: SimilaritySettings::default(),
            resolver: ResolverSettings::default(),
            expansion: ExpansionSettings::default(),
            enrichment: EnrichmentSettings::default(),
            aliases: AliasSettings::default(),
            lookup: LookupSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Merge with environment variables (PRECISE_* prefix)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PRECISE_HTTP_TIMEOUT") {
            match val.parse::<f64>() {
                Ok(secs) if timeout_duration(secs).is_ok() => self.outgoing.request_timeout = secs,
                _ => warn!("ignoring PRECISE_HTTP_TIMEOUT={:?}", val),
            }
        }
        if let Some(val) = lookup("PRECISE_HTTP_MAX_CONNECTIONS") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.outgoing.pool_maxsize = n,
                _ => warn!("ignoring PRECISE_HTTP_MAX_CONNECTIONS={:?}", val),
            }
        }
        if let Some(val) = lookup("PRECISE_QUERY_CONCURRENCY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.concurrency.max_in_flight = n,
                _ => warn!("ignoring PRECISE_QUERY_CONCURRENCY={:?}", val),
            }
        }
        if let Some(val) = lookup("PRECISE_MATCH_MODE") {
            match val.parse::<MatchMode>() {
                Ok(mode) => self.resolver.default_mode = mode,
                Err(e) => warn!("ignoring PRECISE_MATCH_MODE: {}", e),
            }
        }
    }

    /// Reject values the resolver cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "concurrency.max_in_flight must be at least 1".to_string(),
            ));
        }
        timeout_duration(self.outgoing.request_timeout).map_err(|e| {
            ConfigError::Invalid(format!("outgoing.request_timeout: {}", e))
        })?;
        if let Some(deadline) = self.concurrency.round_deadline_secs {
            timeout_duration(deadline).map_err(|e| {
                ConfigError::Invalid(format!("concurrency.round_deadline_secs: {}", e))
            })?;
        }
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if let Some(t) = source.timeout {
                timeout_duration(t).map_err(|e| {
                    ConfigError::Invalid(format!("sources.{}.timeout: {}", source.name, e))
                })?;
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Get source config by name
    pub fn get_source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Get all enabled sources
    pub fn enabled_sources(&self) -> Vec<&SourceConfig> {
        self.sources.iter().filter(|s| !s.disabled).collect()
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Max idle connections kept per host
    pub pool_maxsize: usize,
    /// User agent sent to every source
    pub user_agent: String,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 10.0,
            pool_maxsize: 10,
            user_agent: format!("anime-resolve/{}", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Fan-out limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySettings {
    /// Source calls allowed in flight at once, across all resolves
    pub max_in_flight: usize,
    /// Optional deadline for one fan-out round, in seconds
    pub round_deadline_secs: Option<f64>,
    /// How `resolve` drives source calls
    pub mode: ExecutionMode,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            round_deadline_secs: None,
            mode: ExecutionMode::Concurrent,
        }
    }
}

/// Individual source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source name (unique identifier)
    pub name: String,
    /// Source adapter to use
    pub engine: String,
    /// Whether the source is disabled
    pub disabled: bool,
    /// Custom timeout for this source, in seconds
    pub timeout: Option<f64>,
    /// How many expansion titles this source is queried with
    pub expansion_queries: usize,
    /// Whether records missing this source's id are enriched from it
    pub enrich: bool,
    /// Override of the adapter's API endpoint
    pub base_url: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            engine: String::new(),
            disabled: false,
            timeout: None,
            expansion_queries: 0,
            enrich: false,
            base_url: None,
        }
    }
}

/// Similarity scorer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilaritySettings {
    /// Include the fuzzy token-set ratio in the blend
    pub fuzzy_token_set: bool,
    /// Maximum memoized pair scores
    pub cache_capacity: u64,
    /// Optional embedding similarity
    pub embedding: EmbeddingSettings,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            fuzzy_token_set: true,
            cache_capacity: 4096,
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Embedding similarity settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub enabled: bool,
    /// JSON object mapping titles to precomputed vectors
    pub vectors_path: Option<PathBuf>,
}

/// Resolver defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Mode used when a request does not name one
    pub default_mode: MatchMode,
    /// Records returned when a request does not name a limit
    pub default_top_n: usize,
    /// Confidence bonus per additional group member
    pub merge_bonus: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            default_mode: MatchMode::Normal,
            default_top_n: 10,
            merge_bonus: 0.12,
        }
    }
}

/// Query expansion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub enabled: bool,
    /// Alternate titles collected from the primary round
    pub max_queries: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_queries: 6,
        }
    }
}

/// Enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    /// Titles tried per record and source
    pub max_queries: usize,
    /// Acceptance threshold for the top-ranked candidate
    pub first_rank_threshold: f64,
    /// Acceptance threshold for any other candidate
    pub any_rank_threshold: f64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_queries: 3,
            first_rank_threshold: 0.60,
            any_rank_threshold: 0.72,
        }
    }
}

/// Alias table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasSettings {
    pub enabled: bool,
    /// YAML file mapping a set name to its fragments
    pub path: Option<PathBuf>,
    /// Inline alias sets, merged over the file
    pub entries: BTreeMap<String, Vec<String>>,
    /// Fragments both records must match to count as the same title
    pub min_fragment_matches: usize,
    /// Minimum length of a single shared fragment that is enough on its own
    pub min_shared_fragment_chars: usize,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            entries: BTreeMap::new(),
            min_fragment_matches: 2,
            min_shared_fragment_chars: 4,
        }
    }
}

/// Optional local data files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    /// JSON array of cross-site identifier rows
    pub id_map_path: Option<PathBuf>,
    /// JSON object of locally collected scores, keyed by title
    pub score_index_path: Option<PathBuf>,
}

/// Default source configurations
fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "bangumi".to_string(),
            engine: "bangumi".to_string(),
            ..Default::default()
        },
        SourceConfig {
            name: "anilist".to_string(),
            engine: "anilist".to_string(),
            expansion_queries: 3,
            ..Default::default()
        },
        SourceConfig {
            name: "jikan".to_string(),
            engine: "jikan".to_string(),
            expansion_queries: 5,
            enrich: true,
            ..Default::default()
        },
    ]
}
