//! Alias dictionary used as the last matching resort

use crate::config::AliasSettings;
use crate::error::ConfigError;
use crate::text::normalize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One named set of title fragments, stored normalized.
#[derive(Debug, Clone, PartialEq)]
struct AliasSet {
    name: String,
    fragments: Vec<String>,
}

/// Sets of title fragments that identify one work across scripts.
///
/// Two titles are considered the same work when both match enough
/// fragments of one set, or when both match the same long fragment.
#[derive(Debug, Clone)]
pub struct AliasTable {
    sets: Vec<AliasSet>,
    min_fragment_matches: usize,
    min_shared_fragment_chars: usize,
}

impl AliasTable {
    /// Table that never matches
    pub fn empty() -> Self {
        Self {
            sets: Vec::new(),
            min_fragment_matches: 2,
            min_shared_fragment_chars: 4,
        }
    }

    /// Build from raw sets using the default thresholds
    pub fn from_entries(entries: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table = Self::empty();
        table.extend(entries);
        table
    }

    /// Parse a YAML mapping of set name to fragment list
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let entries: Option<BTreeMap<String, Vec<String>>> = serde_yaml::from_str(content)?;
        Ok(Self::from_entries(&entries.unwrap_or_default()))
    }

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

    /// Build from settings: the file first, inline entries over it.
    ///
    /// An unreadable file is logged and skipped.
    pub fn from_settings(settings: &AliasSettings) -> Self {
        if !settings.enabled {
            return Self::empty();
        }

        let mut table = match &settings.path {
            Some(path) => match Self::from_file(path) {
                Ok(table) => {
                    info!("Loaded {} alias sets from {}", table.len(), path.display());
                    table
                }
                Err(e) => {
                    warn!("Alias table unavailable: {}", e);
                    Self::empty()
                }
            },
            None => Self::empty(),
        };
        table.extend(&settings.entries);
        table.min_fragment_matches = settings.min_fragment_matches.max(1);
        table.min_shared_fragment_chars = settings.min_shared_fragment_chars;
        table
    }

    /// Add or replace sets by name
    pub fn extend(&mut self, entries: &BTreeMap<String, Vec<String>>) {
        for (name, fragments) in entries {
            let mut normalized: Vec<String> = Vec::with_capacity(fragments.len());
            for fragment in fragments {
                let n = normalize(fragment);
                if !n.is_empty() && !normalized.contains(&n) {
                    normalized.push(n);
                }
            }
            if normalized.is_empty() {
                continue;
            }
            let set = AliasSet {
                name: name.clone(),
                fragments: normalized,
            };
            match self.sets.iter_mut().find(|s| s.name == *name) {
                Some(existing) => *existing = set,
                None => self.sets.push(set),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Whether two sets of titles name the same work by alias.
    pub fn matches(&self, a_names: &[&str], b_names: &[&str]) -> bool {
        if self.sets.is_empty() {
            return false;
        }
        let a: Vec<String> = a_names.iter().map(|n| normalize(n)).collect();
        let b: Vec<String> = b_names.iter().map(|n| normalize(n)).collect();

        for set in &self.sets {
            let hit_a: Vec<bool> = set.fragments.iter().map(|f| contains(&a, f)).collect();
            let hit_b: Vec<bool> = set.fragments.iter().map(|f| contains(&b, f)).collect();

            let count_a = hit_a.iter().filter(|h| **h).count();
            let count_b = hit_b.iter().filter(|h| **h).count();
            if count_a >= self.min_fragment_matches && count_b >= self.min_fragment_matches {
                debug!("alias set '{}' matched both titles", set.name);
                return true;
            }

            let shared_long = set
                .fragments
                .iter()
                .zip(hit_a.iter().zip(&hit_b))
                .any(|(fragment, (in_a, in_b))| {
                    *in_a && *in_b && fragment.chars().count() >= self.min_shared_fragment_chars
                });
            if shared_long {
                debug!("alias set '{}' shares a long fragment", set.name);
                return true;
            }
        }
        false
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::empty()
    }
}

fn contains(names: &[String], fragment: &str) -> bool {
    names.iter().any(|n| n.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIASES: &str = r#"
frieren: ["葬送", "frieren", "sousou"]
shingeki: ["进击", "巨人", "shingeki", "kyojin", "attack on titan"]
bleach: ["死神", "bleach"]
"#;

    #[test]
    fn test_two_fragments_on_each_side() {
        let table = AliasTable::from_yaml_str(ALIASES).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.matches(&["进击的巨人"], &["Shingeki no Kyojin"]));
    }

    #[test]
    fn test_shared_long_fragment() {
        let table = AliasTable::from_yaml_str(ALIASES).unwrap();
        assert!(table.matches(&["Bleach"], &["BLEACH 千年血戦篇"]));
        // "葬送" is shared but too short on its own
        assert!(!table.matches(&["葬送のフリーレン"], &["葬送の何か"]));
    }

    #[test]
    fn test_single_fragment_each_is_not_enough() {
        let table = AliasTable::from_yaml_str(ALIASES).unwrap();
        assert!(!table.matches(&["死神"], &["Bleach"]));
        assert!(!table.matches(&["Frieren"], &["Naruto"]));
    }

    #[test]
    fn test_settings_tuning_and_disable() {
        let mut settings = AliasSettings::default();
        settings.entries.insert(
            "bleach".to_string(),
            vec!["死神".to_string(), "bleach".to_string()],
        );
        settings.min_fragment_matches = 1;
        let loose = AliasTable::from_settings(&settings);
        assert!(loose.matches(&["死神"], &["Bleach"]));

        settings.enabled = false;
        assert!(AliasTable::from_settings(&settings).is_empty());
    }

    #[test]
    fn test_missing_file_degrades_to_inline_entries() {
        let mut settings = AliasSettings::default();
        settings.path = Some("/nonexistent/aliases.yml".into());
        settings
            .entries
            .insert("naruto".to_string(), vec!["火影".to_string(), "naruto".to_string()]);
        let table = AliasTable::from_settings(&settings);
        assert_eq!(table.len(), 1);
        assert!(matches!(
            AliasTable::from_file("/nonexistent/aliases.yml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
