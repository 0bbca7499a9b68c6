//! JSON-backed identifier mapping

use super::{namespace_for_column, IdMapper};
use crate::error::ConfigError;
use crate::records::{keys, SourceIds};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Identifier rows loaded from a JSON array such as
/// `[{"bgm_id": 400602, "mal_id": "52991", "anidb_id": 17617}, ...]`.
///
/// Lookups try the Bangumi id first, then the MAL id. The first row seen
/// for an id wins.
#[derive(Debug, Default)]
pub struct JsonIdMapper {
    rows: Vec<SourceIds>,
    by_bangumi: HashMap<String, usize>,
    by_mal: HashMap<String, usize>,
}

impl JsonIdMapper {
    /// Load from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mapper = Self::from_json_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded {} id mapping rows from {}", mapper.len(), path.display());
        Ok(mapper)
    }

    /// Parse a JSON array of id objects. Non-object rows are skipped.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<Value> = serde_json::from_str(content)?;
        let mut mapper = Self::default();

        for entry in &entries {
            let Some(object) = entry.as_object() else {
                debug!("skipping non-object id mapping row");
                continue;
            };

            let ids: SourceIds = object
                .iter()
                .filter_map(|(column, value)| {
                    let ns = namespace_for_column(column)?;
                    let id = id_text(value)?;
                    Some((ns.to_string(), id))
                })
                .collect();
            if ids.is_empty() {
                continue;
            }

            let row = mapper.rows.len();
            if let Some(id) = ids.get(keys::BANGUMI) {
                mapper.by_bangumi.entry(id.clone()).or_insert(row);
            }
            if let Some(id) = ids.get(keys::MAL) {
                mapper.by_mal.entry(id.clone()).or_insert(row);
            }
            mapper.rows.push(ids);
        }

        Ok(mapper)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn id_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl IdMapper for JsonIdMapper {
    fn lookup_external_ids(&self, ids: &SourceIds) -> Option<SourceIds> {
        let row = ids
            .get(keys::BANGUMI)
            .and_then(|id| self.by_bangumi.get(id.trim()))
            .or_else(|| ids.get(keys::MAL).and_then(|id| self.by_mal.get(id.trim())))?;
        self.rows.get(*row).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        {"bgm_id": 400602, "mal_id": "52991", "anidb_id": 17617, "tmdb_id": null},
        {"bgm_id": "", "mal_id": 16498, "douban_id": "25823163"},
        {"bgm_id": "400602", "mal_id": "1"},
        "garbage"
    ]"#;

    fn ids(pairs: &[(&str, &str)]) -> SourceIds {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_prefers_bangumi_and_first_row() {
        let mapper = JsonIdMapper::from_json_str(ROWS).unwrap();
        assert_eq!(mapper.len(), 3);

        let found = mapper
            .lookup_external_ids(&ids(&[("bangumi", "400602"), ("mal", "16498")]))
            .unwrap();
        assert_eq!(found.get("mal").map(String::as_str), Some("52991"));
        assert_eq!(found.get("anidb").map(String::as_str), Some("17617"));
        assert!(!found.contains_key("tmdb"));
    }

    #[test]
    fn test_lookup_falls_back_to_mal() {
        let mapper = JsonIdMapper::from_json_str(ROWS).unwrap();
        let found = mapper.lookup_external_ids(&ids(&[("mal", "16498")])).unwrap();
        assert_eq!(found.get("douban").map(String::as_str), Some("25823163"));
        assert!(!found.contains_key("bangumi"));

        assert!(mapper.lookup_external_ids(&ids(&[("anilist", "1")])).is_none());
    }

    #[test]
    fn test_bad_file_is_config_error() {
        assert!(matches!(
            JsonIdMapper::from_file("/nonexistent/anime_map.json"),
            Err(ConfigError::Io { .. })
        ));
        assert!(JsonIdMapper::from_json_str("{\"not\": \"an array\"}").is_err());
    }
}
