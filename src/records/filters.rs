//! Query filters and match modes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Similarity blending profile, trading precision for recall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Strict,
    #[default]
    Normal,
    Recall,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Normal => "normal",
            Self::Recall => "recall",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "normal" => Ok(Self::Normal),
            "recall" => Ok(Self::Recall),
            other => Err(format!("unknown match mode: {}", other)),
        }
    }
}

/// Optional filter values for a query.
///
/// Absent values are `None`; malformed values never make it into a
/// `QueryFilters` (see [`QueryFilters::sanitized`] and
/// [`QueryFilters::from_json`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilters {
    pub year: Option<i32>,
    /// 1..=12
    pub month: Option<u32>,
    pub studio: Option<String>,
    pub director: Option<String>,
    pub source_type: Option<String>,
}

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_studio(mut self, studio: impl Into<String>) -> Self {
        self.studio = Some(studio.into());
        self
    }

    pub fn with_director(mut self, director: impl Into<String>) -> Self {
        self.director = Some(director.into());
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.month.is_none()
            && self.studio.is_none()
            && self.director.is_none()
            && self.source_type.is_none()
    }

    /// Drop values that cannot be used: out-of-range year or month, blank strings.
    pub fn sanitized(mut self) -> Self {
        if let Some(year) = self.year {
            if !(1900..=2200).contains(&year) {
                warn!(year, "dropping out-of-range year filter");
                self.year = None;
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                warn!(month, "dropping out-of-range month filter");
                self.month = None;
            }
        }
        for slot in [&mut self.studio, &mut self.director, &mut self.source_type] {
            if let Some(value) = slot.take() {
                *slot = crate::records::non_blank(value);
            }
        }
        self
    }

    /// Build filters from a loosely typed JSON object.
    ///
    /// Values of the wrong type are dropped with a warning instead of
    /// failing the whole request. `source` is accepted as an alias of
    /// `source_type`.
    pub fn from_json(value: &Value) -> Self {
        let mut filters = Self::default();
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                warn!("ignoring non-object filter value");
            }
            return filters;
        };

        for (key, val) in obj {
            if val.is_null() {
                continue;
            }
            match key.as_str() {
                "year" => match val.as_i64().and_then(|y| i32::try_from(y).ok()) {
                    Some(year) => filters.year = Some(year),
                    None => warn!(%val, "dropping malformed year filter"),
                },
                "month" => match val.as_u64().and_then(|m| u32::try_from(m).ok()) {
                    Some(month) => filters.month = Some(month),
                    None => warn!(%val, "dropping malformed month filter"),
                },
                "studio" | "director" | "source_type" | "source" => match val.as_str() {
                    Some(text) => {
                        let text = Some(text.to_string());
                        match key.as_str() {
                            "studio" => filters.studio = text,
                            "director" => filters.director = text,
                            _ => filters.source_type = text,
                        }
                    }
                    None => warn!(filter = %key, %val, "dropping malformed text filter"),
                },
                other => warn!(filter = %other, "ignoring unknown filter"),
            }
        }

        filters.sanitized()
    }

    /// Same filters without the year, used for supplementary queries
    /// where sequels and films can sit far from the base year.
    pub fn without_year(&self) -> Self {
        Self {
            year: None,
            ..self.clone()
        }
    }
}
