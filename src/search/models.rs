//! Fan-out execution modes and per-call diagnostics

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// How a fan-out round drives its source calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One call at a time, in submission order
    Sequential,
    /// All calls at once, bounded by the shared semaphore
    #[default]
    Concurrent,
}

/// Timing of one successful source call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Source name
    pub source: String,
    /// Query text sent to the source
    pub query: String,
    /// Response time in milliseconds
    pub time_ms: u64,
    /// Number of candidates returned
    pub result_count: usize,
}

/// A source call that produced no results because it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresponsiveSource {
    pub source: String,
    pub query: String,
    #[serde(with = "error_text")]
    pub error: SourceError,
}

/// Collects timings and failures from concurrently running source calls
#[derive(Debug, Clone, Default)]
pub struct CallDiagnostics {
    timings: Arc<RwLock<Vec<Timing>>>,
    unresponsive: Arc<RwLock<Vec<UnresponsiveSource>>>,
}

impl CallDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record source timing
    pub fn add_timing(&self, timing: Timing) {
        self.timings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timing);
    }

    /// Record an unresponsive source call
    pub fn add_unresponsive(&self, source: String, query: String, error: SourceError) {
        self.unresponsive
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(UnresponsiveSource {
                source,
                query,
                error,
            });
    }

    pub fn timings(&self) -> Vec<Timing> {
        self.timings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn unresponsive(&self) -> Vec<UnresponsiveSource> {
        self.unresponsive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of source calls recorded so far
    pub fn call_count(&self) -> usize {
        self.timings.read().unwrap_or_else(PoisonError::into_inner).len()
            + self
                .unresponsive
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
    }
}

/// Serialize a source error as its display text
mod error_text {
    use crate::error::SourceError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(error: &SourceError, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(error)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SourceError, D::Error> {
        let text = String::deserialize(d)?;
        Ok(match text.as_str() {
            "request timed out" => SourceError::Timeout,
            "source panicked" => SourceError::Panicked,
            _ => SourceError::Network(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_mode_serde() {
        assert_eq!(
            serde_yaml::from_str::<ExecutionMode>("sequential").unwrap(),
            ExecutionMode::Sequential
        );
        assert_eq!(ExecutionMode::default(), ExecutionMode::Concurrent);
    }

    #[test]
    fn test_diagnostics_shared_between_clones() {
        let diagnostics = CallDiagnostics::new();
        let other = diagnostics.clone();
        other.add_timing(Timing {
            source: "jikan".to_string(),
            query: "frieren".to_string(),
            time_ms: 120,
            result_count: 3,
        });
        other.add_unresponsive("anilist".to_string(), "frieren".to_string(), SourceError::Timeout);

        assert_eq!(diagnostics.timings().len(), 1);
        assert_eq!(diagnostics.unresponsive()[0].error, SourceError::Timeout);
        assert_eq!(diagnostics.call_count(), 2);
    }

    #[test]
    fn test_unresponsive_serializes_error_text() {
        let entry = UnresponsiveSource {
            source: "bangumi".to_string(),
            query: "x".to_string(),
            error: SourceError::HttpStatus(503),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["error"], "HTTP error: 503");
    }
}
