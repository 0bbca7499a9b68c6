//! Query orchestration module
//!
//! Fans a query out to every configured source, expands it with alternate
//! titles and pools the candidates, collecting timings and failures.

mod executor;
mod expansion;
mod models;

pub(crate) use executor::run_all;
pub use executor::QueryOrchestrator;
pub use expansion::expansion_queries;
pub use models::*;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::SourceError;
    use crate::network::HttpClient;
    use crate::records::CandidateRecord;
    use crate::sources::{SourceQuery, SourceRequest, SourceResponse, SourceSearcher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// What a [`MockSource`] does when searched
    #[derive(Clone)]
    pub enum MockBehavior {
        /// Return these records for every query
        Records(Vec<CandidateRecord>),
        /// Return one record named after the query
        Echo,
        /// Return records keyed by the exact query text; anything else is empty
        Table(Vec<(String, Vec<CandidateRecord>)>),
        Fail(SourceError),
        Panic,
    }

    /// Tracks concurrent calls across any number of mocks
    #[derive(Clone, Default)]
    pub struct InFlightProbe {
        current: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    impl InFlightProbe {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        pub fn max_seen(&self) -> usize {
            self.max.load(Ordering::SeqCst)
        }
    }

    /// In-memory source for orchestration tests
    pub struct MockSource {
        pub name: String,
        pub id_key: String,
        pub behavior: MockBehavior,
        pub delay: Option<Duration>,
        pub calls: Arc<Mutex<Vec<String>>>,
        pub in_flight: InFlightProbe,
    }

    impl MockSource {
        pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
            let name = name.into();
            Self {
                id_key: name.clone(),
                name,
                behavior,
                delay: None,
                calls: Arc::new(Mutex::new(Vec::new())),
                in_flight: InFlightProbe::default(),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn with_probe(mut self, probe: InFlightProbe) -> Self {
            self.in_flight = probe;
            self
        }

        pub fn with_id_key(mut self, key: impl Into<String>) -> Self {
            self.id_key = key.into();
            self
        }
    }

    #[async_trait]
    impl SourceSearcher for MockSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn id_key(&self) -> &str {
            &self.id_key
        }

        fn request(&self, _query: &SourceQuery) -> Result<SourceRequest, SourceError> {
            Ok(SourceRequest::get("http://mock.invalid/"))
        }

        fn response(
            &self,
            _response: SourceResponse,
            _query: &SourceQuery,
        ) -> Result<Vec<CandidateRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn search(
            &self,
            _client: &HttpClient,
            query: &SourceQuery,
        ) -> Result<Vec<CandidateRecord>, SourceError> {
            self.calls.lock().unwrap().push(query.keyword.clone());
            self.in_flight.enter();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.exit();

            match &self.behavior {
                MockBehavior::Records(records) => Ok(records.clone()),
                MockBehavior::Echo => Ok(vec![
                    CandidateRecord::new(self.name.clone()).with_name(query.keyword.clone())
                ]),
                MockBehavior::Table(table) => Ok(table
                    .iter()
                    .find(|(q, _)| q == &query.keyword)
                    .map(|(_, records)| records.clone())
                    .unwrap_or_default()),
                MockBehavior::Fail(e) => Err(e.clone()),
                MockBehavior::Panic => panic!("mock source {} exploded", self.name),
            }
        }
    }
}
