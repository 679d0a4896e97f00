//! # Sliceflow Testing
//!
//! Testing utilities and helpers for the Sliceflow architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A scripted [`Transport`](sliceflow_query::Transport) for the remote data client
//! - The [`ReducerTest`] Given-When-Then harness
//! - Assertion helpers for reducers and stores
//!
//! ## Example
//!
//! ```ignore
//! use sliceflow_testing::{mocks::SequentialIdGenerator, ReducerTest};
//!
//! #[test]
//! fn adds_employee() {
//!     ReducerTest::new(EmployeeReducer)
//!         .with_env(EmployeeEnvironment::new(SequentialIdGenerator::new("emp")))
//!         .given_state(EmployeeState::default())
//!         .when_action(EmployeeAction::Add { name: "Alice".into() })
//!         .then_state(|s| assert_eq!(s.employees[0].id.as_str(), "emp-1"))
//!         .run();
//! }
//! ```

use chrono::{DateTime, Utc};
use sliceflow_core::environment::{Clock, IdGenerator, KeyValueStorage, StorageError};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, KeyValueStorage, StorageError, Utc};
    use serde_json::Value;
    use sliceflow_query::{QueryError, RequestSpec, Transport, TransportFuture};
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use sliceflow_testing::mocks::FixedClock;
    /// use sliceflow_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable ids: `prefix-1`, `prefix-2`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting at 1
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }

    /// In-memory key-value storage with write failure injection
    #[derive(Debug, Default)]
    pub struct InMemoryStorage {
        values: Mutex<HashMap<String, String>>,
        fail_writes: AtomicBool,
        writes: AtomicU64,
    }

    impl InMemoryStorage {
        /// Empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Storage pre-populated with `entries`
        #[must_use]
        pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
        where
            K: Into<String>,
            V: Into<String>,
        {
            let storage = Self::new();
            if let Ok(mut values) = storage.values.lock() {
                values.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
            }
            storage
        }

        /// Make every subsequent `set` fail
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of successful writes so far
        #[must_use]
        pub fn write_count(&self) -> u64 {
            self.writes.load(Ordering::SeqCst)
        }

        /// Current value under `key`, bypassing the trait
        #[must_use]
        pub fn value(&self, key: &str) -> Option<String> {
            self.values.lock().ok().and_then(|values| values.get(key).cloned())
        }
    }

    impl KeyValueStorage for InMemoryStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let values = self
                .values
                .lock()
                .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            Ok(values.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailed("injected failure".to_string()));
            }
            let mut values = self
                .values
                .lock()
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            values.insert(key.to_string(), value.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Scripted transport
    ///
    /// Responses are queued per path and consumed in order; the last queued
    /// response for a path is repeated once the queue is down to one. A path
    /// with nothing queued answers with a 404 status error.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        responses: Mutex<HashMap<String, VecDeque<(Duration, Result<Value, QueryError>)>>>,
        requests: Mutex<Vec<RequestSpec>>,
    }

    impl MockTransport {
        /// Transport with nothing queued
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful response for `path`
        #[must_use]
        pub fn respond(self, path: impl Into<String>, value: Value) -> Self {
            self.respond_after(path, Duration::ZERO, Ok(value))
        }

        /// Queue a failure for `path`
        #[must_use]
        pub fn fail(self, path: impl Into<String>, error: QueryError) -> Self {
            self.respond_after(path, Duration::ZERO, Err(error))
        }

        /// Queue an outcome for `path` delivered after `delay`
        #[must_use]
        pub fn respond_after(
            self,
            path: impl Into<String>,
            delay: Duration,
            outcome: Result<Value, QueryError>,
        ) -> Self {
            if let Ok(mut responses) = self.responses.lock() {
                responses.entry(path.into()).or_default().push_back((delay, outcome));
            }
            self
        }

        /// Every request executed so far
        #[must_use]
        pub fn requests(&self) -> Vec<RequestSpec> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }

        fn next_outcome(&self, path: &str) -> (Duration, Result<Value, QueryError>) {
            let missing = || {
                (
                    Duration::ZERO,
                    Err(QueryError::Status {
                        status: 404,
                        url: path.to_string(),
                    }),
                )
            };
            let Ok(mut responses) = self.responses.lock() else {
                return missing();
            };
            match responses.get_mut(path) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(missing),
                Some(queue) => queue.front().cloned().unwrap_or_else(missing),
                None => missing(),
            }
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, request: RequestSpec) -> TransportFuture<'_> {
            let (delay, outcome) = self.next_outcome(&request.path);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            })
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber writing to the test output
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}


// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, InMemoryStorage, MockTransport, SequentialIdGenerator};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sliceflow_query::{QueryError, RequestSpec, Transport};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new("emp");
        assert_eq!(ids.next_id(), "emp-1");
        assert_eq!(ids.next_id(), "emp-2");
    }

    #[test]
    fn test_in_memory_storage_failure_injection() {
        let storage = InMemoryStorage::with_entries([("count", "3")]);
        assert_eq!(storage.get("count"), Ok(Some("3".to_string())));

        storage.fail_writes(true);
        assert!(storage.set("count", "4").is_err());
        assert_eq!(storage.value("count").as_deref(), Some("3"));

        storage.fail_writes(false);
        assert!(storage.set("count", "4").is_ok());
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_queue() {
        let transport = MockTransport::new()
            .fail("/users", QueryError::Request("offline".to_string()))
            .respond("/users", json!([{ "id": 1 }]));

        assert!(transport.execute(RequestSpec::get("/users")).await.is_err());
        assert_eq!(transport.execute(RequestSpec::get("/users")).await, Ok(json!([{ "id": 1 }])));
        assert_eq!(transport.execute(RequestSpec::get("/users")).await, Ok(json!([{ "id": 1 }])));
        assert!(matches!(
            transport.execute(RequestSpec::get("/posts")).await,
            Err(QueryError::Status { status: 404, .. })
        ));
        assert_eq!(transport.requests().len(), 4);
    }
}
