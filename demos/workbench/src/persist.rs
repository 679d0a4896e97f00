//! Persistence of the counter and employee slices
//!
//! [`PersistMiddleware`] mirrors both slices into a [`KeyValueStorage`]
//! after every dispatch that changed them. [`restore_state`] reads the
//! mirror back once at startup.

use sliceflow_core::environment::KeyValueStorage;
use sliceflow_core::middleware::{Middleware, Next};
use sliceflow_core::Effects;
use std::sync::Arc;

use crate::app::{AppAction, AppState};
use crate::counter::CounterState;
use crate::employee::{Employee, EmployeeState};

/// Storage key of the count (decimal text)
pub const COUNT_KEY: &str = "count";

/// Storage key of the employee list (JSON array)
pub const EMPLOYEE_KEY: &str = "employee";

/// Middleware writing changed slices to storage
///
/// Write failures are logged and otherwise ignored.
///
/// Writes happen inline, in dispatch order, while the store holds its state
/// lock, so a later dispatch can never be overtaken by an earlier write. The
/// backend must therefore be fast: an in-memory map or a small local file
/// such as [`FileStorage`](crate::storage::FileStorage). A slow or networked
/// backend stalls every dispatch and the runtime worker running it.
pub struct PersistMiddleware {
    storage: Arc<dyn KeyValueStorage>,
}

impl PersistMiddleware {
    /// Persist into `storage`
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn write(&self, key: &str, value: &str) {
        match self.storage.set(key, value) {
            Ok(()) => tracing::trace!(key, "Persisted slice"),
            Err(error) => tracing::warn!(key, %error, "Failed to persist slice"),
        }
    }
}

impl Middleware<AppState, AppAction> for PersistMiddleware {
    fn handle(&self, action: AppAction, next: &Next<'_, AppState, AppAction>) -> Effects<AppAction> {
        let before = next.state();
        let effects = next.run(action);
        let after = next.state();

        if before.counter_data.count != after.counter_data.count {
            self.write(COUNT_KEY, &after.counter_data.count.to_string());
        }

        if before.employee_data != after.employee_data {
            match serde_json::to_string(&after.employee_data.employees) {
                Ok(json) => self.write(EMPLOYEE_KEY, &json),
                Err(error) => tracing::warn!(%error, "Failed to encode employees"),
            }
        }

        effects
    }
}

/// Initial state with the persisted slices filled in
///
/// Missing keys leave the slice at its default. Unreadable storage and
/// malformed values are logged and treated as missing.
pub fn restore_state(storage: &dyn KeyValueStorage) -> AppState {
    let mut state = AppState::default();

    match storage.get(COUNT_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<u64>() {
            Ok(count) => state.counter_data = Arc::new(CounterState::with_count(count)),
            Err(error) => tracing::warn!(%raw, %error, "Ignoring malformed persisted count"),
        },
        Ok(None) => {},
        Err(error) => tracing::warn!(%error, "Could not read persisted count"),
    }

    match storage.get(EMPLOYEE_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<Employee>>(&raw) {
            Ok(employees) => state.employee_data = Arc::new(EmployeeState { employees }),
            Err(error) => tracing::warn!(%error, "Ignoring malformed persisted employees"),
        },
        Ok(None) => {},
        Err(error) => tracing::warn!(%error, "Could not read persisted employees"),
    }

    tracing::debug!(
        count = state.counter_data.count,
        employees = state.employee_data.employees.len(),
        "Restored persisted state"
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use sliceflow_testing::InMemoryStorage;

    #[test]
    fn test_restore_from_empty_storage() {
        let state = restore_state(&InMemoryStorage::new());
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn test_restore_reads_both_keys() {
        let storage = InMemoryStorage::with_entries([
            (COUNT_KEY, "12"),
            (EMPLOYEE_KEY, r#"[{"id":"a","name":"Alice"},{"id":"b","employeeName":"Bob"}]"#),
        ]);

        let state = restore_state(&storage);

        assert_eq!(state.counter_data.count, 12);
        let names: Vec<&str> = state.employee_data.employees.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_restore_ignores_malformed_values() {
        let storage = InMemoryStorage::with_entries([(COUNT_KEY, "NaN"), (EMPLOYEE_KEY, "{not json")]);

        let state = restore_state(&storage);

        assert_eq!(state.counter_data.count, 0);
        assert!(state.employee_data.employees.is_empty());
    }
}
