//! Response cache slice
//!
//! [`ApiState`] lives under the reserved key of the combined state. It is
//! only ever changed by [`ApiReducer`] in response to [`ApiAction`]s, which
//! the [`ApiMiddleware`](crate::ApiMiddleware) and the endpoint descriptors
//! produce.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sliceflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::transport::RequestSpec;

/// Identifies one mutation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// A fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Never requested
    #[default]
    Uninitialized,
    /// Request in flight
    Pending,
    /// Last request succeeded
    Fulfilled,
    /// Last request failed
    Rejected,
}

/// One cached query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry {
    /// Endpoint name that produced the entry
    pub endpoint: String,
    /// Current status
    pub status: QueryStatus,
    /// Raw JSON of the last successful response
    pub data: Option<Value>,
    /// Description of the last failure
    pub error: Option<String>,
    /// Incremented on every request; responses carrying an older value are stale
    pub generation: u64,
    /// When the current data arrived
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl QueryEntry {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            generation: 0,
            fulfilled_at: None,
        }
    }
}

/// One mutation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEntry {
    /// Endpoint name
    pub endpoint: String,
    /// Current status
    pub status: QueryStatus,
    /// Raw JSON of the server response
    pub data: Option<Value>,
    /// Description of the failure
    pub error: Option<String>,
}

/// The cache slice stored under the reserved combined-state key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiState {
    /// Query entries keyed by cache key
    pub queries: BTreeMap<String, QueryEntry>,
    /// Mutation entries keyed by request id
    pub mutations: BTreeMap<RequestId, MutationEntry>,
    /// Generation handed to the most recent query request
    ///
    /// Shared by every key and kept across [`ApiAction::Reset`], so a
    /// response issued before a reset can never match a newer entry.
    #[serde(default)]
    pub last_generation: u64,
}

/// Transitions of the cache slice
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAction {
    /// A query was initiated; `force` bypasses the cache
    QueryRequested {
        /// Cache key
        key: String,
        /// Endpoint name
        endpoint: String,
        /// Request to issue
        request: RequestSpec,
        /// Issue the request even if the entry is pending or fulfilled
        force: bool,
    },
    /// A query response arrived
    QueryFulfilled {
        /// Cache key
        key: String,
        /// Generation the request was issued under
        generation: u64,
        /// Response body
        data: Value,
        /// Arrival time
        fulfilled_at: DateTime<Utc>,
    },
    /// A query failed
    QueryRejected {
        /// Cache key
        key: String,
        /// Generation the request was issued under
        generation: u64,
        /// Failure description
        error: String,
    },
    /// A mutation was initiated
    MutationRequested {
        /// Caller-chosen id used to select the outcome
        request_id: RequestId,
        /// Endpoint name
        endpoint: String,
        /// Request to issue
        request: RequestSpec,
    },
    /// A mutation response arrived
    MutationFulfilled {
        /// Request id
        request_id: RequestId,
        /// Response body
        data: Value,
    },
    /// A mutation failed
    MutationRejected {
        /// Request id
        request_id: RequestId,
        /// Failure description
        error: String,
    },
    /// Forget the outcome of one mutation once the caller has read it
    MutationRemoved {
        /// Request id
        request_id: RequestId,
    },
    /// Drop every cached entry
    Reset,
}

/// Reducer for [`ApiState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiReducer;

impl Reducer for ApiReducer {
    type State = ApiState;
    type Action = ApiAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ApiAction::QueryRequested { key, endpoint, .. } => {
                let entry = state
                    .queries
                    .entry(key)
                    .or_insert_with(|| QueryEntry::new(endpoint));
                state.last_generation += 1;
                entry.generation = state.last_generation;
                entry.status = QueryStatus::Pending;
                entry.error = None;
            },
            ApiAction::QueryFulfilled {
                key,
                generation,
                data,
                fulfilled_at,
            } => match state.queries.get_mut(&key) {
                Some(entry) if entry.generation == generation => {
                    entry.status = QueryStatus::Fulfilled;
                    entry.data = Some(data);
                    entry.error = None;
                    entry.fulfilled_at = Some(fulfilled_at);
                },
                _ => tracing::debug!(%key, generation, "Discarding stale query response"),
            },
            ApiAction::QueryRejected {
                key,
                generation,
                error,
            } => match state.queries.get_mut(&key) {
                Some(entry) if entry.generation == generation => {
                    entry.status = QueryStatus::Rejected;
                    entry.data = None;
                    entry.error = Some(error);
                },
                _ => tracing::debug!(%key, generation, "Discarding stale query failure"),
            },
            ApiAction::MutationRequested {
                request_id,
                endpoint,
                ..
            } => {
                state.mutations.insert(
                    request_id,
                    MutationEntry {
                        endpoint,
                        status: QueryStatus::Pending,
                        data: None,
                        error: None,
                    },
                );
            },
            ApiAction::MutationFulfilled { request_id, data } => {
                if let Some(entry) = state.mutations.get_mut(&request_id) {
                    entry.status = QueryStatus::Fulfilled;
                    entry.data = Some(data);
                }
            },
            ApiAction::MutationRejected { request_id, error } => {
                if let Some(entry) = state.mutations.get_mut(&request_id) {
                    entry.status = QueryStatus::Rejected;
                    entry.error = Some(error);
                }
            },
            ApiAction::MutationRemoved { request_id } => {
                state.mutations.remove(&request_id);
            },
            ApiAction::Reset => {
                *state = ApiState {
                    last_generation: state.last_generation,
                    ..ApiState::default()
                };
            },
        }

        smallvec![Effect::None]
    }
}

/// What a caller sees when selecting an endpoint result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Decoded response, absent while loading for the first time or after a failure
    pub data: Option<T>,
    /// Failure description
    pub error: Option<String>,
    /// The endpoint was never requested with this argument
    pub is_uninitialized: bool,
    /// A request is in flight
    pub is_loading: bool,
    /// Data is present and decoded
    pub is_success: bool,
    /// The request failed or the response had the wrong shape
    pub is_error: bool,
}

/// Result of selecting a mutation
pub type MutationResult<T> = QueryResult<T>;

impl<T> QueryResult<T> {
    /// Result for an entry that does not exist
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self {
            data: None,
            error: None,
            is_uninitialized: true,
            is_loading: false,
            is_success: false,
            is_error: false,
        }
    }

    const fn failed(error: String) -> Self {
        Self {
            data: None,
            error: Some(error),
            is_uninitialized: false,
            is_loading: false,
            is_success: false,
            is_error: true,
        }
    }
}

impl<T: DeserializeOwned> QueryResult<T> {
    /// Build a result from the raw status, data and error of an entry
    pub(crate) fn from_parts(status: QueryStatus, data: Option<&Value>, error: Option<&String>) -> Self {
        match status {
            QueryStatus::Uninitialized => Self::uninitialized(),
            QueryStatus::Pending => Self {
                data: data.and_then(|value| T::deserialize(value).ok()),
                error: None,
                is_uninitialized: false,
                is_loading: true,
                is_success: false,
                is_error: false,
            },
            QueryStatus::Rejected => Self::failed(error.cloned().unwrap_or_default()),
            QueryStatus::Fulfilled => match data.map(T::deserialize) {
                Some(Ok(decoded)) => Self {
                    data: Some(decoded),
                    error: None,
                    is_uninitialized: false,
                    is_loading: false,
                    is_success: true,
                    is_error: false,
                },
                Some(Err(e)) => Self::failed(format!("Response parsing failed: {e}")),
                None => Self::failed("Response parsing failed: missing body".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(key: &str) -> ApiAction {
        ApiAction::QueryRequested {
            key: key.to_string(),
            endpoint: "getPosts".to_string(),
            request: RequestSpec::get("/posts"),
            force: false,
        }
    }

    #[test]
    fn test_request_bumps_generation() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("getPosts(null)"), &());
        let _ = ApiReducer.reduce(&mut state, requested("getPosts(null)"), &());

        let entry = &state.queries["getPosts(null)"];
        assert_eq!(entry.generation, 2);
        assert_eq!(entry.status, QueryStatus::Pending);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());

        let _ = ApiReducer.reduce(
            &mut state,
            ApiAction::QueryFulfilled {
                key: "k".to_string(),
                generation: 1,
                data: serde_json::json!(["old"]),
                fulfilled_at: Utc::now(),
            },
            &(),
        );
        assert_eq!(state.queries["k"].status, QueryStatus::Pending);
        assert!(state.queries["k"].data.is_none());

        let _ = ApiReducer.reduce(
            &mut state,
            ApiAction::QueryFulfilled {
                key: "k".to_string(),
                generation: 2,
                data: serde_json::json!(["new"]),
                fulfilled_at: Utc::now(),
            },
            &(),
        );
        assert_eq!(state.queries["k"].status, QueryStatus::Fulfilled);
        assert_eq!(state.queries["k"].data, Some(serde_json::json!(["new"])));
    }

    #[test]
    fn test_rejection_clears_data() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());
        let _ = ApiReducer.reduce(
            &mut state,
            ApiAction::QueryRejected {
                key: "k".to_string(),
                generation: 1,
                error: "boom".to_string(),
            },
            &(),
        );

        let result: QueryResult<Vec<String>> = QueryResult::from_parts(
            state.queries["k"].status,
            state.queries["k"].data.as_ref(),
            state.queries["k"].error.as_ref(),
        );
        assert!(result.is_error);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_wrong_shape_surfaces_as_error() {
        let data = serde_json::json!({ "not": "a list" });
        let result: QueryResult<Vec<String>> =
            QueryResult::from_parts(QueryStatus::Fulfilled, Some(&data), None);
        assert!(result.is_error);
        assert!(!result.is_success);
    }

    #[test]
    fn test_reset_clears_entries_but_not_generation() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());
        let _ = ApiReducer.reduce(&mut state, ApiAction::Reset, &());

        assert!(state.queries.is_empty());
        assert!(state.mutations.is_empty());
        assert_eq!(state.last_generation, 1);
    }

    #[test]
    fn test_response_from_before_reset_is_discarded() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());
        let _ = ApiReducer.reduce(&mut state, ApiAction::Reset, &());
        let _ = ApiReducer.reduce(&mut state, requested("k"), &());
        assert_eq!(state.queries["k"].generation, 2);

        let _ = ApiReducer.reduce(
            &mut state,
            ApiAction::QueryFulfilled {
                key: "k".to_string(),
                generation: 1,
                data: serde_json::json!(["old"]),
                fulfilled_at: Utc::now(),
            },
            &(),
        );

        assert_eq!(state.queries["k"].status, QueryStatus::Pending);
        assert!(state.queries["k"].data.is_none());
    }

    #[test]
    fn test_generations_are_unique_across_keys() {
        let mut state = ApiState::default();
        let _ = ApiReducer.reduce(&mut state, requested("a"), &());
        let _ = ApiReducer.reduce(&mut state, requested("b"), &());

        assert_eq!(state.queries["a"].generation, 1);
        assert_eq!(state.queries["b"].generation, 2);
    }

    #[test]
    fn test_removed_mutation_is_forgotten() {
        let keep = RequestId::new();
        let removed = RequestId::new();
        let mut state = ApiState::default();
        for request_id in [keep, removed] {
            let _ = ApiReducer.reduce(
                &mut state,
                ApiAction::MutationRequested {
                    request_id,
                    endpoint: "postComment".to_string(),
                    request: RequestSpec::post("/posts", serde_json::json!({})),
                },
                &(),
            );
        }

        let _ = ApiReducer.reduce(&mut state, ApiAction::MutationRemoved { request_id: removed }, &());

        assert!(state.mutations.contains_key(&keep));
        assert!(!state.mutations.contains_key(&removed));
    }
}
