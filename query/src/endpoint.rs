//! Endpoint descriptors
//!
//! An endpoint is a name plus a function turning the caller's argument into
//! a [`RequestSpec`]. Descriptors are `const`, so an application declares
//! them once as statics and registers them with an [`Api`](crate::Api).
//!
//! ```
//! use sliceflow_query::{QueryEndpoint, RequestSpec};
//!
//! fn by_id(id: &u32) -> RequestSpec {
//!     RequestSpec::get(format!("/posts/{id}"))
//! }
//!
//! static GET_POST: QueryEndpoint<u32, serde_json::Value> = QueryEndpoint::new("getPostById", by_id);
//!
//! assert_eq!(GET_POST.cache_key(&7), "getPostById(7)");
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::state::{ApiAction, ApiState, MutationResult, QueryResult, RequestId};
use crate::transport::RequestSpec;

/// A cached read endpoint
pub struct QueryEndpoint<Arg, Out> {
    name: &'static str,
    build: fn(&Arg) -> RequestSpec,
    _out: PhantomData<fn() -> Out>,
}

impl<Arg, Out> QueryEndpoint<Arg, Out> {
    /// Declare an endpoint
    #[must_use]
    pub const fn new(name: &'static str, build: fn(&Arg) -> RequestSpec) -> Self {
        Self {
            name,
            build,
            _out: PhantomData,
        }
    }

    /// Endpoint name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The request this endpoint issues for `arg`
    #[must_use]
    pub fn request(&self, arg: &Arg) -> RequestSpec {
        (self.build)(arg)
    }
}

impl<Arg: Serialize, Out> QueryEndpoint<Arg, Out> {
    /// Cache key for `arg`: the endpoint name followed by the JSON argument
    #[must_use]
    pub fn cache_key(&self, arg: &Arg) -> String {
        let arg = serde_json::to_string(arg).unwrap_or_else(|_| "null".to_string());
        format!("{}({arg})", self.name)
    }

    /// Action requesting the data, served from cache when already present
    #[must_use]
    pub fn initiate(&self, arg: &Arg) -> ApiAction {
        self.requested(arg, false)
    }

    /// Action requesting the data even if it is cached or in flight
    #[must_use]
    pub fn refetch(&self, arg: &Arg) -> ApiAction {
        self.requested(arg, true)
    }

    fn requested(&self, arg: &Arg, force: bool) -> ApiAction {
        ApiAction::QueryRequested {
            key: self.cache_key(arg),
            endpoint: self.name.to_string(),
            request: self.request(arg),
            force,
        }
    }
}

impl<Arg: Serialize, Out: DeserializeOwned> QueryEndpoint<Arg, Out> {
    /// Current result for `arg`
    #[must_use]
    pub fn select(&self, state: &ApiState, arg: &Arg) -> QueryResult<Out> {
        state
            .queries
            .get(&self.cache_key(arg))
            .map_or_else(QueryResult::uninitialized, |entry| {
                QueryResult::from_parts(entry.status, entry.data.as_ref(), entry.error.as_ref())
            })
    }
}

impl<Arg, Out> std::fmt::Debug for QueryEndpoint<Arg, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEndpoint").field("name", &self.name).finish()
    }
}

/// A write endpoint; every call is issued, nothing is deduplicated
pub struct MutationEndpoint<Arg, Out> {
    name: &'static str,
    build: fn(&Arg) -> RequestSpec,
    _out: PhantomData<fn() -> Out>,
}

impl<Arg, Out> MutationEndpoint<Arg, Out> {
    /// Declare an endpoint
    #[must_use]
    pub const fn new(name: &'static str, build: fn(&Arg) -> RequestSpec) -> Self {
        Self {
            name,
            build,
            _out: PhantomData,
        }
    }

    /// Endpoint name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The request this endpoint issues for `arg`
    #[must_use]
    pub fn request(&self, arg: &Arg) -> RequestSpec {
        (self.build)(arg)
    }

    /// Action issuing the mutation; `request_id` selects its outcome later
    #[must_use]
    pub fn initiate(&self, request_id: RequestId, arg: &Arg) -> ApiAction {
        ApiAction::MutationRequested {
            request_id,
            endpoint: self.name.to_string(),
            request: self.request(arg),
        }
    }

    /// Action dropping the stored outcome of `request_id`
    #[must_use]
    pub const fn remove_result(&self, request_id: RequestId) -> ApiAction {
        ApiAction::MutationRemoved { request_id }
    }
}

impl<Arg, Out: DeserializeOwned> MutationEndpoint<Arg, Out> {
    /// Current result of the call identified by `request_id`
    #[must_use]
    pub fn select(&self, state: &ApiState, request_id: &RequestId) -> MutationResult<Out> {
        state
            .mutations
            .get(request_id)
            .map_or_else(MutationResult::uninitialized, |entry| {
                MutationResult::from_parts(entry.status, entry.data.as_ref(), entry.error.as_ref())
            })
    }
}

impl<Arg, Out> std::fmt::Debug for MutationEndpoint<Arg, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEndpoint").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ApiReducer, QueryStatus};
    use crate::transport::Method;
    use serde_json::{json, Value};
    use sliceflow_core::reducer::Reducer;

    fn all(_: &()) -> RequestSpec {
        RequestSpec::get("/posts")
    }

    fn create(body: &Value) -> RequestSpec {
        RequestSpec::post("/posts", body.clone())
    }

    static LIST: QueryEndpoint<(), Vec<Value>> = QueryEndpoint::new("getPosts", all);
    static CREATE: MutationEndpoint<Value, Value> = MutationEndpoint::new("createPost", create);

    #[test]
    fn test_unit_argument_cache_key() {
        assert_eq!(LIST.cache_key(&()), "getPosts(null)");
    }

    #[test]
    fn test_initiate_and_refetch_differ_only_in_force() {
        let ApiAction::QueryRequested { force: initiate, .. } = LIST.initiate(&()) else {
            unreachable!("query endpoints request queries");
        };
        let ApiAction::QueryRequested { force: refetch, request, .. } = LIST.refetch(&()) else {
            unreachable!("query endpoints request queries");
        };
        assert!(!initiate);
        assert!(refetch);
        assert_eq!(request.method, Method::Get);
    }

    #[test]
    fn test_select_before_request_is_uninitialized() {
        let result = LIST.select(&ApiState::default(), &());
        assert!(result.is_uninitialized);
        assert!(result.data.is_none());
    }

    #[test]
    fn test_mutation_lifecycle_through_reducer() {
        let mut state = ApiState::default();
        let id = RequestId::new();

        let _ = ApiReducer.reduce(&mut state, CREATE.initiate(id, &json!({ "title": "x" })), &());
        assert!(CREATE.select(&state, &id).is_loading);
        assert_eq!(state.mutations[&id].status, QueryStatus::Pending);

        let _ = ApiReducer.reduce(
            &mut state,
            ApiAction::MutationFulfilled {
                request_id: id,
                data: json!({ "id": 101 }),
            },
            &(),
        );
        let result = CREATE.select(&state, &id);
        assert!(result.is_success);
        assert_eq!(result.data, Some(json!({ "id": 101 })));
    }
}
