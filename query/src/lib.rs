//! # Sliceflow Query
//!
//! Declarative remote data client for Sliceflow stores.
//!
//! Endpoints are declared as `const` descriptors, registered in an [`Api`],
//! and driven entirely through store actions:
//!
//! - [`QueryEndpoint::initiate`] / [`QueryEndpoint::refetch`] build a request action
//! - [`ApiMiddleware`] issues the request through a [`Transport`] unless the
//!   response is already cached or in flight
//! - [`ApiReducer`] records the outcome in [`ApiState`], discarding stale responses
//! - [`QueryEndpoint::select`] reads a typed [`QueryResult`] back out
//!
//! ## Example
//!
//! ```ignore
//! static GET_POSTS: QueryEndpoint<(), Vec<Post>> = QueryEndpoint::new("getPosts", |_| RequestSpec::get("/posts"));
//!
//! let api = Arc::new(Api::builder("baseApi").query(&GET_POSTS).build());
//! let store = Store::builder(state, reducer, env)
//!     .with_middleware(ApiMiddleware::new(api, transport, clock, lens))
//!     .build();
//!
//! store.send(AppAction::Api(GET_POSTS.initiate(&()))).await?;
//! let posts = store.state(|s| GET_POSTS.select(&s.base_api, &())).await;
//! ```

pub mod api;
pub mod endpoint;
pub mod error;
pub mod middleware;
pub mod state;
pub mod transport;

pub use api::{Api, ApiBuilder, EndpointKind, DEFAULT_REDUCER_PATH};
pub use endpoint::{MutationEndpoint, QueryEndpoint};
pub use error::QueryError;
pub use middleware::{ApiLens, ApiMiddleware};
pub use state::{
    ApiAction, ApiReducer, ApiState, MutationEntry, MutationResult, QueryEntry, QueryResult, QueryStatus,
    RequestId,
};
pub use transport::{HttpTransport, Method, RequestSpec, Transport, TransportFuture, DEFAULT_BASE_URL};
