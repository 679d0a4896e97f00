//! User fetch slice
//!
//! `Fetch` moves the slice to loading and starts a request; the request
//! settles with exactly one of `Fulfilled` or `Rejected`. Every fetch takes a
//! new generation number and only the latest generation may settle the
//! slice, so an older response arriving late is dropped.

use serde::{Deserialize, Serialize};
use sliceflow_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};
use sliceflow_query::{QueryError, RequestSpec, Transport};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A remote user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server id
    pub id: u64,
    /// Full name
    #[serde(default)]
    pub name: String,
    /// Login
    #[serde(default)]
    pub username: String,
    /// Contact address
    #[serde(default)]
    pub email: String,
}

/// User fetch state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Last fetched users
    pub users: Vec<User>,
    /// A fetch is in flight
    pub is_loading: bool,
    /// Why the last fetch failed
    pub error: Option<String>,
    /// Generation of the latest fetch
    #[serde(skip)]
    pub generation: u64,
}

/// User fetch actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Start a fetch (pending)
    Fetch,
    /// The fetch issued under `generation` succeeded
    Fulfilled {
        /// Generation the fetch was issued under
        generation: u64,
        /// Fetched users
        users: Vec<User>,
    },
    /// The fetch issued under `generation` failed
    Rejected {
        /// Generation the fetch was issued under
        generation: u64,
        /// Failure description
        error: String,
    },
}

/// Boxed future returned by [`UserDirectory::fetch_users`]
pub type UsersFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<User>, QueryError>> + Send + 'a>>;

/// Where users come from
pub trait UserDirectory: Send + Sync {
    /// Fetch every user
    fn fetch_users(&self) -> UsersFuture<'_>;
}

/// [`UserDirectory`] issuing `GET /users` through a [`Transport`]
#[derive(Clone)]
pub struct RemoteUserDirectory {
    transport: Arc<dyn Transport>,
}

impl RemoteUserDirectory {
    /// Directory backed by `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl UserDirectory for RemoteUserDirectory {
    fn fetch_users(&self) -> UsersFuture<'_> {
        Box::pin(async move {
            let value = self.transport.execute(RequestSpec::get("/users")).await?;
            serde_json::from_value(value).map_err(|e| QueryError::Decode(e.to_string()))
        })
    }
}

/// User environment
#[derive(Clone)]
pub struct UserEnvironment {
    /// Source of users
    pub directory: Arc<dyn UserDirectory>,
}

impl UserEnvironment {
    /// Create an environment around `directory`
    pub fn new(directory: impl UserDirectory + 'static) -> Self {
        Self {
            directory: Arc::new(directory),
        }
    }
}

/// User fetch reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct UserReducer;

impl Reducer for UserReducer {
    type State = UserState;
    type Action = UserAction;
    type Environment = UserEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::Fetch => {
                state.generation += 1;
                state.is_loading = true;
                state.error = None;

                let generation = state.generation;
                let directory = Arc::clone(&env.directory);
                return smallvec![async_effect! {
                    match directory.fetch_users().await {
                        Ok(users) => Some(UserAction::Fulfilled { generation, users }),
                        Err(e) => Some(UserAction::Rejected { generation, error: e.to_string() }),
                    }
                }];
            },
            UserAction::Fulfilled { generation, users } => {
                if generation == state.generation {
                    state.is_loading = false;
                    state.users = users;
                    state.error = None;
                } else {
                    tracing::debug!(generation, latest = state.generation, "Discarding stale users");
                }
            },
            UserAction::Rejected { generation, error } => {
                if generation == state.generation {
                    state.is_loading = false;
                    state.error = Some(error);
                } else {
                    tracing::debug!(generation, latest = state.generation, "Discarding stale failure");
                }
            },
        }

        smallvec![Effect::None]
    }
}
