//! Request-issuing middleware
//!
//! [`ApiMiddleware`] sits in the store pipeline and turns
//! `QueryRequested`/`MutationRequested` actions into transport calls. It
//! serves repeated queries from the cache slice by swallowing the request
//! before it reaches the reducer.

use sliceflow_core::effect::Effect;
use sliceflow_core::environment::Clock;
use sliceflow_core::middleware::{Middleware, Next};
use sliceflow_core::{Effects, SmallVec};
use std::sync::Arc;

use crate::api::{Api, EndpointKind};
use crate::error::QueryError;
use crate::state::{ApiAction, ApiState, QueryStatus, RequestId};
use crate::transport::{RequestSpec, Transport};

/// How the middleware finds the cache slice inside the application's types
pub struct ApiLens<S, A> {
    /// Borrow the cache slice out of the combined state
    pub state: fn(&S) -> &ApiState,
    /// Borrow a cache action out of the combined action, if it is one
    pub action: fn(&A) -> Option<&ApiAction>,
    /// Wrap a cache action into the combined action
    pub embed: fn(ApiAction) -> A,
}

impl<S, A> Clone for ApiLens<S, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, A> Copy for ApiLens<S, A> {}

/// Middleware issuing requests for registered endpoints
pub struct ApiMiddleware<S, A> {
    api: Arc<Api>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    lens: ApiLens<S, A>,
}

enum Intercepted {
    Query {
        key: String,
        endpoint: String,
        request: RequestSpec,
        force: bool,
    },
    Mutation {
        request_id: RequestId,
        endpoint: String,
        request: RequestSpec,
    },
}

impl<S, A> ApiMiddleware<S, A>
where
    A: Send + 'static,
{
    /// Create the middleware
    pub fn new(
        api: Arc<Api>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        lens: ApiLens<S, A>,
    ) -> Self {
        Self {
            api,
            transport,
            clock,
            lens,
        }
    }

    fn intercept(&self, action: &A) -> Option<Intercepted> {
        match (self.lens.action)(action)? {
            ApiAction::QueryRequested {
                key,
                endpoint,
                request,
                force,
            } => Some(Intercepted::Query {
                key: key.clone(),
                endpoint: endpoint.clone(),
                request: request.clone(),
                force: *force,
            }),
            ApiAction::MutationRequested {
                request_id,
                endpoint,
                request,
            } => Some(Intercepted::Mutation {
                request_id: *request_id,
                endpoint: endpoint.clone(),
                request: request.clone(),
            }),
            _ => None,
        }
    }

    fn query_effect(&self, key: String, endpoint: &str, request: RequestSpec, generation: u64) -> Effect<A> {
        let embed = self.lens.embed;

        if self.api.kind(endpoint) != Some(EndpointKind::Query) {
            let error = QueryError::UnknownEndpoint(endpoint.to_string());
            tracing::warn!(%error, "Rejecting query");
            return Effect::Future(Box::pin(async move {
                Some(embed(ApiAction::QueryRejected {
                    key,
                    generation,
                    error: error.to_string(),
                }))
            }));
        }

        let transport = Arc::clone(&self.transport);
        let clock = Arc::clone(&self.clock);
        Effect::Future(Box::pin(async move {
            let outcome = match transport.execute(request).await {
                Ok(data) => ApiAction::QueryFulfilled {
                    key,
                    generation,
                    data,
                    fulfilled_at: clock.now(),
                },
                Err(error) => {
                    tracing::warn!(%key, %error, "Query failed");
                    ApiAction::QueryRejected {
                        key,
                        generation,
                        error: error.to_string(),
                    }
                },
            };
            Some(embed(outcome))
        }))
    }

    fn mutation_effect(&self, request_id: RequestId, endpoint: &str, request: RequestSpec) -> Effect<A> {
        let embed = self.lens.embed;

        if self.api.kind(endpoint) != Some(EndpointKind::Mutation) {
            let error = QueryError::UnknownEndpoint(endpoint.to_string());
            tracing::warn!(%error, "Rejecting mutation");
            return Effect::Future(Box::pin(async move {
                Some(embed(ApiAction::MutationRejected {
                    request_id,
                    error: error.to_string(),
                }))
            }));
        }

        let transport = Arc::clone(&self.transport);
        Effect::Future(Box::pin(async move {
            let outcome = match transport.execute(request).await {
                Ok(data) => ApiAction::MutationFulfilled { request_id, data },
                Err(error) => {
                    tracing::warn!(%request_id, %error, "Mutation failed");
                    ApiAction::MutationRejected {
                        request_id,
                        error: error.to_string(),
                    }
                },
            };
            Some(embed(outcome))
        }))
    }
}

impl<S, A> Middleware<S, A> for ApiMiddleware<S, A>
where
    S: Send + Sync,
    A: Send + 'static,
{
    fn handle(&self, action: A, next: &Next<'_, S, A>) -> Effects<A> {
        match self.intercept(&action) {
            None => next.run(action),
            Some(Intercepted::Query {
                key,
                endpoint,
                request,
                force,
            }) => {
                if !force {
                    let state = next.state();
                    let cached = (self.lens.state)(&state)
                        .queries
                        .get(&key)
                        .is_some_and(|entry| matches!(entry.status, QueryStatus::Pending | QueryStatus::Fulfilled));
                    if cached {
                        tracing::debug!(%key, "Serving query from cache");
                        return SmallVec::new();
                    }
                }

                let mut effects = next.run(action);
                let generation = (self.lens.state)(&next.state())
                    .queries
                    .get(&key)
                    .map_or(0, |entry| entry.generation);
                effects.push(self.query_effect(key, &endpoint, request, generation));
                effects
            },
            Some(Intercepted::Mutation {
                request_id,
                endpoint,
                request,
            }) => {
                let mut effects = next.run(action);
                effects.push(self.mutation_effect(request_id, &endpoint, request));
                effects
            },
        }
    }
}
