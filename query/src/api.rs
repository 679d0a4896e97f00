//! Endpoint registry

use std::collections::BTreeMap;

use crate::endpoint::{MutationEndpoint, QueryEndpoint};

/// Reserved combined-state key used by the demo application
pub const DEFAULT_REDUCER_PATH: &str = "baseApi";

/// Kind of a registered endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Cached read
    Query,
    /// Uncached write
    Mutation,
}

/// The set of endpoints a store knows about
#[derive(Debug, Clone)]
pub struct Api {
    reducer_path: &'static str,
    endpoints: BTreeMap<&'static str, EndpointKind>,
}

impl Api {
    /// Start declaring an API whose cache lives under `reducer_path`
    #[must_use]
    pub fn builder(reducer_path: &'static str) -> ApiBuilder {
        ApiBuilder {
            api: Self {
                reducer_path,
                endpoints: BTreeMap::new(),
            },
        }
    }

    /// Combined-state key of the cache slice
    #[must_use]
    pub const fn reducer_path(&self) -> &'static str {
        self.reducer_path
    }

    /// Kind of the endpoint named `name`, if registered
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<EndpointKind> {
        self.endpoints.get(name).copied()
    }

    /// Registered endpoint names
    pub fn endpoints(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.endpoints.keys().copied()
    }
}

/// Builder returned by [`Api::builder`]
#[derive(Debug)]
pub struct ApiBuilder {
    api: Api,
}

impl ApiBuilder {
    /// Register a query endpoint
    #[must_use]
    pub fn query<Arg, Out>(mut self, endpoint: &QueryEndpoint<Arg, Out>) -> Self {
        self.api.endpoints.insert(endpoint.name(), EndpointKind::Query);
        self
    }

    /// Register a mutation endpoint
    #[must_use]
    pub fn mutation<Arg, Out>(mut self, endpoint: &MutationEndpoint<Arg, Out>) -> Self {
        self.api.endpoints.insert(endpoint.name(), EndpointKind::Mutation);
        self
    }

    /// Finish the registry
    #[must_use]
    pub fn build(self) -> Api {
        self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RequestSpec;

    fn posts(_: &()) -> RequestSpec {
        RequestSpec::get("/posts")
    }

    fn comment(_: &()) -> RequestSpec {
        RequestSpec::post("/posts", serde_json::Value::Null)
    }

    #[test]
    fn test_registry_kinds() {
        let api = Api::builder(DEFAULT_REDUCER_PATH)
            .query(&QueryEndpoint::<(), ()>::new("getPosts", posts))
            .mutation(&MutationEndpoint::<(), ()>::new("postComment", comment))
            .build();

        assert_eq!(api.reducer_path(), "baseApi");
        assert_eq!(api.kind("getPosts"), Some(EndpointKind::Query));
        assert_eq!(api.kind("postComment"), Some(EndpointKind::Mutation));
        assert_eq!(api.kind("missing"), None);
        assert_eq!(api.endpoints().count(), 2);
    }
}
