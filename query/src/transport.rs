//! Request execution
//!
//! The [`ApiMiddleware`](crate::ApiMiddleware) never talks HTTP itself; it
//! hands a [`RequestSpec`] to a [`Transport`]. Production code uses
//! [`HttpTransport`], tests substitute a canned implementation.

use crate::error::QueryError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default remote address for the demo endpoints
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// HTTP method of a [`RequestSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a JSON body
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A request relative to the transport's base URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Path starting with `/`
    pub path: String,
    /// JSON body, sent only for `POST`
    pub body: Option<Value>,
}

impl RequestSpec {
    /// A `GET` request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A `POST` request carrying `body`
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Boxed future returned by [`Transport::execute`]
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, QueryError>> + Send + 'a>>;

/// Executes requests and returns the decoded JSON response
pub trait Transport: Send + Sync {
    /// Execute `request`
    ///
    /// Non-success statuses, network failures and undecodable bodies are
    /// all reported as a [`QueryError`].
    fn execute(&self, request: RequestSpec) -> TransportFuture<'_>;
}

/// [`Transport`] over `reqwest`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a default client
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a transport whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Request`] if the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Request(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a transport around an existing client
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL every request path is appended to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: RequestSpec) -> Result<Value, QueryError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!(method = %request.method, %url, "Issuing request");

        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| QueryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| QueryError::Request(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| QueryError::Decode(e.to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: RequestSpec) -> TransportFuture<'_> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let transport = HttpTransport::default();
        assert_eq!(transport.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let transport = HttpTransport::new("http://localhost:8080/");
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_request_constructors() {
        let get = RequestSpec::get("/posts");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());

        let post = RequestSpec::post("/posts", serde_json::json!({ "title": "hi" }));
        assert_eq!(post.method.to_string(), "POST");
        assert!(post.body.is_some());
    }
}
