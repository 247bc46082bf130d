//! Thin client to the remote core.
//!
//! The remote core is the service of record for users, codes and tokens.
//! Every default Implementation Table operation goes through this one
//! interface, keyed by (recipe id, method, relative path); its retry and
//! versioning policy lives on the other side of the wire.

use crate::error::{AuthKitError, Result};
use crate::http::Method;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Driver-interface version sent with every core request.
pub const CORE_API_VERSION: &str = "2.21";

/// Request/response access to the remote core.
#[async_trait]
pub trait CoreClient: Send + Sync {
    /// Send one request and decode the JSON answer.
    ///
    /// `path` is relative to the core's recipe namespace (e.g.
    /// `/signinup/code` for the passwordless recipe). `body` is ignored for
    /// GET requests.
    async fn send(
        &self,
        recipe_id: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value>;
}

/// Connection settings for a real core deployment.
#[derive(Debug, Clone)]
pub struct CoreConnection {
    /// Base URI, e.g. `https://core.example.com`.
    pub connection_uri: String,
    /// Optional API key sent as the `api-key` header.
    pub api_key: Option<String>,
}

impl CoreConnection {
    /// Connection to `connection_uri` with no API key.
    pub fn new(connection_uri: impl Into<String>) -> Self {
        Self {
            connection_uri: connection_uri.into(),
            api_key: None,
        }
    }

    /// Attach an API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// reqwest-backed [`CoreClient`].
pub struct HttpCoreClient {
    connection: CoreConnection,
    http: reqwest::Client,
}

impl HttpCoreClient {
    /// Build a client for the given connection.
    pub fn new(connection: CoreConnection) -> Self {
        Self {
            connection,
            http: reqwest::Client::new(),
        }
    }

    /// Convenience constructor returning the trait-object form the tables
    /// consume.
    pub fn shared(connection: CoreConnection) -> Arc<dyn CoreClient> {
        Arc::new(Self::new(connection))
    }

    fn url(&self, recipe_id: &str, path: &str) -> String {
        let base = self.connection.connection_uri.trim_end_matches('/');
        format!("{base}/recipe/{recipe_id}{path}")
    }
}

#[async_trait]
impl CoreClient for HttpCoreClient {
    async fn send(
        &self,
        recipe_id: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value> {
        let url = self.url(recipe_id, path);
        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url).json(&body),
            Method::Put => self.http.put(&url).json(&body),
            Method::Delete => self.http.delete(&url).json(&body),
        };
        builder = builder
            .query(query)
            .header("cdi-version", CORE_API_VERSION)
            .header("rid", recipe_id);
        if let Some(api_key) = &self.connection.api_key {
            builder = builder.header("api-key", api_key.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(recipe_id, %url, status = status.as_u16(), "core request failed");
            return Err(AuthKitError::CoreRequest {
                status: status.as_u16(),
                message,
            });
        }
        let value = response.json::<Value>().await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_urls_are_namespaced_by_recipe() {
        let client = HttpCoreClient::new(CoreConnection::new("http://localhost:3567/"));
        assert_eq!(
            client.url("passwordless", "/signinup/code"),
            "http://localhost:3567/recipe/passwordless/signinup/code"
        );
    }
}
