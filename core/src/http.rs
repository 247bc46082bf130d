//! Framework-agnostic HTTP model.
//!
//! Recipes never see a concrete web framework. They receive a [`Request`]
//! projection and write their answer through a [`ResponseSink`], which the
//! hosting adapter translates back into whatever framework it serves.

use crate::error::{AuthKitError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// HTTP method subset the recipes route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// Canonical upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request-scoped projection of the inbound HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the recipe surface (base path already stripped).
    pub path: String,
    /// Query parameters.
    pub query: HashMap<String, String>,
    /// Header names lower-cased by the adapter.
    pub headers: HashMap<String, String>,
    /// JSON body; `Null` when the request had none.
    pub body: serde_json::Value,
}

impl Request {
    /// Build a bodyless GET request, mostly for tests and adapters.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: serde_json::Value::Null,
        }
    }

    /// Build a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body,
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Decode the JSON body into `T`, reporting a recipe-tagged bad request
    /// on failure.
    pub fn body_as<T: DeserializeOwned>(&self, recipe_id: &'static str) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|err| AuthKitError::BadRequest {
            recipe_id,
            message: format!("invalid request body: {err}"),
        })
    }

    /// Fetch a required query parameter.
    pub fn require_query(&self, recipe_id: &'static str, key: &str) -> Result<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AuthKitError::BadRequest {
                recipe_id,
                message: format!("missing query parameter `{key}`"),
            })
    }
}

/// Where a recipe writes its HTTP answer.
///
/// A sink accepts exactly one write; the dispatcher treats a second write as
/// a bug in the handler, not as user input.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ResponseSink {
    /// Fresh, unwritten sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a JSON response. Errors if the sink was already written.
    pub fn send_json<T: Serialize>(&mut self, status: u16, body: &T) -> Result<()> {
        if self.status.is_some() {
            return Err(AuthKitError::ResponseAlreadyWritten);
        }
        self.status = Some(status);
        self.body = Some(serde_json::to_value(body)?);
        Ok(())
    }

    /// Add a response header. Allowed before or after the body write.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// `true` once a response has been written.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// Status code, if written.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Response body, if written.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Headers written so far.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Status and JSON payload produced by one API Table operation.
///
/// API operations return this instead of writing the sink themselves, so
/// overrides can inspect and reshape the answer before it leaves the recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: serde_json::Value,
}

impl ApiResponse {
    /// A 200 response with the given body.
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    /// A response with an explicit status.
    pub fn with_status(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Serialize `body` into a 200 response.
    pub fn ok_from<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self::ok(serde_json::to_value(body)?))
    }
}

/// A validated path constant.
///
/// Recipes declare their routes with these; a malformed constant is a fatal
/// configuration error at construction time, never a request-time surprise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalisedPath(String);

impl NormalisedPath {
    /// Validate and normalise a path constant.
    ///
    /// Rules: non-empty, starts with `/`, no whitespace, no duplicate or
    /// trailing slashes (the root path `/` is allowed).
    pub fn new(recipe_id: &'static str, raw: &str) -> Result<Self> {
        let reject = |reason: &str| {
            Err(AuthKitError::MalformedPath {
                recipe_id,
                path: raw.to_string(),
                reason: reason.to_string(),
            })
        };
        if raw.is_empty() {
            return reject("path is empty");
        }
        if !raw.starts_with('/') {
            return reject("path must start with `/`");
        }
        if raw.chars().any(char::is_whitespace) {
            return reject("path contains whitespace");
        }
        if raw.contains("//") {
            return reject("path contains an empty segment");
        }
        if raw.len() > 1 && raw.ends_with('/') {
            return reject("path has a trailing slash");
        }
        Ok(Self(raw.to_string()))
    }

    /// The normalised path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append another normalised path, collapsing the root path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        if self.0 == "/" {
            other.clone()
        } else if other.0 == "/" {
            self.clone()
        } else {
            Self(format!("{}{}", self.0, other.0))
        }
    }

    /// Strip this path as a prefix of `full`, returning the remainder
    /// (`"/"` when they match exactly). `None` when `full` is outside it.
    pub fn strip_prefix_of<'a>(&self, full: &'a str) -> Option<&'a str> {
        if self.0 == "/" {
            return Some(full);
        }
        let rest = full.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

impl fmt::Display for NormalisedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalised_path_accepts_valid_constants() {
        for ok in ["/", "/signinup", "/signinup/code/consume"] {
            assert!(NormalisedPath::new("test", ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn normalised_path_rejects_malformed_constants() {
        for bad in ["", "signinup", "/sign inup", "/a//b", "/a/"] {
            assert!(
                matches!(
                    NormalisedPath::new("test", bad),
                    Err(AuthKitError::MalformedPath { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn base_path_prefix_stripping() {
        let base = NormalisedPath::new("test", "/auth").unwrap_or_else(|_| unreachable!());
        assert_eq!(base.strip_prefix_of("/auth/signinup"), Some("/signinup"));
        assert_eq!(base.strip_prefix_of("/auth"), Some("/"));
        assert_eq!(base.strip_prefix_of("/authx/signinup"), None);
        assert_eq!(base.strip_prefix_of("/other"), None);
    }

    #[test]
    fn sink_rejects_double_write() {
        let mut sink = ResponseSink::new();
        sink.send_json(200, &serde_json::json!({"status": "OK"}))
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            sink.send_json(200, &serde_json::json!({})),
            Err(AuthKitError::ResponseAlreadyWritten)
        ));
        assert_eq!(sink.status(), Some(200));
    }
}
