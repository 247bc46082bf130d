//! Error types for the recipe composition framework.

use thiserror::Error;

/// Result type alias for framework operations.
pub type Result<T> = std::result::Result<T, AuthKitError>;

/// Error taxonomy for the composition/dispatch layer.
///
/// Domain outcomes ("incorrect code", "email already exists", ...) are **not**
/// errors: they are success-shaped enums returned by Implementation Table
/// operations. This enum covers everything that is genuinely a failure,
/// organized by category.
#[derive(Debug, Error)]
pub enum AuthKitError {
    // ═══════════════════════════════════════════════════════════
    // Configuration Errors (fatal at init)
    // ═══════════════════════════════════════════════════════════

    /// `init` was called while an instance is already active.
    #[error("recipe already initialized, reset before calling init again")]
    AlreadyInitialized,

    /// `instance` was called before `init`.
    #[error("init must be called before using the recipe")]
    NotInitialized,

    /// A route path constant failed normalisation.
    #[error("recipe `{recipe_id}` declares malformed path `{path}`: {reason}")]
    MalformedPath {
        /// Recipe that declared the path.
        recipe_id: &'static str,
        /// The offending path constant.
        path: String,
        /// Why normalisation rejected it.
        reason: String,
    },

    /// Two providers share an id and none of them is marked default.
    #[error(
        "third-party provider `{provider_id}` is configured more than once, \
         mark exactly one entry as the default"
    )]
    DuplicateProvider {
        /// The provider id configured more than once.
        provider_id: String,
    },

    /// Two providers share an id and more than one is marked default.
    #[error("third-party provider `{provider_id}` has multiple default entries")]
    MultipleDefaultProviders {
        /// The provider id with conflicting defaults.
        provider_id: String,
    },

    /// A recipe config is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// The caller sent a request this recipe cannot parse or accept.
    ///
    /// Tagged with the raising recipe's id so that recipe's `handle_error`
    /// can claim it during the first-refusal chain.
    #[error("bad request for recipe `{recipe_id}`: {message}")]
    BadRequest {
        /// Recipe that rejected the request.
        recipe_id: &'static str,
        /// Human-readable reason, safe to render to the caller.
        message: String,
    },

    /// A response sink was written to twice.
    #[error("response already written")]
    ResponseAlreadyWritten,

    // ═══════════════════════════════════════════════════════════
    // Remote Core Errors
    // ═══════════════════════════════════════════════════════════

    /// The remote core answered with a non-success status.
    #[error("core request failed with status {status}: {message}")]
    CoreRequest {
        /// HTTP status returned by the core.
        status: u16,
        /// Body or reason phrase from the core.
        message: String,
    },

    /// Could not reach the remote core at all.
    #[error("core transport error: {0}")]
    CoreTransport(String),

    /// A core payload did not match the expected shape.
    #[error("failed to decode core response: {0}")]
    Serialization(String),
}

impl AuthKitError {
    /// Returns `true` if this error should abort startup rather than surface
    /// at request time.
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInitialized
                | Self::NotInitialized
                | Self::MalformedPath { .. }
                | Self::DuplicateProvider { .. }
                | Self::MultipleDefaultProviders { .. }
                | Self::InvalidConfig(_)
        )
    }

    /// Returns `true` if this error carries a message safe to show callers.
    ///
    /// Everything else renders as a generic server error without internal
    /// detail.
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::BadRequest { .. })
    }
}

impl From<reqwest::Error> for AuthKitError {
    fn from(err: reqwest::Error) -> Self {
        Self::CoreTransport(err.to_string())
    }
}

impl From<serde_json::Error> for AuthKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_classified() {
        assert!(AuthKitError::AlreadyInitialized.is_config_error());
        assert!(
            AuthKitError::DuplicateProvider {
                provider_id: "google".into()
            }
            .is_config_error()
        );
        assert!(
            !AuthKitError::CoreTransport("connection refused".into()).is_config_error()
        );
    }

    #[test]
    fn only_bad_request_is_user_visible() {
        assert!(
            AuthKitError::BadRequest {
                recipe_id: "passwordless",
                message: "email missing".into()
            }
            .is_user_error()
        );
        assert!(
            !AuthKitError::CoreRequest {
                status: 500,
                message: "boom".into()
            }
            .is_user_error()
        );
    }
}
