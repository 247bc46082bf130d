//! Composite recipe: third-party + passwordless behind one surface.
//!
//! Combines a passwordless child, an optional third-party child (present
//! only when providers are configured) and an email-verification child into
//! one recipe module with a unified user model and one pair of override
//! hooks. The children are real, independent recipe modules; adapters
//! translate between the unified user shape and each child's narrower shape
//! so that overrides on the unified tables are visible inside every child.

pub mod adapters;
pub mod api;
pub mod implementation;
pub mod recipe;

pub use api::ApiImplementation;
pub use implementation::RecipeImplementation;
pub use recipe::{RECIPE_ID, ThirdPartyPasswordlessRecipe};

use crate::emailverification::{EmailVerificationOverride, EmailVerificationRecipe};
use crate::passwordless::{PasswordlessConfig, PasswordlessUser};
use crate::thirdparty::{ProviderConfig, ThirdPartyInfo, ThirdPartyUser};
use authkit_core::table::OverrideHook;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The unified user model: the union of both children's shapes.
///
/// At least one of `email` / `phone_number` / `third_party` is present.
/// Absent fields are absent, not defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Core-assigned identifier.
    #[serde(rename = "id")]
    pub user_id: String,
    /// Creation timestamp, epoch millis.
    pub time_joined: u64,
    /// Email, if any identity carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number, passwordless identities only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Provider identity, third-party users only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party: Option<ThirdPartyInfo>,
}

impl User {
    /// Widen a passwordless user; the missing field stays absent.
    pub fn from_passwordless(user: PasswordlessUser) -> Self {
        Self {
            user_id: user.user_id,
            time_joined: user.time_joined,
            email: user.email,
            phone_number: user.phone_number,
            third_party: None,
        }
    }

    /// Widen a third-party user; the missing field stays absent.
    pub fn from_third_party(user: ThirdPartyUser) -> Self {
        Self {
            user_id: user.user_id,
            time_joined: user.time_joined,
            email: Some(user.email),
            phone_number: None,
            third_party: Some(user.third_party),
        }
    }

    /// Narrow to the passwordless shape.
    ///
    /// A user carrying a third-party identity is the wrong kind and narrows
    /// to `None`; from the passwordless child's point of view it does not
    /// exist.
    pub fn into_passwordless(self) -> Option<PasswordlessUser> {
        if self.third_party.is_some() {
            return None;
        }
        Some(PasswordlessUser {
            user_id: self.user_id,
            email: self.email,
            phone_number: self.phone_number,
            time_joined: self.time_joined,
        })
    }

    /// Narrow to the third-party shape; passwordless-only users narrow to
    /// `None`.
    pub fn into_third_party(self) -> Option<ThirdPartyUser> {
        match (self.email, self.third_party) {
            (Some(email), Some(third_party)) => Some(ThirdPartyUser {
                user_id: self.user_id,
                email,
                time_joined: self.time_joined,
                third_party,
            }),
            _ => None,
        }
    }
}

/// Override hooks for the composite.
///
/// `functions` and `apis` transform the unified tables; the
/// email-verification hooks compose on top of the composite's own
/// verification-status wrapper.
#[derive(Default)]
pub struct ThirdPartyPasswordlessOverride {
    /// Unified Implementation Table hook.
    pub functions: Option<OverrideHook<RecipeImplementation>>,
    /// Unified API Table hook.
    pub apis: Option<OverrideHook<ApiImplementation>>,
    /// Hooks forwarded to the email-verification child.
    pub email_verification: EmailVerificationOverride,
}

impl ThirdPartyPasswordlessOverride {
    /// No hooks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the unified Implementation Table hook.
    #[must_use]
    pub fn with_functions(
        mut self,
        hook: impl FnOnce(RecipeImplementation) -> RecipeImplementation + Send + 'static,
    ) -> Self {
        self.functions = Some(Box::new(hook));
        self
    }

    /// Set the unified API Table hook.
    #[must_use]
    pub fn with_apis(
        mut self,
        hook: impl FnOnce(ApiImplementation) -> ApiImplementation + Send + 'static,
    ) -> Self {
        self.apis = Some(Box::new(hook));
        self
    }

    /// Set the email-verification child's hooks.
    #[must_use]
    pub fn with_email_verification(mut self, overrides: EmailVerificationOverride) -> Self {
        self.email_verification = overrides;
        self
    }
}

/// Composite recipe configuration.
pub struct ThirdPartyPasswordlessConfig {
    /// Passwordless child configuration.
    pub passwordless: PasswordlessConfig,
    /// Third-party providers; the third-party child exists only when this is
    /// non-empty.
    pub providers: Vec<ProviderConfig>,
    /// A pre-built email-verification recipe to borrow instead of
    /// constructing one. Borrowed children receive no overrides from this
    /// composite.
    pub email_verification_recipe: Option<Arc<EmailVerificationRecipe>>,
    /// Host override hooks.
    pub overrides: ThirdPartyPasswordlessOverride,
}

impl ThirdPartyPasswordlessConfig {
    /// Config around a passwordless setup, no providers, no hooks.
    pub fn new(passwordless: PasswordlessConfig) -> Self {
        Self {
            passwordless,
            providers: Vec::new(),
            email_verification_recipe: None,
            overrides: ThirdPartyPasswordlessOverride::none(),
        }
    }

    /// Add third-party providers.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<ProviderConfig>) -> Self {
        self.providers = providers;
        self
    }

    /// Borrow a pre-built email-verification recipe.
    #[must_use]
    pub fn with_email_verification_recipe(
        mut self,
        recipe: Arc<EmailVerificationRecipe>,
    ) -> Self {
        self.email_verification_recipe = Some(recipe);
        self
    }

    /// Set the override hooks.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ThirdPartyPasswordlessOverride) -> Self {
        self.overrides = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passwordless_user() -> PasswordlessUser {
        PasswordlessUser {
            user_id: "u1".into(),
            email: Some("test@example.com".into()),
            phone_number: None,
            time_joined: 1_700_000_000_000,
        }
    }

    #[test]
    fn widening_fills_absent_fields_with_none() {
        let unified = User::from_passwordless(passwordless_user());
        assert_eq!(unified.phone_number, None);
        assert_eq!(unified.third_party, None);
        assert_eq!(unified.email.as_deref(), Some("test@example.com"));
    }

    #[test]
    fn narrowing_never_leaks_cross_kind_users() {
        let tp_user = User::from_third_party(ThirdPartyUser {
            user_id: "u2".into(),
            email: "tp@example.com".into(),
            time_joined: 1,
            third_party: ThirdPartyInfo {
                id: "google".into(),
                user_id: "g-123".into(),
            },
        });
        assert!(tp_user.clone().into_passwordless().is_none());
        assert!(tp_user.into_third_party().is_some());

        let pl_user = User::from_passwordless(passwordless_user());
        assert!(pl_user.clone().into_third_party().is_none());
        assert!(pl_user.into_passwordless().is_some());
    }
}
