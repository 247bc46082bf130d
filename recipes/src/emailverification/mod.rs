//! Email verification recipe.
//!
//! Issues and consumes verification tokens for (user id, email) pairs. It has
//! no user model of its own: the embedding recipe supplies a resolver from
//! user id to email.

pub mod api;
pub mod implementation;
pub mod recipe;

pub use api::ApiImplementation;
pub use implementation::RecipeImplementation;
pub use recipe::{EmailVerificationRecipe, RECIPE_ID};

use authkit_core::Result;
use authkit_core::table::RecipeOverride;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two optional host hooks for this recipe.
pub type EmailVerificationOverride =
    RecipeOverride<RecipeImplementation, ApiImplementation>;

/// Resolves the email a user id verifies against.
pub type EmailResolver =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// The (user id, email) pair every operation works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEmail {
    /// Core-assigned user id.
    pub user_id: String,
    /// The email being verified.
    pub email: String,
}

/// Email verification recipe configuration.
#[derive(Clone)]
pub struct EmailVerificationConfig {
    /// Resolver from user id to email, supplied by the embedding recipe.
    pub get_email_for_user_id: EmailResolver,
}

impl EmailVerificationConfig {
    /// Config with the given resolver.
    pub fn new(get_email_for_user_id: EmailResolver) -> Self {
        Self {
            get_email_for_user_id,
        }
    }
}
